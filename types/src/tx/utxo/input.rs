use primitive_types::U256;

use codec::{Decodable, Encodable, Encoder, Rlp, TypeTag};
use crypto::Key;

pub const INPUT_UTXO: TypeTag = TypeTag::from_name("uti");
pub const INPUT_ACCOUNT: TypeTag = TypeTag::from_name("aci");
pub const INPUT_MINE: TypeTag = TypeTag::from_name("mni");

/// Spends one member of a ring of earlier outputs
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UtxoInput {
    /// Global output indices of the ring, each relative to the previous
    pub key_offsets: Vec<u64>,
    pub key_image: Key,
}

/// Moves a public amount from an account into commitments
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AccountInput {
    pub nonce: u64,
    pub amount: U256,
    /// Blinding factor of `commit`
    pub cf: Key,
    /// `cf * G + (amount / rate) * H`
    pub commit: Key,
}

/// Newly minted coins
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MineInput {
    pub amount: U256,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Input {
    Utxo(UtxoInput),
    Account(AccountInput),
    Mine(MineInput),
}

impl Input {
    pub fn tag(&self) -> TypeTag {
        match self {
            Input::Utxo(_) => INPUT_UTXO,
            Input::Account(_) => INPUT_ACCOUNT,
            Input::Mine(_) => INPUT_MINE,
        }
    }
}

impl Encodable for UtxoInput {
    fn encode(&self, s: &mut Encoder) {
        s.begin_list()
            .append_list(&self.key_offsets)
            .append(&self.key_image)
            .end_list();
    }
}

impl Decodable for UtxoInput {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let input = UtxoInput {
            key_offsets: fields.next_list()?,
            key_image: fields.next_val()?,
        };
        fields.finish()?;
        Ok(input)
    }
}

impl Encodable for AccountInput {
    fn encode(&self, s: &mut Encoder) {
        s.begin_list()
            .append(&self.nonce)
            .append(&self.amount)
            .append(&self.cf)
            .append(&self.commit)
            .end_list();
    }
}

impl Decodable for AccountInput {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let input = AccountInput {
            nonce: fields.next_val()?,
            amount: fields.next_val()?,
            cf: fields.next_val()?,
            commit: fields.next_val()?,
        };
        fields.finish()?;
        Ok(input)
    }
}

impl Encodable for MineInput {
    fn encode(&self, s: &mut Encoder) {
        s.begin_list().append(&self.amount).end_list();
    }
}

impl Decodable for MineInput {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let input = MineInput {
            amount: fields.next_val()?,
        };
        fields.finish()?;
        Ok(input)
    }
}

/// Written as one byte string holding the tag and the body
impl Encodable for Input {
    fn encode(&self, s: &mut Encoder) {
        let bytes = match self {
            Input::Utxo(input) => codec::encode_tagged(self.tag(), input),
            Input::Account(input) => codec::encode_tagged(self.tag(), input),
            Input::Mine(input) => codec::encode_tagged(self.tag(), input),
        };
        s.append_bytes(&bytes);
    }
}

impl Decodable for Input {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let (tag, body) = TypeTag::split(rlp.data()?)?;
        match tag {
            INPUT_UTXO => Ok(Input::Utxo(codec::decode(body)?)),
            INPUT_ACCOUNT => Ok(Input::Account(codec::decode(body)?)),
            INPUT_MINE => Ok(Input::Mine(codec::decode(body)?)),
            other => Err(codec::Error::UnknownTag(other.name())),
        }
    }
}
