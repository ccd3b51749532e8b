use primitive_types::U256;

use codec::{Decodable, Encodable, Encoder, Rlp, TypeTag};
use crypto::{Address, Key};

pub const OUTPUT_UTXO: TypeTag = TypeTag::from_name("uto");
pub const OUTPUT_ACCOUNT: TypeTag = TypeTag::from_name("aco");

/// A confidential output paying a one-time key
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UtxoOutput {
    pub ot_addr: Key,
    /// Zero once the amount is committed to
    pub amount: U256,
    /// Masked with the output's shared secret
    pub remark: [u8; 32],
}

/// A public payment into an account or contract
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AccountOutput {
    pub to: Address,
    pub amount: U256,
    pub data: Vec<u8>,
    /// `(amount / rate) * H`
    pub commit: Key,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Output {
    Utxo(UtxoOutput),
    Account(AccountOutput),
}

impl Output {
    pub fn tag(&self) -> TypeTag {
        match self {
            Output::Utxo(_) => OUTPUT_UTXO,
            Output::Account(_) => OUTPUT_ACCOUNT,
        }
    }
}

impl Encodable for UtxoOutput {
    fn encode(&self, s: &mut Encoder) {
        s.begin_list()
            .append(&self.ot_addr)
            .append(&self.amount)
            .append(&self.remark)
            .end_list();
    }
}

impl Decodable for UtxoOutput {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let output = UtxoOutput {
            ot_addr: fields.next_val()?,
            amount: fields.next_val()?,
            remark: fields.next_val()?,
        };
        fields.finish()?;
        Ok(output)
    }
}

impl Encodable for AccountOutput {
    fn encode(&self, s: &mut Encoder) {
        s.begin_list()
            .append(&self.to)
            .append(&self.amount)
            .append(&self.data)
            .append(&self.commit)
            .end_list();
    }
}

impl Decodable for AccountOutput {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let output = AccountOutput {
            to: fields.next_val()?,
            amount: fields.next_val()?,
            data: fields.next_val()?,
            commit: fields.next_val()?,
        };
        fields.finish()?;
        Ok(output)
    }
}

impl Encodable for Output {
    fn encode(&self, s: &mut Encoder) {
        let bytes = match self {
            Output::Utxo(output) => codec::encode_tagged(self.tag(), output),
            Output::Account(output) => codec::encode_tagged(self.tag(), output),
        };
        s.append_bytes(&bytes);
    }
}

impl Decodable for Output {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let (tag, body) = TypeTag::split(rlp.data()?)?;
        match tag {
            OUTPUT_UTXO => Ok(Output::Utxo(codec::decode(body)?)),
            OUTPUT_ACCOUNT => Ok(Output::Account(codec::decode(body)?)),
            other => Err(codec::Error::UnknownTag(other.name())),
        }
    }
}
