//! Confidential transactions
//!
//! A [`UtxoTx`] moves value between accounts and confidential outputs.
//! Amounts inside commitments are counted in units of
//! [`UTXO_COMMITMENT_CHANGE_RATE`](crate::params::UTXO_COMMITMENT_CHANGE_RATE);
//! ring inputs are proven with the attached [`RctSig`].

use std::fmt;
use std::ops::BitOr;

use once_cell::sync::OnceCell;
use primitive_types::U256;

use codec::{encode_tagged, Decodable, Encodable, Encoder, Rlp};
use crypto::{keccak, secp256k1::PrivateKey, Address, Hash, Key};
use ringct::RctSig;

use crate::params::native_token;
use crate::signer::{SenderCache, SignData, SignFields, Signer};
use crate::tx::TX_UTXO;
use crate::Result;

mod builder;
mod check;
mod input;
mod output;

pub use builder::{
    new_ain_transaction, new_uin_transaction, AccountDestination, RingMember, UtxoDestination,
    UtxoSource,
};
pub use input::{AccountInput, Input, MineInput, UtxoInput, INPUT_ACCOUNT, INPUT_MINE, INPUT_UTXO};
pub use output::{AccountOutput, Output, UtxoOutput, OUTPUT_ACCOUNT, OUTPUT_UTXO};

/// Which kinds of inputs and outputs a transaction has
#[derive(Clone, Copy, Default, Eq, PartialEq)]
pub struct UtxoKind(u8);

impl UtxoKind {
    pub const UIN: UtxoKind = UtxoKind(1);
    pub const AIN: UtxoKind = UtxoKind(2);
    pub const UOUT: UtxoKind = UtxoKind(4);
    pub const AOUT: UtxoKind = UtxoKind(8);

    pub fn contains(self, other: UtxoKind) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for UtxoKind {
    type Output = UtxoKind;

    fn bitor(self, rhs: UtxoKind) -> UtxoKind {
        UtxoKind(self.0 | rhs.0)
    }
}

impl fmt::Debug for UtxoKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names = [
            (UtxoKind::UIN, "Uin"),
            (UtxoKind::AIN, "Ain"),
            (UtxoKind::UOUT, "Uout"),
            (UtxoKind::AOUT, "Aout"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(kind, _)| self.contains(*kind))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "UtxoKind({})", set.join("|"))
    }
}

#[derive(Clone, Debug, Default)]
pub struct UtxoTx {
    inputs: Vec<Input>,
    outputs: Vec<Output>,
    token_id: Address,
    /// Transaction public key `R`
    r_key: Key,
    /// Per output transaction public keys, for subaddress payments
    add_keys: Vec<Key>,
    fee: U256,
    extra: Vec<u8>,
    signature: SignData,
    rct: RctSig,

    hash: OnceCell<Hash>,
    from: SenderCache,
    kind: OnceCell<UtxoKind>,
}

impl UtxoTx {
    /// An unsigned native token transaction without a RingCT bundle
    pub fn new(inputs: Vec<Input>, outputs: Vec<Output>, r_key: Key, add_keys: Vec<Key>, fee: U256) -> Self {
        UtxoTx {
            inputs,
            outputs,
            token_id: native_token(),
            r_key,
            add_keys,
            fee,
            ..UtxoTx::default()
        }
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn token_id(&self) -> Address {
        self.token_id
    }

    pub fn r_key(&self) -> &Key {
        &self.r_key
    }

    pub fn add_keys(&self) -> &[Key] {
        &self.add_keys
    }

    pub fn fee(&self) -> U256 {
        self.fee
    }

    pub fn extra(&self) -> &[u8] {
        &self.extra
    }

    pub fn signature(&self) -> &SignData {
        &self.signature
    }

    pub fn rct(&self) -> &RctSig {
        &self.rct
    }

    /// Every transaction public key a recipient scans with
    pub fn tx_public_keys(&self) -> Vec<Key> {
        let mut keys = vec![self.r_key];
        keys.extend_from_slice(&self.add_keys);
        keys
    }

    pub fn set_extra(&mut self, extra: Vec<u8>) {
        self.extra = extra;
        self.reset_caches();
    }

    pub(crate) fn set_rct(&mut self, rct: RctSig) {
        self.rct = rct;
        self.hash = OnceCell::new();
    }

    fn reset_caches(&mut self) {
        self.hash = OnceCell::new();
        self.from.clear();
        self.kind = OnceCell::new();
    }

    /// Signs for the account spent or called
    pub fn sign(&mut self, signer: &Signer, key: &PrivateKey) -> Result<()> {
        let signature = signer.sign(self, key)?;
        self.signature = signature;
        self.reset_caches();
        Ok(())
    }

    pub fn kind(&self) -> UtxoKind {
        *self.kind.get_or_init(|| {
            let mut kind = UtxoKind::default();
            for input in &self.inputs {
                kind = kind
                    | match input {
                        Input::Utxo(_) => UtxoKind::UIN,
                        Input::Account(_) | Input::Mine(_) => UtxoKind::AIN,
                    };
            }
            for output in &self.outputs {
                kind = kind
                    | match output {
                        Output::Utxo(_) => UtxoKind::UOUT,
                        Output::Account(_) => UtxoKind::AOUT,
                    };
            }
            kind
        })
    }

    pub fn hash(&self) -> Hash {
        *self
            .hash
            .get_or_init(|| keccak(encode_tagged(TX_UTXO, self)))
    }

    /// Digest the ring signatures sign
    ///
    /// Covers the account signature, so an account signed transaction's
    /// rings commit to the signer.
    pub fn prefix_hash(&self) -> Hash {
        let mut s = Encoder::new();
        s.begin_list();
        self.sign_fields(&mut s);
        self.signature.append_to(&mut s);
        s.end_list();
        keccak(s.out())
    }

    /// The account that signed, `None` for unsigned transactions
    pub fn sender(&self, signer: &Signer) -> Result<Option<Address>> {
        if self.signature.is_empty() {
            return Ok(None);
        }
        self.from
            .get_or_recover(signer, || signer.sender(self, &self.signature))
            .map(Some)
    }

    /// Recipient of the account output, if any
    pub fn to(&self) -> Option<Address> {
        self.account_output().map(|output| output.to)
    }

    pub fn key_images(&self) -> Vec<Key> {
        self.utxo_inputs().map(|input| input.key_image).collect()
    }

    pub fn size(&self) -> usize {
        codec::encode(self).len() + codec::TAG_LEN
    }

    pub(crate) fn utxo_inputs(&self) -> impl Iterator<Item = &UtxoInput> {
        self.inputs.iter().filter_map(|input| match input {
            Input::Utxo(input) => Some(input),
            _ => None,
        })
    }

    pub(crate) fn account_input(&self) -> Option<&AccountInput> {
        self.inputs.iter().find_map(|input| match input {
            Input::Account(input) => Some(input),
            _ => None,
        })
    }

    pub(crate) fn utxo_outputs(&self) -> impl Iterator<Item = &UtxoOutput> {
        self.outputs.iter().filter_map(|output| match output {
            Output::Utxo(output) => Some(output),
            _ => None,
        })
    }

    pub(crate) fn account_output(&self) -> Option<&AccountOutput> {
        self.outputs.iter().find_map(|output| match output {
            Output::Account(output) => Some(output),
            _ => None,
        })
    }
}

impl PartialEq for UtxoTx {
    fn eq(&self, other: &Self) -> bool {
        self.inputs == other.inputs
            && self.outputs == other.outputs
            && self.token_id == other.token_id
            && self.r_key == other.r_key
            && self.add_keys == other.add_keys
            && self.fee == other.fee
            && self.extra == other.extra
            && self.signature == other.signature
            && self.rct == other.rct
    }
}

impl SignFields for UtxoTx {
    fn sign_fields(&self, s: &mut Encoder) {
        s.append_list(&self.inputs)
            .append_list(&self.outputs)
            .append(&self.token_id)
            .append(&self.r_key)
            .append_list(&self.add_keys)
            .append(&self.fee)
            .append(&self.extra);
    }
}

impl Encodable for UtxoTx {
    fn encode(&self, s: &mut Encoder) {
        s.begin_list();
        self.sign_fields(s);
        self.signature.append_to(s);
        s.append(&self.rct);
        s.end_list();
    }
}

impl Decodable for UtxoTx {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let inputs = fields.next_list()?;
        let outputs = fields.next_list()?;
        let token_id = fields.next_val()?;
        let r_key = fields.next_val()?;
        let add_keys = fields.next_list()?;
        let fee = fields.next_val()?;
        let extra = fields.next_val()?;
        let signature = SignData::read_from(&mut fields)?;
        let rct = fields.next_val()?;
        fields.finish()?;
        Ok(UtxoTx {
            inputs,
            outputs,
            token_id,
            r_key,
            add_keys,
            fee,
            extra,
            signature,
            rct,
            ..UtxoTx::default()
        })
    }
}
