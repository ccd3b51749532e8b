//! The transaction family
//!
//! A [`Tx`] is one of a closed set of variants. On the wire every variant is
//! written as its four byte [`TypeTag`] followed by its body; inside block
//! data the tagged bytes are carried as one byte string.

use primitive_types::U256;

use codec::{Decodable, Encodable, Encoder, Rlp, TypeTag};
use crypto::{Address, Hash, Key};

use crate::censor::TxCensor;
use crate::params::{multi_sign_admin, native_token};
use crate::signer::Signer;
use crate::{Error, Result};

mod contract;
mod multisign;
mod token;
mod transfer;
pub mod utxo;

pub use contract::{ContractCreateMainInfo, ContractCreateTx, ContractUpgradeMainInfo, ContractUpgradeTx};
pub use multisign::{MultiSignAccountTx, MultiSignMainInfo, SignerEntry, SignersInfo, ValidatorSign};
pub use token::TokenTransfer;
pub use transfer::{Transfer, TxData};
pub use utxo::UtxoTx;

pub const TX_NORMAL: TypeTag = TypeTag::from_name("tx");
pub const TX_TOKEN: TypeTag = TypeTag::from_name("txt");
pub const TX_MULTI_SIGN_ACCOUNT: TypeTag = TypeTag::from_name("mst");
pub const TX_CONTRACT_CREATE: TypeTag = TypeTag::from_name("cct");
pub const TX_CONTRACT_UPGRADE: TypeTag = TypeTag::from_name("cut");
pub const TX_UTXO: TypeTag = TypeTag::from_name("utx");

/// Any transaction
#[derive(Clone, Debug, PartialEq)]
pub enum Tx {
    Transfer(Transfer),
    Token(TokenTransfer),
    MultiSignAccount(MultiSignAccountTx),
    ContractCreate(ContractCreateTx),
    ContractUpgrade(ContractUpgradeTx),
    Utxo(Box<UtxoTx>),
}

/// What the executor needs from a transaction
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    pub from: Address,
    pub to: Option<Address>,
    pub token: Address,
    pub nonce: u64,
    pub amount: U256,
    pub gas_limit: u64,
    pub gas_price: U256,
    pub data: Vec<u8>,
    pub check_nonce: bool,
}

impl Tx {
    pub fn tag(&self) -> TypeTag {
        match self {
            Tx::Transfer(_) => TX_NORMAL,
            Tx::Token(_) => TX_TOKEN,
            Tx::MultiSignAccount(_) => TX_MULTI_SIGN_ACCOUNT,
            Tx::ContractCreate(_) => TX_CONTRACT_CREATE,
            Tx::ContractUpgrade(_) => TX_CONTRACT_UPGRADE,
            Tx::Utxo(_) => TX_UTXO,
        }
    }

    /// Name of the variant, also the key of its signer set
    pub fn type_name(&self) -> String {
        self.tag().name()
    }

    pub fn hash(&self) -> Hash {
        match self {
            Tx::Transfer(tx) => tx.hash(),
            Tx::Token(tx) => tx.hash(),
            Tx::MultiSignAccount(tx) => tx.hash(),
            Tx::ContractCreate(tx) => tx.hash(),
            Tx::ContractUpgrade(tx) => tx.hash(),
            Tx::Utxo(tx) => tx.hash(),
        }
    }

    /// The account the transaction acts for
    ///
    /// Confidential transactions without an account signature act for the
    /// zero address.
    pub fn sender(&self, signer: &Signer) -> Result<Address> {
        match self {
            Tx::Transfer(tx) => tx.sender(signer),
            Tx::Token(tx) => tx.sender(signer),
            Tx::MultiSignAccount(_) => Ok(multi_sign_admin()),
            Tx::ContractCreate(tx) => Ok(tx.from()),
            Tx::ContractUpgrade(tx) => Ok(tx.from()),
            Tx::Utxo(tx) => Ok(tx.sender(signer)?.unwrap_or_default()),
        }
    }

    pub fn to(&self) -> Option<Address> {
        match self {
            Tx::Transfer(tx) => tx.to(),
            Tx::Token(tx) => tx.to(),
            Tx::MultiSignAccount(_) => None,
            Tx::ContractCreate(_) => None,
            Tx::ContractUpgrade(tx) => Some(tx.contract_address()),
            Tx::Utxo(tx) => tx.to(),
        }
    }

    pub fn token_address(&self) -> Address {
        match self {
            Tx::Token(tx) => tx.token_address(),
            Tx::Utxo(tx) => tx.token_id(),
            _ => native_token(),
        }
    }

    /// Key images spent by the transaction
    pub fn key_images(&self) -> Vec<Key> {
        match self {
            Tx::Utxo(tx) => tx.key_images(),
            _ => Vec::new(),
        }
    }

    /// Stateless admission checks
    pub fn check_basic(&self, censor: &dyn TxCensor) -> Result<()> {
        match self {
            Tx::Transfer(tx) => tx.check_basic(censor),
            Tx::Token(tx) => tx.check_basic(censor),
            Tx::MultiSignAccount(tx) => tx.check_basic(censor),
            Tx::ContractCreate(tx) => tx.check_basic(censor),
            Tx::ContractUpgrade(tx) => tx.check_basic(censor),
            Tx::Utxo(tx) => tx.check_basic(censor),
        }
    }

    /// Admission checks against the current state
    ///
    /// On success the state reflects the transaction's debits.
    pub fn check_state(&self, censor: &dyn TxCensor) -> Result<()> {
        match self {
            Tx::Transfer(tx) => tx.check_state(censor),
            Tx::Token(tx) => tx.check_state(censor),
            Tx::MultiSignAccount(tx) => tx.check_state(censor),
            Tx::ContractCreate(tx) => tx.check_state(censor),
            Tx::ContractUpgrade(tx) => tx.check_state(censor),
            Tx::Utxo(tx) => tx.check_state(censor),
        }
    }

    /// The executor's view of an account transaction
    ///
    /// Signer set proposals and confidential transactions are not executed
    /// as messages.
    pub fn as_message(&self, signer: &Signer) -> Result<Message> {
        let message = match self {
            Tx::Transfer(tx) => Message::from_data(tx.sender(signer)?, native_token(), tx.data()),
            Tx::Token(tx) => Message::from_data(tx.sender(signer)?, tx.token_address(), tx.data()),
            Tx::ContractCreate(tx) => tx.as_message(),
            Tx::ContractUpgrade(tx) => tx.as_message(),
            Tx::MultiSignAccount(_) | Tx::Utxo(_) => return Err(Error::TxNotSupport),
        };
        Ok(message)
    }

    /// Tagged encoding
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut s = Encoder::new();
        s.append_raw(self.tag().as_bytes());
        match self {
            Tx::Transfer(tx) => s.append(tx),
            Tx::Token(tx) => s.append(tx),
            Tx::MultiSignAccount(tx) => s.append(tx),
            Tx::ContractCreate(tx) => s.append(tx),
            Tx::ContractUpgrade(tx) => s.append(tx),
            Tx::Utxo(tx) => s.append(tx),
        };
        s.out()
    }

    /// Reads a tagged encoding
    pub fn from_bytes(bytes: &[u8]) -> codec::Result<Self> {
        let (tag, body) = TypeTag::split(bytes)?;
        let tx = match tag {
            TX_NORMAL => Tx::Transfer(codec::decode(body)?),
            TX_TOKEN => Tx::Token(codec::decode(body)?),
            TX_MULTI_SIGN_ACCOUNT => Tx::MultiSignAccount(codec::decode(body)?),
            TX_CONTRACT_CREATE => Tx::ContractCreate(codec::decode(body)?),
            TX_CONTRACT_UPGRADE => Tx::ContractUpgrade(codec::decode(body)?),
            TX_UTXO => Tx::Utxo(codec::decode(body)?),
            other => return Err(codec::Error::UnknownTag(other.name())),
        };
        Ok(tx)
    }

    pub fn size(&self) -> usize {
        self.to_bytes().len()
    }
}

impl Message {
    fn from_data(from: Address, token: Address, data: &TxData) -> Self {
        Message {
            from,
            to: data.recipient,
            token,
            nonce: data.nonce,
            amount: data.amount,
            gas_limit: data.gas_limit,
            gas_price: data.price,
            data: data.payload.clone(),
            check_nonce: true,
        }
    }
}

impl Encodable for Tx {
    fn encode(&self, s: &mut Encoder) {
        s.append_bytes(&self.to_bytes());
    }
}

impl Decodable for Tx {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        Tx::from_bytes(rlp.data()?)
    }
}
