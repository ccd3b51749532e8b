use ensure_macro::ensure;
use log::debug;
use once_cell::sync::OnceCell;
use primitive_types::U256;

use codec::{Decodable, Encodable, Encoder, Rlp};
use crypto::{keccak, secp256k1::PrivateKey, Address, Hash};

use crate::censor::TxCensor;
use crate::params::native_token;
use crate::signer::{SenderCache, SignData, SignFields, Signer};
use crate::tx::transfer::TxData;
use crate::{Error, Result};

/// A transfer of a token issued by a contract
///
/// Its hash leaves out the type tag, keeping ids issued before the tag was
/// introduced.
#[derive(Clone, Debug, Default)]
pub struct TokenTransfer {
    token: Address,
    data: TxData,
    signature: SignData,
    hash: OnceCell<Hash>,
    from: SenderCache,
}

impl TokenTransfer {
    pub fn new(token: Address, data: TxData) -> Self {
        TokenTransfer::from_parts(token, data, SignData::default())
    }

    pub fn from_parts(token: Address, data: TxData, signature: SignData) -> Self {
        TokenTransfer {
            token,
            data,
            signature,
            hash: OnceCell::new(),
            from: SenderCache::default(),
        }
    }

    pub fn token_address(&self) -> Address {
        self.token
    }

    pub fn data(&self) -> &TxData {
        &self.data
    }

    pub fn signature(&self) -> &SignData {
        &self.signature
    }

    pub fn sign(&mut self, signer: &Signer, key: &PrivateKey) -> Result<()> {
        self.signature = signer.sign(self, key)?;
        self.hash = OnceCell::new();
        self.from.clear();
        Ok(())
    }

    pub fn hash(&self) -> Hash {
        *self.hash.get_or_init(|| keccak(codec::encode(self)))
    }

    pub fn size(&self) -> usize {
        codec::encode(self).len() + codec::TAG_LEN
    }

    pub fn sender(&self, signer: &Signer) -> Result<Address> {
        self.from
            .get_or_recover(signer, || signer.sender(self, &self.signature))
    }

    pub fn to(&self) -> Option<Address> {
        self.data.recipient
    }

    fn is_native(&self) -> bool {
        self.token == native_token()
    }

    pub fn check_basic(&self, censor: &dyn TxCensor) -> Result<()> {
        {
            let state = censor.lock_state();
            self.data.check_limits(self.size(), &**state)?;
        }

        let from = self.sender(&censor.signer()).map_err(|e| {
            debug!("Token transfer {} has no valid sender: {}", self.hash(), e);
            Error::InvalidSender
        })?;
        ensure!(!censor.is_blacklisted(&from), Error::BlacklistAddress);
        if let Some(to) = &self.data.recipient {
            ensure!(!censor.is_blacklisted(to), Error::BlacklistAddress);
        }

        self.data.check_intrinsic_gas()
    }

    pub fn check_state(&self, censor: &dyn TxCensor) -> Result<()> {
        let mut state = censor.lock_state();
        let from = self
            .sender(&censor.signer())
            .map_err(|_| Error::InvalidSender)?;
        self.data.check_nonce(&**state, &from)?;

        let gas_cost = self.data.gas_cost();
        if self.is_native() {
            let cost = gas_cost
                .checked_add(self.data.amount)
                .ok_or(Error::InsufficientFunds)?;
            ensure!(state.get_balance(&from) >= cost, Error::InsufficientFunds);
            state.sub_balance(&from, &cost);
        } else {
            ensure!(state.get_balance(&from) >= gas_cost, Error::InsufficientFunds);
            ensure!(
                state.get_token_balance(&from, &self.token) >= self.data.amount,
                Error::InsufficientTokenFunds
            );
            state.sub_balance(&from, &gas_cost);
            state.sub_token_balance(&from, &self.token, &self.data.amount);
        }
        state.set_nonce(&from, self.data.nonce + 1);
        Ok(())
    }

    /// Value moved, in units of the token
    pub fn value(&self) -> U256 {
        self.data.amount
    }
}

impl PartialEq for TokenTransfer {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token && self.data == other.data && self.signature == other.signature
    }
}

impl SignFields for TokenTransfer {
    fn sign_fields(&self, s: &mut Encoder) {
        s.append(&self.token);
        self.data.append_to(s);
    }
}

impl Encodable for TokenTransfer {
    fn encode(&self, s: &mut Encoder) {
        s.begin_list();
        self.sign_fields(s);
        self.signature.append_to(s);
        s.end_list();
    }
}

impl Decodable for TokenTransfer {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let token = fields.next_val()?;
        let data = TxData::read_from(&mut fields)?;
        let signature = SignData::read_from(&mut fields)?;
        fields.finish()?;
        Ok(TokenTransfer::from_parts(token, data, signature))
    }
}
