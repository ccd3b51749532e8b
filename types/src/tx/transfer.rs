use ensure_macro::ensure;
use log::debug;
use once_cell::sync::OnceCell;
use primitive_types::U256;

use codec::{encode_tagged, Decodable, Encodable, Encoder, Rlp, RlpIter};
use crypto::{keccak, secp256k1::PrivateKey, Address, Hash};

use crate::censor::{State, TxCensor};
use crate::fee::{cal_new_amount_gas, intrinsic_gas};
use crate::params::{
    is_wasm, EVER_CONTRACT_LIANKE_FEE, EVER_LIANKE_FEE, GAS_PRICE, MAX_PURE_TRANSACTION_SIZE,
    MAX_WASM_TRANSACTION_SIZE,
};
use crate::signer::{SenderCache, SignData, SignFields, Signer};
use crate::tx::TX_NORMAL;
use crate::{Error, Result};

/// Fields shared by plain and token transfers
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TxData {
    pub nonce: u64,
    pub price: U256,
    pub gas_limit: u64,
    /// `None` creates a contract
    pub recipient: Option<Address>,
    pub amount: U256,
    pub payload: Vec<u8>,
}

impl TxData {
    pub(crate) fn append_to(&self, s: &mut Encoder) {
        s.append(&self.nonce)
            .append(&self.price)
            .append(&self.gas_limit)
            .append(&self.recipient)
            .append(&self.amount)
            .append(&self.payload);
    }

    pub(crate) fn read_from(fields: &mut RlpIter) -> codec::Result<Self> {
        Ok(TxData {
            nonce: fields.next_val()?,
            price: fields.next_val()?,
            gas_limit: fields.next_val()?,
            recipient: fields.next_val()?,
            amount: fields.next_val()?,
            payload: fields.next_val()?,
        })
    }

    /// `gas_limit * price`
    pub fn gas_cost(&self) -> U256 {
        self.price.saturating_mul(U256::from(self.gas_limit))
    }

    /// Size limit and fee rule, shared by both transfer kinds
    ///
    /// `size` is the encoded size of the whole transaction.
    pub(crate) fn check_limits(&self, size: usize, state: &dyn State) -> Result<()> {
        let wasm_create = self.recipient.is_none() && is_wasm(&self.payload);
        ensure!(
            size <= MAX_PURE_TRANSACTION_SIZE || (wasm_create && size <= MAX_WASM_TRANSACTION_SIZE),
            Error::OversizedData
        );

        ensure!(self.price == U256::from(GAS_PRICE), Error::GasLimitOrGasPrice);
        let fee_ok = match &self.recipient {
            None if !self.payload.is_empty() => true,
            Some(to) if state.is_contract(to) => {
                self.amount.is_zero()
                    || self.gas_limit >= cal_new_amount_gas(&self.amount, EVER_CONTRACT_LIANKE_FEE)
            }
            _ => self.gas_limit == cal_new_amount_gas(&self.amount, EVER_LIANKE_FEE),
        };
        ensure!(fee_ok, Error::GasLimitOrGasPrice);
        Ok(())
    }

    /// Intrinsic gas must fit in the gas limit
    pub(crate) fn check_intrinsic_gas(&self) -> Result<()> {
        let gas = intrinsic_gas(&self.payload, self.recipient.is_none())?;
        ensure!(self.gas_limit >= gas, Error::IntrinsicGas);
        Ok(())
    }

    /// Nonce must be the next one of `from`
    pub(crate) fn check_nonce(&self, state: &dyn State, from: &Address) -> Result<()> {
        check_nonce(state, from, self.nonce)
    }
}

/// `nonce` must be the next nonce of `from`
pub(crate) fn check_nonce(state: &dyn State, from: &Address, nonce: u64) -> Result<()> {
    let expected = state.get_nonce(from);
    ensure!(expected <= nonce, Error::NonceTooLow);
    ensure!(expected >= nonce, Error::NonceTooHigh);
    Ok(())
}

/// A plain value transfer or contract call
#[derive(Clone, Debug, Default)]
pub struct Transfer {
    data: TxData,
    signature: SignData,
    hash: OnceCell<Hash>,
    from: SenderCache,
}

impl Transfer {
    pub fn new(
        nonce: u64,
        to: Option<Address>,
        amount: U256,
        gas_limit: u64,
        gas_price: U256,
        payload: Vec<u8>,
    ) -> Self {
        Transfer::from_parts(
            TxData {
                nonce,
                price: gas_price,
                gas_limit,
                recipient: to,
                amount,
                payload,
            },
            SignData::default(),
        )
    }

    pub fn from_parts(data: TxData, signature: SignData) -> Self {
        Transfer {
            data,
            signature,
            hash: OnceCell::new(),
            from: SenderCache::default(),
        }
    }

    pub fn data(&self) -> &TxData {
        &self.data
    }

    pub fn signature(&self) -> &SignData {
        &self.signature
    }

    /// Signs with `key`, replacing any previous signature
    pub fn sign(&mut self, signer: &Signer, key: &PrivateKey) -> Result<()> {
        let signature = signer.sign(self, key)?;
        self.set_signature(signature);
        Ok(())
    }

    /// Attaches a raw `r || s || recovery id` signature
    pub fn with_signature(mut self, signer: &Signer, sig: &[u8; 65]) -> Self {
        self.set_signature(signer.signature_values(sig));
        self
    }

    fn set_signature(&mut self, signature: SignData) {
        self.signature = signature;
        self.hash = OnceCell::new();
        self.from.clear();
    }

    pub fn hash(&self) -> Hash {
        *self
            .hash
            .get_or_init(|| keccak(encode_tagged(TX_NORMAL, self)))
    }

    /// Encoded size including the type tag
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

    pub fn check_basic(&self, censor: &dyn TxCensor) -> Result<()> {
        ensure!(
            self.data.recipient.is_some() || censor.is_test_mode(),
            Error::InvalidReceiver
        );
        {
            let state = censor.lock_state();
            self.data.check_limits(self.size(), &**state)?;
        }

        let from = self.sender(&censor.signer()).map_err(|e| {
            debug!("Transfer {} has no valid sender: {}", self.hash(), e);
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

        let cost = self
            .data
            .gas_cost()
            .checked_add(self.data.amount)
            .ok_or(Error::InsufficientFunds)?;
        ensure!(state.get_balance(&from) >= cost, Error::InsufficientFunds);

        state.sub_balance(&from, &cost);
        state.set_nonce(&from, self.data.nonce + 1);
        Ok(())
    }
}

impl PartialEq for Transfer {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data && self.signature == other.signature
    }
}

impl SignFields for Transfer {
    fn sign_fields(&self, s: &mut Encoder) {
        self.data.append_to(s);
    }
}

impl Encodable for Transfer {
    fn encode(&self, s: &mut Encoder) {
        s.begin_list();
        self.data.append_to(s);
        self.signature.append_to(s);
        s.end_list();
    }
}

impl Decodable for Transfer {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let data = TxData::read_from(&mut fields)?;
        let signature = SignData::read_from(&mut fields)?;
        fields.finish()?;
        Ok(Transfer::from_parts(data, signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skey() -> PrivateKey {
        PrivateKey::from_hex("45a915e4d060149eb4365960e6a7a45f334393093061116b197e3240065ff2d8")
            .unwrap()
    }

    fn new_transaction() -> Transfer {
        Transfer::new(
            3,
            Some("b94f5374fce5edbc8e2a8697c15331677e6ebf0b".parse().unwrap()),
            U256::from(10),
            2000,
            U256::one(),
            vec![0x55, 0x44],
        )
    }

    #[test]
    fn it_signs_and_recovers() {
        let mut tx = new_transaction();
        tx.sign(&Signer::Homestead, &skey()).unwrap();

        assert_eq!(
            tx.hash(),
            keccak(encode_tagged(TX_NORMAL, &tx)),
        );
        assert_eq!(
            tx.sender(&Signer::Homestead).unwrap(),
            "a94f5374fce5edbc8e2a8697c15331677e6ebf0b".parse().unwrap()
        );
    }

    #[test]
    fn it_encodes_homestead_signatures() {
        let sig = hex::decode(
            "98ff921201554726367d2be8c804a7ff89ccf285ebc57dff8ae4c44b9c19ac4a\
             8887321be575c8095f789dd4c743dfe42c1820f9231f98a962b210e3ac2452a301",
        )
        .unwrap();
        let mut raw = [0u8; 65];
        raw.copy_from_slice(&sig);
        let tx = new_transaction().with_signature(&Signer::Homestead, &raw);

        let bytes = codec::encode(&tx);
        assert_eq!(
            hex::encode(&bytes),
            "f86103018207d094b94f5374fce5edbc8e2a8697c15331677e6ebf0b0a8255441ca098ff92120155472636\
             7d2be8c804a7ff89ccf285ebc57dff8ae4c44b9c19ac4aa08887321be575c8095f789dd4c743dfe42c1820f\
             9231f98a962b210e3ac2452a3"
        );

        let decoded: Transfer = codec::decode(&bytes).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.hash(), tx.hash());
    }

    #[test]
    fn it_decodes_replay_protected_transfers() {
        let key = PrivateKey::random();
        let signer = Signer::new(30261);
        let mut tx = Transfer::new(
            0,
            Some("eabc7a5cac7dd15069b5aa834191b28bf38504d8".parse().unwrap()),
            U256::zero(),
            100_000,
            U256::from(GAS_PRICE),
            Vec::new(),
        );
        tx.sign(&signer, &key).unwrap();

        let bytes = codec::encode(&tx);
        let decoded: Transfer = codec::decode(&bytes).unwrap();
        assert_eq!(decoded.sender(&signer).unwrap(), key.address());
        assert_eq!(decoded.to(), tx.to());
        assert_eq!(decoded.hash(), tx.hash());
        assert_eq!(codec::encode(&decoded), bytes);
    }

    #[test]
    fn it_resets_caches_on_resign() {
        let mut tx = new_transaction();
        tx.sign(&Signer::Homestead, &skey()).unwrap();
        let hash = tx.hash();
        assert!(tx.sender(&Signer::Homestead).is_ok());

        let other = PrivateKey::random();
        tx.sign(&Signer::Homestead, &other).unwrap();
        assert_ne!(tx.hash(), hash);
        assert_eq!(tx.sender(&Signer::Homestead).unwrap(), other.address());
    }

    #[test]
    fn it_prices_intrinsic_gas() {
        let mut data = new_transaction().data().clone();
        data.gas_limit = 21_000;
        assert_eq!(data.check_intrinsic_gas(), Err(Error::IntrinsicGas));
        data.gas_limit = 21_000 + 2 * 68;
        assert!(data.check_intrinsic_gas().is_ok());
    }
}
