//! Multi-signed contract deployment and upgrade
//!
//! Both transactions carry one account signature per authorising signer.
//! The authorised signers come from the [`SignersInfo`] installed for the
//! transaction's type name.

use ensure_macro::ensure;
use log::debug;
use once_cell::sync::OnceCell;
use primitive_types::U256;

use codec::{encode_tagged, Decodable, Encodable, Encoder, Rlp, TypeTag};
use crypto::{keccak, secp256k1::PrivateKey, Address, Hash};

use crate::censor::TxCensor;
use crate::params::{is_wasm, native_token, GAS_PRICE, MAX_WASM_TRANSACTION_SIZE, PAR_GAS_LIMIT};
use crate::signer::{SignData, SignFields, Signer};
use crate::tx::transfer::check_nonce;
use crate::tx::{Message, SignersInfo, TX_CONTRACT_CREATE, TX_CONTRACT_UPGRADE};
use crate::{Error, Result};

/// Gas reported by administrative transactions
pub const CONTRACT_TX_GAS: u64 = PAR_GAS_LIMIT * 1000;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ContractCreateMainInfo {
    pub from_addr: Address,
    pub account_nonce: u64,
    pub amount: U256,
    /// The wasm module to deploy
    pub payload: Vec<u8>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ContractUpgradeMainInfo {
    pub from_addr: Address,
    pub contract_addr: Address,
    pub account_nonce: u64,
    /// The replacement wasm module
    pub payload: Vec<u8>,
}

impl SignFields for ContractCreateMainInfo {
    fn sign_fields(&self, s: &mut Encoder) {
        s.append(&self.from_addr)
            .append(&self.account_nonce)
            .append(&self.amount)
            .append(&self.payload);
    }
}

impl SignFields for ContractUpgradeMainInfo {
    fn sign_fields(&self, s: &mut Encoder) {
        s.append(&self.from_addr)
            .append(&self.contract_addr)
            .append(&self.account_nonce)
            .append(&self.payload);
    }
}

/// Looks up the signer set of `tag` and checks `signs` against it
fn verify_signs<T: SignFields>(
    censor: &dyn TxCensor,
    tag: TypeTag,
    main_info: &T,
    signs: &[SignData],
    from: &Address,
) -> Result<()> {
    let info: SignersInfo = censor
        .tx_mgr()
        .get_signers_info(&tag.name())
        .ok_or(Error::VerifySignFailed("no signer set for transaction type"))?;
    info.verify_account_signs(&censor.signer(), main_info, signs, from)
}

fn check_payload(payload: &[u8], size: usize) -> Result<()> {
    ensure!(!payload.is_empty(), Error::Params);
    ensure!(size <= MAX_WASM_TRANSACTION_SIZE, Error::OversizedData);
    Ok(())
}

fn encode_signed<T: SignFields>(s: &mut Encoder, main_info: &T, signs: &[SignData]) {
    s.begin_list();
    s.begin_list();
    main_info.sign_fields(s);
    s.end_list();
    s.append_list(signs);
    s.end_list();
}

/// Deploys a contract on behalf of `from_addr`
#[derive(Clone, Debug, Default)]
pub struct ContractCreateTx {
    main_info: ContractCreateMainInfo,
    signs: Vec<SignData>,
    hash: OnceCell<Hash>,
}

impl ContractCreateTx {
    pub fn new(main_info: ContractCreateMainInfo) -> Self {
        ContractCreateTx::from_parts(main_info, Vec::new())
    }

    pub fn from_parts(main_info: ContractCreateMainInfo, signs: Vec<SignData>) -> Self {
        ContractCreateTx {
            main_info,
            signs,
            hash: OnceCell::new(),
        }
    }

    pub fn main_info(&self) -> &ContractCreateMainInfo {
        &self.main_info
    }

    pub fn signs(&self) -> &[SignData] {
        &self.signs
    }

    /// Adds the signature of one authorised signer
    pub fn sign(&mut self, signer: &Signer, key: &PrivateKey) -> Result<()> {
        let sign = signer.sign(&self.main_info, key)?;
        self.signs.push(sign);
        self.hash = OnceCell::new();
        Ok(())
    }

    pub fn hash(&self) -> Hash {
        *self
            .hash
            .get_or_init(|| keccak(encode_tagged(TX_CONTRACT_CREATE, self)))
    }

    pub fn from(&self) -> Address {
        self.main_info.from_addr
    }

    pub fn gas(&self) -> u64 {
        CONTRACT_TX_GAS
    }

    /// Value moved into the new contract
    pub fn cost(&self) -> U256 {
        self.main_info.amount
    }

    pub fn check_basic(&self, censor: &dyn TxCensor) -> Result<()> {
        check_payload(&self.main_info.payload, codec::encode(self).len() + codec::TAG_LEN)?;
        ensure!(!censor.is_blacklisted(&self.from()), Error::BlacklistAddress);
        verify_signs(
            censor,
            TX_CONTRACT_CREATE,
            &self.main_info,
            &self.signs,
            &self.from(),
        )
        .map_err(|e| {
            debug!("Contract creation {} rejected: {}", self.hash(), e);
            e
        })
    }

    /// Advances the nonce of the deploying account
    pub fn check_state(&self, censor: &dyn TxCensor) -> Result<()> {
        let mut state = censor.lock_state();
        let from = self.from();
        check_nonce(&**state, &from, self.main_info.account_nonce)?;
        state.set_nonce(&from, self.main_info.account_nonce + 1);
        Ok(())
    }

    pub fn as_message(&self) -> Message {
        Message {
            from: self.from(),
            to: None,
            token: native_token(),
            nonce: self.main_info.account_nonce,
            amount: self.main_info.amount,
            gas_limit: self.gas(),
            gas_price: U256::from(GAS_PRICE),
            data: self.main_info.payload.clone(),
            check_nonce: false,
        }
    }
}

impl PartialEq for ContractCreateTx {
    fn eq(&self, other: &Self) -> bool {
        self.main_info == other.main_info && self.signs == other.signs
    }
}

impl Encodable for ContractCreateTx {
    fn encode(&self, s: &mut Encoder) {
        encode_signed(s, &self.main_info, &self.signs);
    }
}

impl Decodable for ContractCreateTx {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let info = fields.next_item()?;
        let signs = fields.next_list()?;
        fields.finish()?;

        let mut info = info.iter()?;
        let main_info = ContractCreateMainInfo {
            from_addr: info.next_val()?,
            account_nonce: info.next_val()?,
            amount: info.next_val()?,
            payload: info.next_val()?,
        };
        info.finish()?;
        Ok(ContractCreateTx::from_parts(main_info, signs))
    }
}

/// Replaces the code of `contract_addr`
#[derive(Clone, Debug, Default)]
pub struct ContractUpgradeTx {
    main_info: ContractUpgradeMainInfo,
    signs: Vec<SignData>,
    hash: OnceCell<Hash>,
}

impl ContractUpgradeTx {
    pub fn new(main_info: ContractUpgradeMainInfo) -> Self {
        ContractUpgradeTx::from_parts(main_info, Vec::new())
    }

    pub fn from_parts(main_info: ContractUpgradeMainInfo, signs: Vec<SignData>) -> Self {
        ContractUpgradeTx {
            main_info,
            signs,
            hash: OnceCell::new(),
        }
    }

    pub fn main_info(&self) -> &ContractUpgradeMainInfo {
        &self.main_info
    }

    pub fn signs(&self) -> &[SignData] {
        &self.signs
    }

    pub fn sign(&mut self, signer: &Signer, key: &PrivateKey) -> Result<()> {
        let sign = signer.sign(&self.main_info, key)?;
        self.signs.push(sign);
        self.hash = OnceCell::new();
        Ok(())
    }

    pub fn hash(&self) -> Hash {
        *self
            .hash
            .get_or_init(|| keccak(encode_tagged(TX_CONTRACT_UPGRADE, self)))
    }

    pub fn from(&self) -> Address {
        self.main_info.from_addr
    }

    pub fn contract_address(&self) -> Address {
        self.main_info.contract_addr
    }

    pub fn gas(&self) -> u64 {
        CONTRACT_TX_GAS
    }

    /// Upgrades move no value
    pub fn cost(&self) -> U256 {
        U256::zero()
    }

    pub fn check_basic(&self, censor: &dyn TxCensor) -> Result<()> {
        check_payload(&self.main_info.payload, codec::encode(self).len() + codec::TAG_LEN)?;
        ensure!(is_wasm(&self.main_info.payload), Error::Params);
        ensure!(!censor.is_blacklisted(&self.from()), Error::BlacklistAddress);
        verify_signs(
            censor,
            TX_CONTRACT_UPGRADE,
            &self.main_info,
            &self.signs,
            &self.from(),
        )
        .map_err(|e| {
            debug!("Contract upgrade {} rejected: {}", self.hash(), e);
            e
        })
    }

    pub fn check_state(&self, censor: &dyn TxCensor) -> Result<()> {
        let mut state = censor.lock_state();
        let from = self.from();
        check_nonce(&**state, &from, self.main_info.account_nonce)?;
        state.set_nonce(&from, self.main_info.account_nonce + 1);
        Ok(())
    }

    pub fn as_message(&self) -> Message {
        Message {
            from: self.from(),
            to: Some(self.contract_address()),
            token: native_token(),
            nonce: self.main_info.account_nonce,
            amount: U256::zero(),
            gas_limit: self.gas(),
            gas_price: U256::from(GAS_PRICE),
            data: self.main_info.payload.clone(),
            check_nonce: false,
        }
    }
}

impl PartialEq for ContractUpgradeTx {
    fn eq(&self, other: &Self) -> bool {
        self.main_info == other.main_info && self.signs == other.signs
    }
}

impl Encodable for ContractUpgradeTx {
    fn encode(&self, s: &mut Encoder) {
        encode_signed(s, &self.main_info, &self.signs);
    }
}

impl Decodable for ContractUpgradeTx {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let info = fields.next_item()?;
        let signs = fields.next_list()?;
        fields.finish()?;

        let mut info = info.iter()?;
        let main_info = ContractUpgradeMainInfo {
            from_addr: info.next_val()?,
            contract_addr: info.next_val()?,
            account_nonce: info.next_val()?,
            payload: info.next_val()?,
        };
        info.finish()?;
        Ok(ContractUpgradeTx::from_parts(main_info, signs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::SignerEntry;

    fn signers(keys: &[PrivateKey], min_signer_power: u64) -> SignersInfo {
        SignersInfo {
            min_signer_power,
            signers: keys
                .iter()
                .map(|key| SignerEntry {
                    power: 1,
                    address: key.address(),
                })
                .collect(),
        }
    }

    fn upgrade(from: Address) -> ContractUpgradeTx {
        let mut payload = crate::params::WASM_MAGIC.to_vec();
        payload.extend_from_slice(&[1, 0, 0, 0]);
        ContractUpgradeTx::new(ContractUpgradeMainInfo {
            from_addr: from,
            contract_addr: Address::from_name(b"contract"),
            account_nonce: 4,
            payload,
        })
    }

    #[test]
    fn it_counts_each_signer_once() {
        let signer = Signer::new(1);
        let keys: Vec<PrivateKey> = (0..3).map(|_| PrivateKey::random()).collect();
        let info = signers(&keys, 2);

        let mut tx = upgrade(keys[0].address());
        tx.sign(&signer, &keys[0]).unwrap();
        tx.sign(&signer, &keys[0]).unwrap();
        assert_eq!(
            info.verify_account_signs(&signer, tx.main_info(), tx.signs(), &tx.from()),
            Err(Error::VerifySignFailed("insufficient signer power"))
        );

        tx.sign(&signer, &keys[2]).unwrap();
        assert_eq!(
            info.verify_account_signs(&signer, tx.main_info(), tx.signs(), &tx.from()),
            Ok(())
        );
    }

    #[test]
    fn it_requires_the_sender_to_sign() {
        let signer = Signer::new(1);
        let keys: Vec<PrivateKey> = (0..3).map(|_| PrivateKey::random()).collect();
        let info = signers(&keys, 2);

        let mut tx = upgrade(keys[0].address());
        tx.sign(&signer, &keys[1]).unwrap();
        tx.sign(&signer, &keys[2]).unwrap();
        assert_eq!(
            info.verify_account_signs(&signer, tx.main_info(), tx.signs(), &tx.from()),
            Err(Error::VerifySignFailed("sender did not sign"))
        );

        tx.sign(&signer, &PrivateKey::random()).unwrap();
        assert_eq!(
            info.verify_account_signs(&signer, tx.main_info(), tx.signs(), &tx.from()),
            Err(Error::VerifySignFailed("signer is not authorised"))
        );
    }

    #[test]
    fn it_round_trips() {
        let signer = Signer::new(1);
        let key = PrivateKey::random();
        let mut create = ContractCreateTx::new(ContractCreateMainInfo {
            from_addr: key.address(),
            account_nonce: 0,
            amount: U256::from(7),
            payload: vec![0, 0x61, 0x73, 0x6d],
        });
        create.sign(&signer, &key).unwrap();
        let decoded: ContractCreateTx = codec::decode(&codec::encode(&create)).unwrap();
        assert_eq!(decoded, create);
        assert_eq!(decoded.hash(), create.hash());
        assert_eq!(decoded.cost(), U256::from(7));

        let mut up = upgrade(key.address());
        up.sign(&signer, &key).unwrap();
        let decoded: ContractUpgradeTx = codec::decode(&codec::encode(&up)).unwrap();
        assert_eq!(decoded, up);
        assert_eq!(decoded.as_message().to, Some(Address::from_name(b"contract")));
        assert_eq!(decoded.as_message().gas_limit, CONTRACT_TX_GAS);
    }
}
