//! Signer set proposals
//!
//! A [`MultiSignAccountTx`] installs the [`SignersInfo`] that authorises one
//! kind of administrative transaction. Validators approve it with their
//! ed25519 keys; more than two thirds of the voting power must sign.

use std::collections::HashSet;

use ensure_macro::ensure;
use log::debug;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use codec::{encode_tagged, Decodable, Encodable, Encoder, Rlp};
use crypto::{
    ed25519::{PrivKey, Signature},
    keccak, Address, Hash,
};

use crate::censor::TxCensor;
use crate::params::multi_sign_admin;
use crate::signer::{SignData, SignFields, Signer};
use crate::tx::transfer::check_nonce;
use crate::tx::{TX_CONTRACT_CREATE, TX_CONTRACT_UPGRADE, TX_MULTI_SIGN_ACCOUNT};
use crate::validator::ValidatorSet;
use crate::{Error, Result};

/// One authorised signer and its weight
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SignerEntry {
    pub power: u64,
    pub address: Address,
}

/// Signers of an administrative transaction type and the power they need
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct SignersInfo {
    pub min_signer_power: u64,
    pub signers: Vec<SignerEntry>,
}

impl SignersInfo {
    pub fn power_of(&self, address: &Address) -> Option<u64> {
        self.signers
            .iter()
            .find(|entry| entry.address == *address)
            .map(|entry| entry.power)
    }

    pub fn total_power(&self) -> u64 {
        self.signers
            .iter()
            .fold(0u64, |acc, entry| acc.saturating_add(entry.power))
    }

    /// Non-empty, no duplicate signers, and the threshold is reachable
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.signers.is_empty(),
            Error::VerifySignFailed("empty signer set")
        );
        let mut seen = HashSet::new();
        for entry in &self.signers {
            ensure!(
                !entry.address.is_zero() && entry.power > 0,
                Error::VerifySignFailed("invalid signer entry")
            );
            ensure!(
                seen.insert(entry.address),
                Error::VerifySignFailed("duplicate signer entry")
            );
        }
        ensure!(
            self.min_signer_power > 0 && self.min_signer_power <= self.total_power(),
            Error::VerifySignFailed("unreachable signer power")
        );
        Ok(())
    }

    /// Checks account signatures over `tx` against this set
    ///
    /// Every signature must come from a member; each member counts once.
    /// `from` has to be among the signers and the accumulated power must
    /// reach the minimum.
    pub(crate) fn verify_account_signs<T: SignFields + ?Sized>(
        &self,
        signer: &Signer,
        tx: &T,
        signs: &[SignData],
        from: &Address,
    ) -> Result<()> {
        let mut seen = HashSet::new();
        let mut power = 0u64;
        for sign in signs {
            let address = signer
                .sender(tx, sign)
                .map_err(|_| Error::VerifySignFailed("unrecoverable signature"))?;
            let weight = self
                .power_of(&address)
                .ok_or(Error::VerifySignFailed("signer is not authorised"))?;
            if seen.insert(address) {
                power = power.saturating_add(weight);
            }
        }
        ensure!(
            seen.contains(from),
            Error::VerifySignFailed("sender did not sign")
        );
        ensure!(
            power >= self.min_signer_power,
            Error::VerifySignFailed("insufficient signer power")
        );
        Ok(())
    }
}

impl Encodable for SignerEntry {
    fn encode(&self, s: &mut Encoder) {
        s.begin_list().append(&self.power).append(&self.address).end_list();
    }
}

impl Decodable for SignerEntry {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let entry = SignerEntry {
            power: fields.next_val()?,
            address: fields.next_val()?,
        };
        fields.finish()?;
        Ok(entry)
    }
}

impl Encodable for SignersInfo {
    fn encode(&self, s: &mut Encoder) {
        s.begin_list()
            .append(&self.min_signer_power)
            .append_list(&self.signers)
            .end_list();
    }
}

impl Decodable for SignersInfo {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let info = SignersInfo {
            min_signer_power: fields.next_val()?,
            signers: fields.next_list()?,
        };
        fields.finish()?;
        Ok(info)
    }
}

/// What the validators sign
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MultiSignMainInfo {
    /// Nonce of the reserved admin account
    pub account_nonce: u64,
    /// Type name of the transactions the signer set authorises
    pub support_tx_type: String,
    pub signers_info: SignersInfo,
}

impl Encodable for MultiSignMainInfo {
    fn encode(&self, s: &mut Encoder) {
        s.begin_list()
            .append(&self.account_nonce)
            .append(&self.support_tx_type)
            .append(&self.signers_info)
            .end_list();
    }
}

impl Decodable for MultiSignMainInfo {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let info = MultiSignMainInfo {
            account_nonce: fields.next_val()?,
            support_tx_type: fields.next_val()?,
            signers_info: fields.next_val()?,
        };
        fields.finish()?;
        Ok(info)
    }
}

/// A validator's approval
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidatorSign {
    pub address: Address,
    pub signature: Signature,
}

impl Encodable for ValidatorSign {
    fn encode(&self, s: &mut Encoder) {
        s.begin_list().append(&self.address).append(&self.signature).end_list();
    }
}

impl Decodable for ValidatorSign {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let sign = ValidatorSign {
            address: fields.next_val()?,
            signature: fields.next_val()?,
        };
        fields.finish()?;
        Ok(sign)
    }
}

#[derive(Clone, Debug, Default)]
pub struct MultiSignAccountTx {
    main_info: MultiSignMainInfo,
    signatures: Vec<ValidatorSign>,
    hash: OnceCell<Hash>,
}

impl MultiSignAccountTx {
    pub fn new(main_info: MultiSignMainInfo) -> Self {
        MultiSignAccountTx::from_parts(main_info, Vec::new())
    }

    pub fn from_parts(main_info: MultiSignMainInfo, signatures: Vec<ValidatorSign>) -> Self {
        MultiSignAccountTx {
            main_info,
            signatures,
            hash: OnceCell::new(),
        }
    }

    pub fn main_info(&self) -> &MultiSignMainInfo {
        &self.main_info
    }

    pub fn signatures(&self) -> &[ValidatorSign] {
        &self.signatures
    }

    /// The bytes every validator signs
    pub fn sign_bytes(&self) -> Vec<u8> {
        codec::encode(&self.main_info)
    }

    /// Appends the approval of the validator holding `key`
    pub fn sign(&mut self, key: &PrivKey) {
        let signature = key.sign(&self.sign_bytes());
        self.signatures.push(ValidatorSign {
            address: key.pub_key().address(),
            signature,
        });
        self.hash = OnceCell::new();
    }

    pub fn hash(&self) -> Hash {
        *self
            .hash
            .get_or_init(|| keccak(encode_tagged(TX_MULTI_SIGN_ACCOUNT, self)))
    }

    /// Checks the approvals against `validators`
    ///
    /// Duplicate signers fail the whole transaction. Otherwise signatures
    /// are counted in order until more than two thirds of the voting power
    /// is reached.
    pub fn verify_sign(&self, validators: &ValidatorSet) -> Result<()> {
        let mut seen = HashSet::new();
        ensure!(
            self.signatures.iter().all(|sign| seen.insert(sign.address)),
            Error::VerifySignFailed("duplicate validator signature")
        );

        let message = self.sign_bytes();
        let needed = validators.supermajority();
        let mut power = 0u64;
        for sign in &self.signatures {
            let (_, validator) = validators
                .find_address(&sign.address)
                .ok_or(Error::VerifySignFailed("signer is not a validator"))?;
            ensure!(
                validator.pub_key.verify(&message, &sign.signature),
                Error::VerifySignFailed("invalid validator signature")
            );
            power = power.saturating_add(validator.voting_power);
            if power >= needed {
                return Ok(());
            }
        }
        debug!(
            "Signer set proposal {} reached {} of {} voting power",
            self.hash(),
            power,
            needed
        );
        Err(Error::VerifySignFailed("insufficient voting power"))
    }

    pub fn check_basic(&self, censor: &dyn TxCensor) -> Result<()> {
        let tx_type = self.main_info.support_tx_type.as_str();
        ensure!(
            tx_type == TX_CONTRACT_CREATE.name() || tx_type == TX_CONTRACT_UPGRADE.name(),
            Error::TxNotSupport
        );
        self.main_info.signers_info.validate()?;
        self.verify_sign(&censor.blockchain().validators())
    }

    /// Advances the nonce of the admin account
    pub fn check_state(&self, censor: &dyn TxCensor) -> Result<()> {
        let mut state = censor.lock_state();
        let admin = multi_sign_admin();
        check_nonce(&**state, &admin, self.main_info.account_nonce)?;
        state.set_nonce(&admin, self.main_info.account_nonce + 1);
        Ok(())
    }
}

impl PartialEq for MultiSignAccountTx {
    fn eq(&self, other: &Self) -> bool {
        self.main_info == other.main_info && self.signatures == other.signatures
    }
}

impl Encodable for MultiSignAccountTx {
    fn encode(&self, s: &mut Encoder) {
        s.begin_list()
            .append(&self.main_info)
            .append_list(&self.signatures)
            .end_list();
    }
}

impl Decodable for MultiSignAccountTx {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let main_info = fields.next_val()?;
        let signatures = fields.next_list()?;
        fields.finish()?;
        Ok(MultiSignAccountTx::from_parts(main_info, signatures))
    }
}
