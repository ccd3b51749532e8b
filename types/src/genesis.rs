//! The genesis document
//!
//! Stored as JSON. Fields left out of the file are filled in by
//! [`GenesisDoc::validate_and_complete`].

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use ensure_macro::ensure;
use log::info;
use serde::{Deserialize, Serialize};

use crypto::{ed25519::PubKey, Address, Hash};

use crate::consensus_params::ConsensusParams;
use crate::validator::{typed_pub_key, Validator, ValidatorSet};
use crate::{Error, Result};

pub const MAX_CHAIN_ID_LEN: usize = 50;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GenesisValidator {
    #[serde(with = "typed_pub_key")]
    pub pub_key: PubKey,
    pub power: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub coinbase: Address,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenesisDoc {
    /// Milliseconds since the unix epoch
    #[serde(default)]
    pub genesis_time: u64,
    pub chain_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consensus_params: Option<ConsensusParams>,
    #[serde(default)]
    pub validators: Vec<GenesisValidator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_hash: Option<Hash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_state: Option<serde_json::Value>,
}

impl GenesisDoc {
    /// Checks the document and fills in the defaults
    pub fn validate_and_complete(&mut self) -> Result<()> {
        ensure!(
            !self.chain_id.is_empty(),
            Error::InvalidGenesis("chain id is empty".to_string())
        );
        ensure!(
            self.chain_id.len() <= MAX_CHAIN_ID_LEN,
            Error::InvalidGenesis(format!(
                "chain id is longer than {} characters",
                MAX_CHAIN_ID_LEN
            ))
        );

        let params = self.consensus_params.get_or_insert_with(ConsensusParams::default);
        params.validate()?;

        for validator in &self.validators {
            ensure!(
                validator.power > 0,
                Error::InvalidGenesis(format!(
                    "validator {} has no voting power",
                    validator.pub_key.address()
                ))
            );
        }

        if self.genesis_time == 0 {
            self.genesis_time = now_millis();
        }
        Ok(())
    }

    pub fn consensus_params(&self) -> ConsensusParams {
        self.consensus_params.unwrap_or_default()
    }

    pub fn validator_set(&self) -> ValidatorSet {
        ValidatorSet::new(
            self.validators
                .iter()
                .map(|v| Validator::new(v.pub_key, v.power, v.coinbase))
                .collect(),
        )
    }

    /// Hash of the initial validator set
    pub fn validator_hash(&self) -> Hash {
        self.validator_set().hash()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let mut doc: GenesisDoc =
            serde_json::from_str(json).map_err(|e| Error::Json(e.to_string()))?;
        doc.validate_and_complete()?;
        Ok(doc)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Json(e.to_string()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| Error::Io(format!("{}: {}", path.display(), e)))?;
        let doc = GenesisDoc::from_json(&json)?;
        info!("Loaded genesis of chain {} from {}", doc.chain_id, path.display());
        Ok(doc)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)
            .map_err(|e| Error::Io(format!("{}: {}", path.display(), e)))
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
