use std::collections::HashMap;
use std::sync::RwLock;

use log::info;

use types::censor::TxMgr;
use types::tx::{MultiSignAccountTx, SignersInfo};

/// Signer sets keyed by the transaction type name they authorise
#[derive(Debug, Default)]
pub struct MemTxMgr(RwLock<HashMap<String, SignersInfo>>);

impl MemTxMgr {
    /// Creates a manager without any signer set
    pub fn new() -> Self {
        MemTxMgr::default()
    }

    /// Installs `info` for `tx_type`, replacing the previous set
    pub fn set_signers_info(&self, tx_type: &str, info: SignersInfo) {
        self.0
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(tx_type.to_string(), info);
    }

    /// Applies an admitted signer set proposal
    pub fn apply(&self, tx: &MultiSignAccountTx) {
        let main_info = tx.main_info();
        info!(
            "Installing {} signers for {}",
            main_info.signers_info.signers.len(),
            main_info.support_tx_type
        );
        self.set_signers_info(&main_info.support_tx_type, main_info.signers_info.clone());
    }
}

impl TxMgr for MemTxMgr {
    fn get_signers_info(&self, tx_type: &str) -> Option<SignersInfo> {
        self.0
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(tx_type)
            .cloned()
    }
}
