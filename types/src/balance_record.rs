//! Per block ledger of balance movements
//!
//! Execution reports every movement of value here so that external tools
//! can reconcile balances. The ledger is opt-in: embedders hold a
//! [`BalanceLedger`] only when recording is enabled.

use std::sync::{Mutex, MutexGuard};

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crypto::{Address, Hash};

use crate::{Error, Result};

/// Kind of the party on either side of a movement
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Account,
    Contract,
    Utxo,
}

/// Why value moved
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Transfer,
    Fee,
    Refund,
    Reward,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BalanceRecord {
    pub from: Address,
    pub to: Address,
    pub from_kind: AccountKind,
    pub to_kind: AccountKind,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub token_id: Address,
    #[serde(with = "decimal")]
    pub amount: U256,
}

/// Every movement caused by one transaction
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TxBalanceRecords {
    pub hash: Hash,
    pub tx_type: String,
    pub records: Vec<BalanceRecord>,
    pub nonce: u64,
    #[serde(with = "decimal")]
    pub gas_price: U256,
    pub gas_used: u64,
}

impl TxBalanceRecords {
    pub fn new(
        hash: Hash,
        tx_type: &str,
        records: Vec<BalanceRecord>,
        nonce: u64,
        gas_price: U256,
        gas_used: u64,
    ) -> Self {
        TxBalanceRecords {
            hash,
            tx_type: tx_type.to_string(),
            records,
            nonce,
            gas_price,
            gas_used,
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct BlockBalanceRecords {
    pub block_hash: Hash,
    /// Seconds since the unix epoch
    pub block_time: u64,
    pub tx_records: Vec<TxBalanceRecords>,
}

/// The records of the block being executed
#[derive(Debug, Default)]
pub struct BalanceLedger(Mutex<BlockBalanceRecords>);

impl BalanceLedger {
    pub fn new() -> Self {
        BalanceLedger::default()
    }

    fn records(&self) -> MutexGuard<'_, BlockBalanceRecords> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts over for a new block
    pub fn reset(&self) {
        *self.records() = BlockBalanceRecords::default();
    }

    pub fn add_tx_balance_record(&self, records: TxBalanceRecords) {
        self.records().tx_records.push(records);
    }

    pub fn set_block_hash(&self, hash: Hash) {
        self.records().block_hash = hash;
    }

    pub fn set_block_time(&self, time: u64) {
        self.records().block_time = time;
    }

    pub fn snapshot(&self) -> BlockBalanceRecords {
        self.records().clone()
    }

    pub fn json(&self) -> Result<String> {
        serde_json::to_string(&*self.records()).map_err(|e| Error::Json(e.to_string()))
    }
}

/// Amounts as decimal strings, too wide for JSON numbers
mod decimal {
    use primitive_types::U256;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        U256::from_dec_str(&s).map_err(|e| D::Error::custom(format!("{:?}", e)))
    }
}
