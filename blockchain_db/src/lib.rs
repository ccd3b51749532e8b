#![deny(missing_docs)]

//! # Blockchain DB
//! In-memory implementations of the collaborators transaction admission
//! consults: account state, the confidential output log, the chain and the
//! signer set registry.

mod chain;
mod error;
mod state;
mod tx_mgr;
mod utxo_store;

pub use chain::MemBlockChain;
pub use error::{Error, Result};
pub use state::MemState;
pub use tx_mgr::MemTxMgr;
pub use utxo_store::MemUtxoStore;
