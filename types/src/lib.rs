//! # Chain types
//!
//! Blocks, votes and validator sets of the consensus, the transaction family
//! with its signing rules, and the two phase admission every transaction
//! passes before it reaches the pool: stateless `check_basic`, then
//! `check_state` against the collaborators of a [`censor::TxCensor`].

pub mod balance_record;
pub mod bit_array;
pub mod blacklist;
pub mod block;
pub mod censor;
pub mod consensus_params;
mod error;
pub mod evidence;
pub mod fee;
pub mod genesis;
pub mod params;
pub mod part_set;
pub mod signer;
pub mod tx;
pub mod validator;
pub mod vote;

pub use error::{Error, Result};
pub use tx::{Message, Tx};
