#![deny(missing_docs)]
//! Utilities for the keys behind confidential outputs
//!
//! Recipients publish a view and a spend key. Senders derive a fresh
//! one-time key per output from them, and recipients recognise and spend
//! those outputs with their secret keys.

mod account_keys;
pub mod address;
mod derivation;
pub mod subaddress;
pub mod tx_construction;
pub mod tx_scanning;

pub use account_keys::AccountKeys;
pub use address::{AddressType, StealthAddress};
pub use derivation::Derivation;
pub use subaddress::SubAddressIndex;
