//! Cryptographic primitives
//!
//! Keccak-256 hashing and addresses, the ed25519 group used by confidential
//! outputs, secp256k1 recoverable signatures for accounts, ed25519 validator
//! keys and the simple Merkle tree used by block headers.

#[macro_use]
extern crate arrayref;
#[macro_use]
extern crate lazy_static;

#[macro_use]
mod bytes;

pub mod bloom;
pub mod ecc;
pub mod ed25519;
mod error;
pub mod hash;
pub mod keys;
pub mod merkle;
pub mod secp256k1;

pub use curve25519_dalek;
pub use digest::Digest;
pub use sha3::Keccak256;

pub use bloom::Bloom;
pub use ecc::{Key, ScalarExt};
pub use error::{Error, Result};
pub use hash::{keccak, keccak_concat, Address, Hash};
pub use keys::{KeyImage, KeyPair, PublicKey, SecretKey};
