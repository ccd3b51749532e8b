//! Recoverable ECDSA over secp256k1 for account signatures

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use rand::RngCore;

use crate::hash::{keccak, Address, Hash};
use crate::{Error, Result};

/// `r || s || recovery id`
pub const SIGNATURE_LEN: usize = 65;

/// Order of the secp256k1 group
const N: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe,
    0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36, 0x41, 0x41,
];

/// `N / 2`, the largest `s` accepted after homestead
const HALF_N: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

/// A secp256k1 secret key
#[derive(Clone)]
pub struct PrivateKey(SigningKey);

impl PrivateKey {
    /// Parses a 32 byte big-endian secret
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        SigningKey::from_slice(bytes)
            .map(PrivateKey)
            .map_err(|_| Error::InvalidPrivateKey)
    }

    /// Parses a hex encoded secret
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(|_| Error::InvalidHex)?;
        Self::from_slice(&bytes)
    }

    /// Generates a random key using the OS CSPRNG
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        loop {
            rand::rngs::OsRng.fill_bytes(&mut bytes);
            if let Ok(key) = Self::from_slice(&bytes) {
                return key;
            }
        }
    }

    /// The big-endian secret
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.0.to_bytes());
        out
    }

    /// The address controlled by this key
    pub fn address(&self) -> Address {
        public_key_address(self.0.verifying_key())
    }

    /// Signs a 32 byte digest, returning `r || s || recovery id`
    ///
    /// `s` is always in the lower half of the order.
    pub fn sign(&self, hash: &Hash) -> Result<[u8; SIGNATURE_LEN]> {
        let (signature, recovery_id) = self
            .0
            .sign_prehash_recoverable(hash.as_bytes())
            .map_err(|_| Error::InvalidSignature)?;

        let mut out = [0u8; SIGNATURE_LEN];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = recovery_id.to_byte();
        Ok(out)
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrivateKey({})", self.address())
    }
}

/// Last 20 bytes of the Keccak of the uncompressed key without its prefix
fn public_key_address(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    Address::from_hash(&keccak(&point.as_bytes()[1..]))
}

/// Recovers the signing address of `hash`
///
/// Signatures with `s` in the upper half are accepted here; callers that
/// require low `s` check it with [`validate_signature_values`] first.
pub fn recover(hash: &Hash, r: &[u8; 32], s: &[u8; 32], recovery_id: u8) -> Result<Address> {
    let mut rs = [0u8; 64];
    rs[..32].copy_from_slice(r);
    rs[32..].copy_from_slice(s);

    let signature = Signature::from_slice(&rs).map_err(|_| Error::InvalidSignature)?;
    let mut id = RecoveryId::from_byte(recovery_id).ok_or(Error::InvalidRecoveryId(recovery_id))?;

    // (r, n - s) recovers the same key with the opposite parity
    let signature = match signature.normalize_s() {
        Some(normalized) => {
            id = RecoveryId::new(!id.is_y_odd(), id.is_x_reduced());
            normalized
        }
        None => signature,
    };

    let key = VerifyingKey::recover_from_prehash(hash.as_bytes(), &signature, id)
        .map_err(|_| Error::RecoveryFailed)?;
    Ok(public_key_address(&key))
}

/// Range checks on a signature before recovery
///
/// `r` and `s` must lie in `[1, N)`, `v` must be 0 or 1 and, when
/// `homestead` is set, `s` must not exceed `N / 2`.
pub fn validate_signature_values(v: u8, r: &[u8; 32], s: &[u8; 32], homestead: bool) -> bool {
    let nonzero = |x: &[u8; 32]| x.iter().any(|b| *b != 0);
    if !nonzero(r) || !nonzero(s) {
        return false;
    }
    if homestead && s[..] > HALF_N[..] {
        return false;
    }
    r[..] < N[..] && s[..] < N[..] && (v == 0 || v == 1)
}
