//! # Single member ring signatures
//!
//! When every ring has exactly one member there is nothing to hide among,
//! so instead of an MLSAG each input carries a linkable Schnorr proof over
//! two keys: the one-time key `P` (linked through its key image
//! `I = x * Hp(P)`) and the commitment difference `D = C - C'` between the
//! spent output and its pseudo output, whose discrete log `z` proves both
//! commit to the same amount.
//!
//! ```text
//! L0 = s0 * G + c * P
//! R0 = s0 * Hp(P) + c * I
//! L1 = s1 * G + c * D
//! c  = Hs(message || P || L0 || R0 || D || L1)
//! ```

use ensure_macro::ensure;
use rand::rngs::OsRng;

use crypto::{
    ecc::{hash_to_point, Point, Scalar, ScalarExt, BASEPOINT_TABLE},
    Digest, Hash, Keccak256, Key, KeyImage,
};

use crate::{Error, Result};

/// Challenge and the two responses
#[derive(Clone, Debug, PartialEq)]
pub struct Signature {
    /// The challenge `c`
    pub c: Scalar,
    /// Responses for the one-time key and the commitment difference
    pub s: [Scalar; 2],
}

fn challenge(message: &[u8], dest: &Key, l0: &Point, r0: &Point, diff: &Key, l1: &Point) -> Scalar {
    let mut hasher = Keccak256::new();
    hasher.input(message);
    hasher.input(dest.as_bytes());
    hasher.input(l0.compress().as_bytes());
    hasher.input(r0.compress().as_bytes());
    hasher.input(diff.as_bytes());
    hasher.input(l1.compress().as_bytes());
    Scalar::from_keccak_hash(&Hash::from_hasher(hasher))
}

/// Signs `message` for the output `dest`
///
/// `secret` opens `dest` and `diff_secret` opens the commitment difference
/// `diff`. Returns the signature together with the key image.
pub fn generate_ring_signature(
    message: &[u8],
    dest: &Key,
    diff: &Key,
    secret: &Scalar,
    diff_secret: &Scalar,
) -> Result<(Signature, KeyImage)> {
    let dest_point = dest.decompress()?;
    ensure!(
        secret * &BASEPOINT_TABLE == dest_point,
        Error::InconsistentParameters
    );
    ensure!(
        diff_secret * &BASEPOINT_TABLE == diff.decompress()?,
        Error::InconsistentParameters
    );

    let hp = hash_to_point(dest.as_bytes());
    let key_image = secret * hp;

    let a0 = Scalar::random(&mut OsRng);
    let a1 = Scalar::random(&mut OsRng);
    let l0 = &a0 * &BASEPOINT_TABLE;
    let r0 = a0 * hp;
    let l1 = &a1 * &BASEPOINT_TABLE;

    let c = challenge(message, dest, &l0, &r0, diff, &l1);
    let s = [a0 - c * secret, a1 - c * diff_secret];

    Ok((Signature { c, s }, key_image))
}

/// Verifies a signature produced by [`generate_ring_signature`]
pub fn check_ring_signature(
    message: &[u8],
    dest: &Key,
    diff: &Key,
    key_image: &KeyImage,
    signature: &Signature,
) -> Result<()> {
    let dest_point = dest.decompress()?;
    let diff_point = diff.decompress()?;
    let Signature { c, s } = signature;

    let l0 = (&s[0] * &BASEPOINT_TABLE) + (c * dest_point);
    let r0 = (s[0] * hash_to_point(dest.as_bytes())) + (c * key_image);
    let l1 = (&s[1] * &BASEPOINT_TABLE) + (c * diff_point);

    ensure!(
        challenge(message, dest, &l0, &r0, diff, &l1) == *c,
        Error::InvalidSignature
    );
    Ok(())
}
