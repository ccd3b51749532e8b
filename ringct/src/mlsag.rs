//! # Multilayered Linked Spontaneous Ad-Hoc Group Signatures
//! This implementation aims to follow the RingCT whitepaper with certain changes to variables
//! for clarity

// The range loops we use here aren't really unnecessary as we need the index to multiple Vecs
#![allow(clippy::needless_range_loop)]

use ensure_macro::ensure;
use rand::rngs::OsRng;

use crypto::{
    ecc::{hash_to_point, Point, Scalar, ScalarExt, BASEPOINT_TABLE},
    Digest, Hash, Keccak256, Key, KeyImage, SecretKey,
};

use crate::{Error, Matrix, Result};

/// MLSAG signature
#[derive(Clone, Debug, PartialEq)]
pub struct Signature {
    /// Responses, one per ring member and column
    pub s: Matrix<Scalar>,
    /// Challenge at ring member 0
    pub c: Scalar,

    /// Key Images
    pub key_images: Vec<KeyImage>,
}

fn challenge(hasher: &mut Keccak256) -> Scalar {
    Scalar::from_keccak_hash(&Hash::from_hasher_reset(hasher))
}

fn decompress_ring(ring: &Matrix<Key>) -> Result<Matrix<Point>> {
    let rows = ring
        .iter_rows()
        .map(|row| row.iter().map(Key::decompress).collect::<crypto::Result<Vec<_>>>())
        .collect::<crypto::Result<Vec<_>>>()?;
    Matrix::from_rows(rows).ok_or(Error::InconsistentParameters)
}

/// SIGN algorithm as defined in Monero
///
/// The version implemented in Monero differs from the version defined in
/// the RingCT whitepaper in that it allows specifying which keys need a key image.
/// Only the first `double_spendable_keys` columns are linked.
pub fn sign(
    message: &[u8],
    ring: &Matrix<Key>,
    index: usize,
    signer_keys: &[SecretKey],
    double_spendable_keys: usize,
) -> Result<Signature> {
    // NOTE: rows are ring members, columns are the keys of one member
    let rows = ring.rows();
    ensure!(rows >= 2, Error::InconsistentParameters);
    ensure!(index < rows, Error::InconsistentParameters);

    let cols = ring.cols();
    ensure!(signer_keys.len() == cols, Error::InconsistentParameters);
    ensure!(double_spendable_keys <= cols, Error::InconsistentParameters);

    let points = decompress_ring(ring)?;
    let hashed: Matrix<Point> = Matrix::from_fn(rows, double_spendable_keys, |row, col| {
        hash_to_point(ring[(row, col)].as_bytes())
    });

    // Generate key images
    let key_images: Vec<KeyImage> = (0..double_spendable_keys)
        .map(|col| signer_keys[col] * hashed[(index, col)])
        .collect();

    // Generate random scalar vector and matrix for signature
    let alpha: Vec<Scalar> = (0..cols).map(|_| Scalar::random(&mut OsRng)).collect();
    let mut signature = Matrix::from_fn(rows, cols, |_, _| Scalar::random(&mut OsRng));

    let mut hasher = Keccak256::new();

    hasher.input(message);
    for col in 0..double_spendable_keys {
        hasher.input(ring[(index, col)].as_bytes());
        hasher.input((&alpha[col] * &BASEPOINT_TABLE).compress().as_bytes());
        hasher.input((alpha[col] * hashed[(index, col)]).compress().as_bytes());
    }
    for col in double_spendable_keys..cols {
        hasher.input(ring[(index, col)].as_bytes());
        hasher.input((&alpha[col] * &BASEPOINT_TABLE).compress().as_bytes());
    }

    let mut vec_c: Vec<Scalar> = (0..rows).map(|_| Scalar::one()).collect();
    vec_c[(index + 1) % rows] = challenge(&mut hasher);

    // Progress the calculation
    for offset in 1..rows {
        let row = (index + offset) % rows;

        hasher.input(message);
        for col in 0..double_spendable_keys {
            hasher.input(ring[(row, col)].as_bytes());
            // L_j = s_j * G + c_j * P_j
            hasher.input(
                ((&signature[(row, col)] * &BASEPOINT_TABLE) + (vec_c[row] * points[(row, col)]))
                    .compress()
                    .as_bytes(),
            );
            // R_j = s_j * H(P_j) + c_j * I
            hasher.input(
                ((signature[(row, col)] * hashed[(row, col)]) + (vec_c[row] * key_images[col]))
                    .compress()
                    .as_bytes(),
            );
        }

        for col in double_spendable_keys..cols {
            hasher.input(ring[(row, col)].as_bytes());
            // L_j = s_j * G + c_j * P_j
            hasher.input(
                ((&signature[(row, col)] * &BASEPOINT_TABLE) + (vec_c[row] * points[(row, col)]))
                    .compress()
                    .as_bytes(),
            );
        }

        vec_c[(row + 1) % rows] = challenge(&mut hasher);
    }

    // Tweak signature for successful validation
    for (col, a) in alpha.iter().enumerate() {
        signature[(index, col)] = a - (vec_c[index] * signer_keys[col]);
    }

    Ok(Signature {
        s: signature,
        c: vec_c[0],
        key_images,
    })
}

/// VERIFY algorithm as defined in the RingCT paper
pub fn verify(
    message: &[u8],
    ring: &Matrix<Key>,
    signature: &Signature,
    double_spendable_keys: usize,
) -> Result<()> {
    // Assertions for input sanity
    let rows = ring.rows();
    ensure!(rows >= 2, Error::InconsistentSignature);

    let cols = ring.cols();
    ensure!(cols >= 1, Error::InconsistentSignature);
    ensure!(double_spendable_keys <= cols, Error::InconsistentSignature);
    ensure!(
        signature.s.rows() == rows && signature.s.cols() == cols,
        Error::InconsistentSignature
    );
    ensure!(
        signature.key_images.len() == double_spendable_keys,
        Error::InconsistentSignature
    );

    let Signature {
        key_images,
        c: c_0,
        s: signature,
    } = signature;
    let points = decompress_ring(ring)?;

    // Start the chain of computations
    let mut hasher = Keccak256::new();

    let mut last_c = *c_0;
    for row in 0..rows {
        hasher.input(message);

        // Start with the double spendable keys
        for col in 0..double_spendable_keys {
            // L_j = s_j * G + c_j * P_j
            let l = (&signature[(row, col)] * &BASEPOINT_TABLE) + (last_c * points[(row, col)]);
            // R_j = s_j * H(P_j) + c_j * I
            let r = (signature[(row, col)] * hash_to_point(ring[(row, col)].as_bytes()))
                + (last_c * key_images[col]);

            // pubkey || L || R
            hasher.input(ring[(row, col)].as_bytes());
            hasher.input(l.compress().as_bytes());
            hasher.input(r.compress().as_bytes());
        }

        // Continue with the non double spendable keys
        for col in double_spendable_keys..cols {
            // L_j = s_j * G + c_j * P_j
            let l = (&signature[(row, col)] * &BASEPOINT_TABLE) + (last_c * points[(row, col)]);

            // pubkey || L
            hasher.input(ring[(row, col)].as_bytes());
            hasher.input(l.compress().as_bytes());
        }
        last_c = challenge(&mut hasher);
    }

    ensure!(last_c == *c_0, Error::InvalidSignature);
    Ok(())
}
