use serde::{Deserialize, Serialize};

use crate::ecc::{key_image, Point, Scalar, BASEPOINT_TABLE};

/// An unsigned 256-bit value used as a private key. Represented with lowercase letters
pub type SecretKey = Scalar;

/// A point on the elliptic curve. Usually determined by multiplication of a scalar to the curve
/// basepoint
pub type PublicKey = Point;

/// `x * Hp(xG)`, published when an output is spent
pub type KeyImage = PublicKey;

/// A pair of a given secret key and its corresponding public key
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyPair {
    /// The secret key
    pub secret_key: SecretKey,
    /// The public key
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a random keypair using the OS CSPRNG
    pub fn generate() -> Self {
        let secret_key = Scalar::random(&mut rand::rngs::OsRng);

        Self::from(secret_key)
    }

    /// The key image of this pair, treating it as a one-time output key
    pub fn key_image(&self) -> KeyImage {
        key_image(&self.secret_key, &self.public_key)
    }
}

impl From<Scalar> for KeyPair {
    fn from(secret_key: SecretKey) -> Self {
        let public_key = &secret_key * &BASEPOINT_TABLE;
        Self {
            secret_key,
            public_key,
        }
    }
}
