use crypto::{
    ecc::{Point, Scalar},
    Digest, Hash, Keccak256, KeyPair, PublicKey, ScalarExt,
};

/// Wrapper around the result (secret key * public key)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Derivation(pub(crate) Point);

impl Derivation {
    /// Create a new derivation from the given secret and public keys
    pub fn from(scalar: &Scalar, public_key: &PublicKey) -> Option<Self> {
        if !scalar.is_canonical() {
            return None;
        }

        Some(Derivation((scalar * public_key).mul_by_cofactor()))
    }

    /// Convert this derivation into a Scalar
    /// H_s(derivation || output_index)
    pub fn to_scalar(&self, output_index: u64) -> Scalar {
        let mut hasher = Keccak256::new();

        hasher.input(self.0.compress().as_bytes());
        hasher.input(codec::varint::serialize(output_index));

        Scalar::from_keccak_hash(&Hash::from_hasher(hasher))
    }

    /// Convert this derivation into a KeyPair with the following keys
    ///
    /// * Secret d: H_s(derivation || output_index)
    /// * Public: dG + spend_public_key
    pub fn to_keypair(&self, output_index: u64, spend_public_key: Point) -> KeyPair {
        let mut keypair = KeyPair::from(self.to_scalar(output_index));
        keypair.public_key += spend_public_key;

        keypair
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_is_symmetric() {
        let sender = KeyPair::generate();
        let receiver = KeyPair::generate();

        let ours = Derivation::from(&sender.secret_key, &receiver.public_key).unwrap();
        let theirs = Derivation::from(&receiver.secret_key, &sender.public_key).unwrap();
        assert_eq!(ours, theirs);
        assert_eq!(ours.to_scalar(3), theirs.to_scalar(3));
        assert_ne!(ours.to_scalar(3), ours.to_scalar(4));
    }
}
