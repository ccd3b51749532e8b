//! Ed25519 keys used by validators for votes and administrative signatures

use std::convert::TryFrom;
use std::fmt;

use ed25519_dalek::{Keypair, Signer, Verifier};
use rand::RngCore;

use crate::hash::{keccak, Address};
use crate::{Error, Result};

/// Type name carried next to validator keys in JSON documents
pub const KEY_TYPE: &str = "ed25519";

fixed_bytes!(
    /// An ed25519 public key
    PubKey,
    32
);

impl PubKey {
    /// The validator address of this key
    pub fn address(&self) -> Address {
        Address::from_hash(&keccak(self.0))
    }

    /// Verifies `signature` over `message`
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let key = match ed25519_dalek::PublicKey::from_bytes(&self.0) {
            Ok(key) => key,
            Err(_) => return false,
        };
        let signature = match ed25519_dalek::Signature::try_from(&signature.0[..]) {
            Ok(signature) => signature,
            Err(_) => return false,
        };
        key.verify(message, &signature).is_ok()
    }
}

/// A 64 byte ed25519 signature
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    /// Copies a 64 byte slice
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 64 {
            return Err(Error::InvalidLength {
                expected: 64,
                got: bytes.len(),
            });
        }
        let mut out = [0u8; 64];
        out.copy_from_slice(bytes);
        Ok(Signature(out))
    }

    /// The raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(&self.0[..]))
    }
}

impl serde::Serialize for Signature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0[..]))
    }
}

impl<'de> serde::Deserialize<'de> for Signature {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        Signature::from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}

impl codec::Encodable for Signature {
    fn encode(&self, s: &mut codec::Encoder) {
        s.append_bytes(&self.0);
    }
}

impl codec::Decodable for Signature {
    fn decode(rlp: &codec::Rlp) -> codec::Result<Self> {
        <[u8; 64] as codec::Decodable>::decode(rlp).map(Signature)
    }
}

/// An ed25519 secret key together with its public half
pub struct PrivKey(Keypair);

impl PrivKey {
    /// Generates a key from the OS CSPRNG
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut seed);
        let secret = ed25519_dalek::SecretKey::from_bytes(&seed)
            .expect("32 bytes are always a valid ed25519 seed");
        let public = ed25519_dalek::PublicKey::from(&secret);
        PrivKey(Keypair { secret, public })
    }

    /// Parses a 32 byte seed or a 64 byte `seed || public key`
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes.len() {
            32 => {
                let secret = ed25519_dalek::SecretKey::from_bytes(bytes)
                    .map_err(|_| Error::InvalidPrivateKey)?;
                let public = ed25519_dalek::PublicKey::from(&secret);
                Ok(PrivKey(Keypair { secret, public }))
            }
            64 => Keypair::from_bytes(bytes)
                .map(PrivKey)
                .map_err(|_| Error::InvalidPrivateKey),
            got => Err(Error::InvalidLength { expected: 64, got }),
        }
    }

    /// `seed || public key`
    pub fn to_bytes(&self) -> [u8; 64] {
        self.0.to_bytes()
    }

    /// The public half
    pub fn pub_key(&self) -> PubKey {
        PubKey(self.0.public.to_bytes())
    }

    /// Signs `message`
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.0.sign(message).to_bytes())
    }
}

impl fmt::Debug for PrivKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivKey({})", self.pub_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_signs_and_verifies() {
        let key = PrivKey::generate();
        let sig = key.sign(b"vote");
        assert!(key.pub_key().verify(b"vote", &sig));
        assert!(!key.pub_key().verify(b"other vote", &sig));
        assert!(!PrivKey::generate().pub_key().verify(b"vote", &sig));
    }

    #[test]
    fn it_reloads_from_bytes() {
        let key = PrivKey::generate();
        let copy = PrivKey::from_bytes(&key.to_bytes()).unwrap();
        assert_eq!(copy.pub_key(), key.pub_key());

        let from_seed = PrivKey::from_bytes(&key.to_bytes()[..32]).unwrap();
        assert_eq!(from_seed.pub_key(), key.pub_key());
        assert!(PrivKey::from_bytes(&[0u8; 10]).is_err());
    }

    #[test]
    fn it_derives_addresses_from_the_key_hash() {
        let key = PrivKey::generate().pub_key();
        assert_eq!(key.address().0[..], keccak(key.0).0[12..]);
    }
}
