use sha3::{Digest, Keccak256};

fixed_bytes!(
    /// A Keccak-256 digest
    Hash,
    32
);

fixed_bytes!(
    /// A 20 byte account or validator address
    Address,
    20
);

/// Computes the Keccak-256 digest of `data`
pub fn keccak<T: AsRef<[u8]>>(data: T) -> Hash {
    Hash::from_hasher(Keccak256::new().chain(data.as_ref()))
}

/// Computes the SHA-256 digest of `data`
pub fn sha256<T: AsRef<[u8]>>(data: T) -> Hash {
    let digest = sha2::Sha256::digest(data.as_ref());
    Hash(*array_ref!(digest, 0, 32))
}

/// Computes the Keccak-256 digest of the concatenation of `parts`
pub fn keccak_concat(parts: &[&[u8]]) -> Hash {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.input(part);
    }
    Hash::from_hasher(hasher)
}

impl Hash {
    /// The all zero hash
    pub fn zero() -> Self {
        Hash([0; 32])
    }

    /// Finishes an incremental Keccak-256 computation
    pub fn from_hasher(hasher: Keccak256) -> Self {
        let digest = hasher.result();
        Hash(*array_ref!(digest, 0, 32))
    }

    /// Finishes an incremental computation and resets the hasher for reuse
    pub fn from_hasher_reset(hasher: &mut Keccak256) -> Self {
        let digest = hasher.result_reset();
        Hash(*array_ref!(digest, 0, 32))
    }
}

impl Address {
    /// Takes the last 20 bytes of a digest
    pub fn from_hash(hash: &Hash) -> Self {
        Address(*array_ref!(hash.0, 12, 20))
    }

    /// Right aligns a short name into an address
    ///
    /// Reserved administrative accounts are addressed by their name, e.g.
    /// `Address::from_name(b"mst")` ends in `6d7374`.
    pub fn from_name(name: &[u8]) -> Self {
        let mut out = [0u8; 20];
        let len = name.len().min(20);
        out[20 - len..].copy_from_slice(&name[name.len() - len..]);
        Address(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_hashes_the_empty_string() {
        assert_eq!(
            keccak(b"").to_string(),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
        assert_eq!(keccak_concat(&[&b"ab"[..], &b"c"[..]]), keccak(b"abc"));
        assert_eq!(
            sha256(b"").to_string(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn it_parses_hex() {
        let hash: Hash = "0x0102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f20"
            .parse()
            .unwrap();
        assert_eq!(hash.0[0], 1);
        assert_eq!(hash.0[31], 32);

        assert_eq!(
            "01".parse::<Hash>(),
            Err(crate::Error::InvalidLength {
                expected: 32,
                got: 1
            })
        );
        assert_eq!("zz".parse::<Address>(), Err(crate::Error::InvalidHex));
    }

    #[test]
    fn it_aligns_names() {
        let addr = Address::from_name(b"mst");
        assert_eq!(addr.to_string(), "00000000000000000000000000000000006d7374");
    }

    #[test]
    fn it_serializes_as_hex() {
        let addr = Address([0xab; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(20)));
        assert_eq!(serde_json::from_str::<Address>(&json).unwrap(), addr);
    }
}
