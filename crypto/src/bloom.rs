use std::fmt;

use crate::hash::keccak;

/// Width of a logs bloom in bytes
pub const BLOOM_LEN: usize = 256;

/// 2048 bit filter over log addresses and topics
#[derive(Clone, Copy)]
pub struct Bloom(pub [u8; BLOOM_LEN]);

impl Bloom {
    /// Sets the three bits selected by the Keccak of `data`
    pub fn add(&mut self, data: &[u8]) {
        for (index, bit) in bits(data).iter() {
            self.0[*index] |= bit;
        }
    }

    /// Whether every bit for `data` is set
    pub fn contains(&self, data: &[u8]) -> bool {
        bits(data).iter().all(|(index, bit)| self.0[*index] & bit == *bit)
    }

    /// Whether no bit is set
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

fn bits(data: &[u8]) -> [(usize, u8); 3] {
    let hash = keccak(data);
    let mut out = [(0, 0); 3];
    for (i, slot) in out.iter_mut().enumerate() {
        let n = (usize::from(hash.0[2 * i]) << 8 | usize::from(hash.0[2 * i + 1])) & 2047;
        *slot = (BLOOM_LEN - 1 - n / 8, 1 << (n % 8));
    }
    out
}

impl Default for Bloom {
    fn default() -> Self {
        Bloom([0; BLOOM_LEN])
    }
}

impl PartialEq for Bloom {
    fn eq(&self, other: &Self) -> bool {
        self.0[..] == other.0[..]
    }
}

impl Eq for Bloom {}

impl fmt::Debug for Bloom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bloom({})", hex::encode(&self.0[..]))
    }
}

impl codec::Encodable for Bloom {
    fn encode(&self, s: &mut codec::Encoder) {
        s.append_bytes(&self.0);
    }
}

impl codec::Decodable for Bloom {
    fn decode(rlp: &codec::Rlp) -> codec::Result<Self> {
        let data = rlp.data()?;
        if data.len() != BLOOM_LEN {
            return Err(codec::Error::InvalidLength {
                expected: BLOOM_LEN,
                got: data.len(),
            });
        }
        let mut out = [0u8; BLOOM_LEN];
        out.copy_from_slice(data);
        Ok(Bloom(out))
    }
}

impl serde::Serialize for Bloom {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0[..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_remembers_added_items() {
        let mut bloom = Bloom::default();
        assert!(bloom.is_empty());
        bloom.add(b"topic");
        assert!(bloom.contains(b"topic"));
        assert!(!bloom.is_empty());
        assert!(bloom.0.iter().map(|b| b.count_ones()).sum::<u32>() <= 3);
    }

    #[test]
    fn it_encodes_as_a_fixed_string() {
        let bloom = Bloom::default();
        let bytes = codec::encode(&bloom);
        assert_eq!(&bytes[..3], &[0xb9, 0x01, 0x00]);
        assert_eq!(codec::decode::<Bloom>(&bytes).unwrap(), bloom);
    }
}
