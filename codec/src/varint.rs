//! Little-endian base-128 integers
//!
//! Only used where a hash pre-image needs an index appended (key derivations,
//! bulletproof generators). Wire structures use the length-prefixed encoding.

use crate::{Error, Result};

/// Serializes `n` with 7 bits per byte, least significant group first
pub fn serialize(mut n: u64) -> Vec<u8> {
    let mut vec = Vec::new();

    while n > 127 {
        vec.push(128 | n as u8);
        n >>= 7;
    }

    vec.push(n as u8);

    vec
}

/// Deserializes a varint from the front of `bytes`
///
/// # Returns
/// The value and the number of bytes consumed
pub fn deserialize(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut n: u64 = 0;

    for (i, byte) in bytes.iter().enumerate() {
        let shift = 7 * i as u32;
        if shift > 63 || (shift == 63 && (byte & 127) > 1) {
            return Err(Error::IntegerOverflow(8));
        }
        n |= u64::from(byte & 127) << shift;

        if *byte < 128 {
            // The last byte of a multi byte varint may not be zero
            if i > 0 && *byte == 0 {
                return Err(Error::NonCanonicalLength);
            }
            return Ok((n, i + 1));
        }
    }

    Err(Error::UnexpectedEnd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_encodes_known_values() {
        assert_eq!(serialize(0), vec![0]);
        assert_eq!(serialize(127), vec![0x7f]);
        assert_eq!(serialize(128), vec![0x80, 0x01]);
        assert_eq!(serialize(300), vec![0xac, 0x02]);
    }

    #[test]
    fn it_decodes_what_it_encodes() {
        for n in &[0u64, 1, 127, 128, 16383, 16384, u64::from(u32::max_value()), u64::max_value()] {
            let bytes = serialize(*n);
            assert_eq!(deserialize(&bytes).unwrap(), (*n, bytes.len()));
        }
    }

    #[test]
    fn it_rejects_truncated_and_padded_input() {
        assert_eq!(deserialize(&[0x80]), Err(Error::UnexpectedEnd));
        assert_eq!(deserialize(&[0x80, 0x00]), Err(Error::NonCanonicalLength));
    }
}
