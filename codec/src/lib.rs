//! Canonical binary encoding
//!
//! Every value has exactly one encoding: byte strings and lists carry a
//! length prefix, integers are minimal big-endian byte strings and a single
//! byte below `0x80` stands for itself. Decoding rejects anything that is not
//! the canonical form, so `encode(decode(b)) == b` whenever decoding succeeds.
//!
//! Item headers are read and written by the `rlp` crate. On top of it this
//! crate adds the stricter decoding rules and the typed traits.
//!
//! Polymorphic slots are written as a four byte [`TypeTag`] followed by the
//! encoding of the concrete value.

#![deny(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod impls;
mod tag;
pub mod varint;

pub use decoder::{Rlp, RlpIter};
pub use encoder::Encoder;
pub use error::{Error, Result};
pub use tag::{encode_tagged, TypeTag, TAG_LEN};

/// A value with a canonical encoding
pub trait Encodable {
    /// Appends the encoding of `self` to `s`
    fn encode(&self, s: &mut Encoder);
}

/// A value that can be read back from its canonical encoding
pub trait Decodable: Sized {
    /// Decodes a value from a single item
    fn decode(rlp: &Rlp) -> Result<Self>;
}

/// Encodes a single value
pub fn encode<E: Encodable + ?Sized>(value: &E) -> Vec<u8> {
    let mut s = Encoder::new();
    value.encode(&mut s);
    s.out()
}

/// Encodes a slice of values as a list
pub fn encode_list<E: Encodable>(items: &[E]) -> Vec<u8> {
    let mut s = Encoder::new();
    s.append_list(items);
    s.out()
}

/// Decodes a value that must span all of `bytes`
pub fn decode<D: Decodable>(bytes: &[u8]) -> Result<D> {
    D::decode(&Rlp::new(bytes)?)
}

/// Decodes a list that must span all of `bytes`
pub fn decode_list<D: Decodable>(bytes: &[u8]) -> Result<Vec<D>> {
    Rlp::new(bytes)?.as_list()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Pair {
        name: String,
        values: Vec<u64>,
    }

    impl Encodable for Pair {
        fn encode(&self, s: &mut Encoder) {
            s.begin_list();
            s.append(&self.name);
            s.append_list(&self.values);
            s.end_list();
        }
    }

    impl Decodable for Pair {
        fn decode(rlp: &Rlp) -> Result<Self> {
            let mut fields = rlp.iter()?;
            let pair = Pair {
                name: fields.next_val()?,
                values: fields.next_list()?,
            };
            fields.finish()?;
            Ok(pair)
        }
    }

    #[test]
    fn it_handles_structs() {
        let pair = Pair {
            name: "dog".to_string(),
            values: vec![1, 1024],
        };
        let bytes = encode(&pair);
        assert_eq!(hex::encode(&bytes), "c983646f67c401820400");
        assert_eq!(decode::<Pair>(&bytes).unwrap(), pair);
    }

    #[test]
    fn it_rejects_extra_fields() {
        // ["dog", [], 1]
        let bytes = hex::decode("c683646f67c001").unwrap();
        assert_eq!(decode::<Pair>(&bytes), Err(Error::TrailingItems));
    }

    #[test]
    fn it_encodes_lists_of_values() {
        let bytes = encode_list(&[1u64, 2, 3]);
        assert_eq!(bytes, vec![0xc3, 0x01, 0x02, 0x03]);
        assert_eq!(decode_list::<u64>(&bytes).unwrap(), vec![1, 2, 3]);
    }
}
