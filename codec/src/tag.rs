use std::fmt;

use ensure_macro::ensure;

use crate::{Encodable, Encoder, Error, Result};

/// Width of a concrete-type tag on the wire
pub const TAG_LEN: usize = 4;

/// Identifies the concrete type stored in an interface slot
///
/// Tags are short ASCII names zero padded to four bytes.
#[derive(Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct TypeTag([u8; TAG_LEN]);

impl TypeTag {
    /// Builds a tag from a name of at most four bytes
    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut tag = [0u8; TAG_LEN];
        let mut i = 0;
        while i < bytes.len() && i < TAG_LEN {
            tag[i] = bytes[i];
            i += 1;
        }
        TypeTag(tag)
    }

    /// The padded wire bytes
    pub fn as_bytes(&self) -> &[u8; TAG_LEN] {
        &self.0
    }

    /// The name without padding
    pub fn name(&self) -> String {
        let end = self.0.iter().position(|b| *b == 0).unwrap_or(TAG_LEN);
        String::from_utf8_lossy(&self.0[..end]).into_owned()
    }

    /// Splits a tagged encoding into its tag and body
    pub fn split(bytes: &[u8]) -> Result<(TypeTag, &[u8])> {
        ensure!(bytes.len() >= TAG_LEN, Error::UnexpectedEnd);
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&bytes[..TAG_LEN]);
        Ok((TypeTag(tag), &bytes[TAG_LEN..]))
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "TypeTag({:?})", self.name())
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Encodes `value` behind `tag`
pub fn encode_tagged<E: Encodable + ?Sized>(tag: TypeTag, value: &E) -> Vec<u8> {
    let mut s = Encoder::new();
    s.append_raw(tag.as_bytes());
    s.append(value);
    s.out()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_pads_names() {
        const TX: TypeTag = TypeTag::from_name("tx");
        assert_eq!(TX.as_bytes(), b"tx\0\0");
        assert_eq!(TX.name(), "tx");
        assert_eq!(TypeTag::from_name("utx").to_string(), "utx");
    }

    #[test]
    fn it_splits_tagged_bytes() {
        let bytes = encode_tagged(TypeTag::from_name("txt"), &5u64);
        assert_eq!(bytes, b"txt\0\x05".to_vec());

        let (tag, body) = TypeTag::split(&bytes).unwrap();
        assert_eq!(tag, TypeTag::from_name("txt"));
        assert_eq!(body, &[0x05]);

        assert_eq!(TypeTag::split(b"tx").unwrap_err(), Error::UnexpectedEnd);
    }
}
