use rlp::RlpStream;

use crate::Encodable;

/// Builds the canonical encoding of a value incrementally
///
/// Lists are opened with `begin_list` and closed with `end_list`. The list
/// header is written once the payload length is known.
pub struct Encoder {
    stream: RlpStream,
}

/// Strips the leading zero bytes of a big-endian integer
pub(crate) fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or_else(|| bytes.len());
    &bytes[first..]
}

impl Default for Encoder {
    fn default() -> Self {
        Encoder {
            stream: RlpStream::new(),
        }
    }
}

impl Encoder {
    /// Creates an empty encoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends any encodable value
    pub fn append<E: Encodable + ?Sized>(&mut self, value: &E) -> &mut Self {
        value.encode(self);
        self
    }

    /// Appends a byte string
    pub fn append_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.stream.append(&bytes);
        self
    }

    /// Appends the empty byte string (nil pointers, zero integers)
    pub fn append_empty(&mut self) -> &mut Self {
        self.stream.append_empty_data();
        self
    }

    /// Appends a big-endian unsigned integer in its minimal form
    pub fn append_uint(&mut self, be: &[u8]) -> &mut Self {
        self.append_bytes(trim_leading_zeros(be))
    }

    /// Appends bytes verbatim, counted as a single item
    pub fn append_raw(&mut self, raw: &[u8]) -> &mut Self {
        self.stream.append_raw(raw, 1);
        self
    }

    /// Appends every element of `items` as a list
    pub fn append_list<E: Encodable>(&mut self, items: &[E]) -> &mut Self {
        self.begin_list();
        for item in items {
            item.encode(self);
        }
        self.end_list()
    }

    /// Opens a list; every item appended until `end_list` becomes its payload
    pub fn begin_list(&mut self) -> &mut Self {
        self.stream.begin_unbounded_list();
        self
    }

    /// Closes the innermost open list
    ///
    /// # Panics
    /// If no list is open.
    pub fn end_list(&mut self) -> &mut Self {
        self.stream.finalize_unbounded_list();
        self
    }

    /// Encodes the list produced by `f`
    pub fn list<F: FnOnce(&mut Encoder)>(&mut self, f: F) -> &mut Self {
        self.begin_list();
        f(self);
        self.end_list()
    }

    /// Returns the encoded bytes
    ///
    /// # Panics
    /// If a list is still open.
    pub fn out(self) -> Vec<u8> {
        self.stream.out().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_encodes_short_and_long_strings() {
        let mut s = Encoder::new();
        s.append_bytes(b"dog");
        assert_eq!(s.out(), vec![0x83, b'd', b'o', b'g']);

        let long = vec![0xaa; 56];
        let mut s = Encoder::new();
        s.append_bytes(&long);
        let out = s.out();
        assert_eq!(&out[..2], &[0xb8, 56]);
        assert_eq!(out.len(), 58);
    }

    #[test]
    fn it_keeps_single_low_bytes_bare() {
        let mut s = Encoder::new();
        s.append_bytes(&[0x7f]).append_bytes(&[0x80]);
        assert_eq!(s.out(), vec![0x7f, 0x81, 0x80]);
    }

    #[test]
    fn it_nests_lists() {
        // [ [], [[]], [ [], [[]] ] ]
        let mut s = Encoder::new();
        s.list(|s| {
            s.list(|_| {});
            s.list(|s| {
                s.list(|_| {});
            });
            s.list(|s| {
                s.list(|_| {});
                s.list(|s| {
                    s.list(|_| {});
                });
            });
        });
        assert_eq!(
            s.out(),
            vec![0xc7, 0xc0, 0xc1, 0xc0, 0xc3, 0xc0, 0xc1, 0xc0]
        );
    }

    #[test]
    fn it_writes_long_list_headers() {
        let mut s = Encoder::new();
        s.list(|s| {
            for _ in 0..60 {
                s.append_bytes(&[0x01]);
            }
        });
        let out = s.out();
        assert_eq!(&out[..2], &[0xf8, 60]);
        assert_eq!(out.len(), 62);
    }

    #[test]
    fn it_strips_integer_zeros() {
        let mut s = Encoder::new();
        s.append_uint(&[0, 0, 4, 0]).append_uint(&[0, 0]);
        assert_eq!(s.out(), vec![0x82, 0x04, 0x00, 0x80]);
    }

    #[test]
    fn it_prefixes_raw_bytes() {
        let mut s = Encoder::new();
        s.append_raw(b"tx\0\0").append_bytes(b"dog");
        assert_eq!(s.out(), b"tx\0\0\x83dog".to_vec());
    }

    #[test]
    #[should_panic]
    fn it_refuses_unbalanced_lists() {
        let mut s = Encoder::new();
        s.begin_list();
        s.out();
    }
}
