use byteorder::{BigEndian, ByteOrder};
use ensure_macro::ensure;
use primitive_types::U256;

use crate::{Decodable, Encodable, Encoder, Error, Result, Rlp};

/// Reads a minimal big-endian integer of at most `width` bytes
fn uint_bytes<'a>(rlp: &Rlp<'a>, width: usize) -> Result<&'a [u8]> {
    let data = rlp.data()?;
    ensure!(data.first() != Some(&0), Error::LeadingZero);
    ensure!(data.len() <= width, Error::IntegerOverflow(width));
    Ok(data)
}

macro_rules! impl_uint {
    ($($ty:ty),*) => {$(
        impl Encodable for $ty {
            fn encode(&self, s: &mut Encoder) {
                let mut buf = [0u8; 8];
                BigEndian::write_u64(&mut buf, *self as u64);
                s.append_uint(&buf);
            }
        }

        impl Decodable for $ty {
            fn decode(rlp: &Rlp) -> Result<Self> {
                let data = uint_bytes(rlp, std::mem::size_of::<$ty>())?;
                Ok(data.iter().fold(0, |acc, b| (acc << 8) | <$ty>::from(*b)))
            }
        }
    )*};
}

impl_uint!(u16, u32, u64);

impl Encodable for u8 {
    fn encode(&self, s: &mut Encoder) {
        s.append_uint(&[*self]);
    }
}

impl Decodable for u8 {
    fn decode(rlp: &Rlp) -> Result<Self> {
        Ok(uint_bytes(rlp, 1)?.first().copied().unwrap_or(0))
    }
}

impl Encodable for usize {
    fn encode(&self, s: &mut Encoder) {
        (*self as u64).encode(s);
    }
}

impl Decodable for usize {
    fn decode(rlp: &Rlp) -> Result<Self> {
        let n = u64::decode(rlp)?;
        ensure!(n <= usize::max_value() as u64, Error::IntegerOverflow(8));
        Ok(n as usize)
    }
}

impl Encodable for bool {
    fn encode(&self, s: &mut Encoder) {
        (*self as u8).encode(s);
    }
}

impl Decodable for bool {
    fn decode(rlp: &Rlp) -> Result<Self> {
        match u8::decode(rlp)? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(Error::InvalidValue("bool")),
        }
    }
}

impl Encodable for U256 {
    fn encode(&self, s: &mut Encoder) {
        let mut buf = [0u8; 32];
        self.to_big_endian(&mut buf);
        s.append_uint(&buf);
    }
}

impl Decodable for U256 {
    fn decode(rlp: &Rlp) -> Result<Self> {
        Ok(U256::from_big_endian(uint_bytes(rlp, 32)?))
    }
}

impl Encodable for [u8] {
    fn encode(&self, s: &mut Encoder) {
        s.append_bytes(self);
    }
}

impl Encodable for Vec<u8> {
    fn encode(&self, s: &mut Encoder) {
        s.append_bytes(self);
    }
}

impl Decodable for Vec<u8> {
    fn decode(rlp: &Rlp) -> Result<Self> {
        Ok(rlp.data()?.to_vec())
    }
}

impl Encodable for str {
    fn encode(&self, s: &mut Encoder) {
        s.append_bytes(self.as_bytes());
    }
}

impl Encodable for String {
    fn encode(&self, s: &mut Encoder) {
        s.append_bytes(self.as_bytes());
    }
}

impl Decodable for String {
    fn decode(rlp: &Rlp) -> Result<Self> {
        String::from_utf8(rlp.data()?.to_vec()).map_err(|_| Error::InvalidValue("utf-8 string"))
    }
}

macro_rules! impl_byte_array {
    ($($len:expr),*) => {$(
        impl Encodable for [u8; $len] {
            fn encode(&self, s: &mut Encoder) {
                s.append_bytes(self);
            }
        }

        impl Decodable for [u8; $len] {
            fn decode(rlp: &Rlp) -> Result<Self> {
                let data = rlp.data()?;
                ensure!(
                    data.len() == $len,
                    Error::InvalidLength {
                        expected: $len,
                        got: data.len()
                    }
                );
                let mut out = [0u8; $len];
                out.copy_from_slice(data);
                Ok(out)
            }
        }
    )*};
}

impl_byte_array!(4, 8, 20, 32, 64);

/// `None` is the empty byte string
///
/// Only sound for types whose own encoding is never the empty string, such
/// as fixed width byte arrays and lists.
impl<T: Encodable> Encodable for Option<T> {
    fn encode(&self, s: &mut Encoder) {
        match self {
            Some(value) => {
                value.encode(s);
            }
            None => {
                s.append_empty();
            }
        }
    }
}

impl<T: Decodable> Decodable for Option<T> {
    fn decode(rlp: &Rlp) -> Result<Self> {
        if rlp.is_data() && rlp.is_empty() {
            return Ok(None);
        }
        T::decode(rlp).map(Some)
    }
}

impl<T: Encodable + ?Sized> Encodable for &T {
    fn encode(&self, s: &mut Encoder) {
        (**self).encode(s);
    }
}

impl<T: Encodable + ?Sized> Encodable for Box<T> {
    fn encode(&self, s: &mut Encoder) {
        (**self).encode(s);
    }
}

impl<T: Decodable> Decodable for Box<T> {
    fn decode(rlp: &Rlp) -> Result<Self> {
        T::decode(rlp).map(Box::new)
    }
}

#[cfg(test)]
mod tests {
    use crate::{decode, encode};

    use super::*;

    #[test]
    fn it_encodes_integers_minimally() {
        assert_eq!(encode(&0u64), vec![0x80]);
        assert_eq!(encode(&15u64), vec![0x0f]);
        assert_eq!(encode(&1024u64), vec![0x82, 0x04, 0x00]);
        assert_eq!(encode(&U256::from(1024)), vec![0x82, 0x04, 0x00]);
        assert_eq!(encode(&true), vec![0x01]);
    }

    #[test]
    fn it_rejects_bad_integers() {
        assert_eq!(decode::<u64>(&[0x82, 0x00, 0x04]), Err(Error::LeadingZero));
        // A bare zero byte is not the canonical zero
        assert_eq!(decode::<u64>(&[0x00]), Err(Error::LeadingZero));
        assert_eq!(
            decode::<u16>(&[0x83, 0x01, 0x00, 0x00]),
            Err(Error::IntegerOverflow(2))
        );
        assert_eq!(decode::<bool>(&[0x02]), Err(Error::InvalidValue("bool")));
        assert_eq!(decode::<u64>(&[0xc0]), Err(Error::ExpectedData));
    }

    #[test]
    fn it_checks_fixed_widths() {
        let bytes = encode(&[7u8; 20]);
        assert_eq!(decode::<[u8; 20]>(&bytes).unwrap(), [7u8; 20]);
        assert_eq!(
            decode::<[u8; 32]>(&bytes),
            Err(Error::InvalidLength {
                expected: 32,
                got: 20
            })
        );
    }

    #[test]
    fn it_encodes_absent_values_as_empty() {
        let none: Option<[u8; 20]> = None;
        assert_eq!(encode(&none), vec![0x80]);
        assert_eq!(decode::<Option<[u8; 20]>>(&[0x80]).unwrap(), None);

        let some = Some([1u8; 20]);
        assert_eq!(decode::<Option<[u8; 20]>>(&encode(&some)).unwrap(), some);
    }

    #[test]
    fn it_decodes_large_values() {
        let value = U256::from_dec_str("1000000000000000000").unwrap();
        let bytes = encode(&value);
        assert_eq!(hex::encode(&bytes), "880de0b6b3a7640000");
        assert_eq!(decode::<U256>(&bytes).unwrap(), value);
    }
}
