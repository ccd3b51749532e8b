use ensure_macro::ensure;

use crate::{Decodable, Error, Result};

/// Header and payload lengths of the item at the start of `bytes`
///
/// The header is parsed by `rlp`, which already refuses long forms for short
/// payloads and lengths with leading zeros. A single low byte wrapped in a
/// string header is refused here.
fn payload_info(bytes: &[u8]) -> Result<(usize, usize)> {
    let info = rlp::Rlp::new(bytes).payload_info()?;
    if bytes[0] == 0x81 {
        ensure!(bytes[1] >= 0x80, Error::NonCanonicalSingleByte);
    }
    Ok((info.header_len, info.value_len))
}

/// A view over exactly one canonically encoded item
#[derive(Clone, Debug)]
pub struct Rlp<'a> {
    inner: rlp::Rlp<'a>,
    header_len: usize,
}

impl<'a> Rlp<'a> {
    /// Wraps `bytes`, which must hold exactly one item
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        let (header_len, value_len) = payload_info(bytes)?;
        ensure!(header_len + value_len == bytes.len(), Error::TrailingBytes);
        Ok(Rlp {
            inner: rlp::Rlp::new(bytes),
            header_len,
        })
    }

    /// Splits the first item off `bytes`
    fn split(bytes: &'a [u8]) -> Result<(Self, &'a [u8])> {
        let (header_len, value_len) = payload_info(bytes)?;
        let (item, rest) = bytes.split_at(header_len + value_len);
        let item = Rlp {
            inner: rlp::Rlp::new(item),
            header_len,
        };
        Ok((item, rest))
    }

    /// The full encoding of this item, header included
    pub fn as_raw(&self) -> &'a [u8] {
        self.inner.as_raw()
    }

    /// Whether this item is a list
    pub fn is_list(&self) -> bool {
        self.inner.is_list()
    }

    /// Whether this item is a byte string
    pub fn is_data(&self) -> bool {
        self.inner.is_data()
    }

    /// Whether this item is the empty string or the empty list
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// The payload of a byte string
    pub fn data(&self) -> Result<&'a [u8]> {
        ensure!(self.is_data(), Error::ExpectedData);
        Ok(self.payload())
    }

    /// The payload bytes without the header
    pub fn payload(&self) -> &'a [u8] {
        &self.as_raw()[self.header_len..]
    }

    /// Iterates over the items of a list
    pub fn iter(&self) -> Result<RlpIter<'a>> {
        ensure!(self.is_list(), Error::ExpectedList);
        Ok(RlpIter {
            rest: self.payload(),
        })
    }

    /// Number of items in a list
    pub fn item_count(&self) -> Result<usize> {
        self.iter()?.try_fold(0, |n, item| item.map(|_| n + 1))
    }

    /// The item at `index` of a list
    pub fn at(&self, index: usize) -> Result<Rlp<'a>> {
        self.iter()?.nth(index).unwrap_or(Err(Error::MissingItem))
    }

    /// Decodes this item as `T`
    pub fn as_val<T: Decodable>(&self) -> Result<T> {
        T::decode(self)
    }

    /// Decodes every item of this list as `T`
    pub fn as_list<T: Decodable>(&self) -> Result<Vec<T>> {
        self.iter()?.map(|item| T::decode(&item?)).collect()
    }

    /// Decodes the item at `index` of this list
    pub fn val_at<T: Decodable>(&self, index: usize) -> Result<T> {
        T::decode(&self.at(index)?)
    }
}

/// Iterator over the items of a list
///
/// Besides plain iteration it offers `next_val`/`next_list`/`finish` for
/// decoding structs field by field.
#[derive(Clone, Debug)]
pub struct RlpIter<'a> {
    rest: &'a [u8],
}

impl<'a> RlpIter<'a> {
    /// Decodes the next item as `T`
    pub fn next_val<T: Decodable>(&mut self) -> Result<T> {
        let item = self.next().ok_or(Error::MissingItem)??;
        T::decode(&item)
    }

    /// Decodes the next item as a list of `T`
    pub fn next_list<T: Decodable>(&mut self) -> Result<Vec<T>> {
        let item = self.next().ok_or(Error::MissingItem)??;
        item.as_list()
    }

    /// Returns the next raw item
    pub fn next_item(&mut self) -> Result<Rlp<'a>> {
        self.next().ok_or(Error::MissingItem)?
    }

    /// Ensures every item was consumed
    pub fn finish(self) -> Result<()> {
        ensure!(self.rest.is_empty(), Error::TrailingItems);
        Ok(())
    }
}

impl<'a> Iterator for RlpIter<'a> {
    type Item = Result<Rlp<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        match Rlp::split(self.rest) {
            Ok((item, rest)) => {
                self.rest = rest;
                Some(Ok(item))
            }
            Err(err) => {
                self.rest = &[];
                Some(Err(err))
            }
        }
    }
}
