use std::fmt;

/// A fixed length set of flags
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BitArray {
    bits: usize,
    elems: Vec<u64>,
}

impl BitArray {
    pub fn new(bits: usize) -> Self {
        BitArray {
            bits,
            elems: vec![0; (bits + 63) / 64],
        }
    }

    pub fn size(&self) -> usize {
        self.bits
    }

    /// Out of range indices read as unset
    pub fn get_index(&self, i: usize) -> bool {
        i < self.bits && self.elems[i / 64] & (1 << (i % 64)) != 0
    }

    /// Returns false when `i` is out of range
    pub fn set_index(&mut self, i: usize, value: bool) -> bool {
        if i >= self.bits {
            return false;
        }
        if value {
            self.elems[i / 64] |= 1 << (i % 64);
        } else {
            self.elems[i / 64] &= !(1 << (i % 64));
        }
        true
    }

    pub fn count_ones(&self) -> usize {
        self.elems.iter().map(|e| e.count_ones() as usize).sum()
    }
}

impl fmt::Display for BitArray {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for i in 0..self.bits {
            f.write_str(if self.get_index(i) { "x" } else { "_" })?;
        }
        Ok(())
    }
}
