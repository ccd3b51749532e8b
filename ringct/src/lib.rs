//! # Ring Confidential Transactions (RingCT)
//!
//! Pedersen commitments hide output amounts, bulletproofs show they are in
//! range and MLSAG (or, for single member rings, a linkable Schnorr proof)
//! ties every spent input to its key image without revealing which ring
//! member is real.

#[macro_use]
extern crate lazy_static;

use std::ops::{Index, IndexMut};

pub mod bulletproof;
pub mod mlsag;
pub mod ring_signature;
pub mod ringct;

pub use crate::ringct::{
    commit, commit_to_amount, ecdh_decode, ecdh_encode, gen_rct_simple, get_pre_mlsag_hash,
    ver_rct_non_semantics_simple, ver_rct_semantics_simple, CtKey, Destination, EcdhTuple,
    InputSecret, MgSig, RctSig, RctSigBase, RctSigPrunable, RctType,
};

/// Maximum number of outputs covered by one aggregate range proof
pub const BULLETPROOF_MAX_OUTPUTS: usize = 16;

/// Type alias for RingCT operations that may fail
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for RingCT operations
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// Returned when the signing parameters are inconsistent
    #[error("Input parameters are inconsistent")]
    InconsistentParameters,

    /// Returned when a signature does not have the shape of its ring
    #[error("Signature is inconsistent")]
    InconsistentSignature,

    /// Returned when a ring signature fails to verify
    #[error("Signature is invalid")]
    InvalidSignature,

    /// Returned when a range proof fails to verify
    #[error("Range proof is invalid: {0}")]
    InvalidRangeProof(&'static str),

    /// Returned when more outputs are proven than an aggregate proof allows
    #[error("Too many outputs for one range proof")]
    TooManyOutputs,

    /// Returned when a decoded amount does not fit in 64 bits
    #[error("Decoded amount is out of range")]
    InvalidAmount,

    /// Returned when the commitments of a transaction do not balance
    #[error("Commitments do not balance")]
    UnbalancedCommitments,

    /// Returned for signature types this chain does not accept
    #[error("Unsupported RingCT type")]
    UnsupportedType,

    /// Returned when a key does not decode to a point or scalar
    #[error(transparent)]
    Crypto(#[from] crypto::Error),
}

/// A dense row-major matrix
///
/// Rings are matrices whose rows are ring members and whose columns are the
/// keys of one member.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T> Matrix<T> {
    /// Builds a matrix from a closure over `(row, col)`
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                data.push(f(row, col));
            }
        }
        Matrix { rows, cols, data }
    }

    /// Builds a matrix from its rows, which must all have the same length
    pub fn from_rows(rows: Vec<Vec<T>>) -> Option<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != cols) {
            return None;
        }
        let n = rows.len();
        Some(Matrix {
            rows: n,
            cols,
            data: rows.into_iter().flatten().collect(),
        })
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// A single row
    pub fn row(&self, row: usize) -> &[T] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Iterates over the rows
    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> {
        (0..self.rows).map(move |row| self.row(row))
    }
}

impl<T> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    fn index(&self, (row, col): (usize, usize)) -> &T {
        assert!(col < self.cols);
        &self.data[row * self.cols + col]
    }
}

impl<T> IndexMut<(usize, usize)> for Matrix<T> {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        assert!(col < self.cols);
        &mut self.data[row * self.cols + col]
    }
}

impl<T: codec::Encodable> codec::Encodable for Matrix<T> {
    fn encode(&self, s: &mut codec::Encoder) {
        s.begin_list();
        for row in self.iter_rows() {
            s.append_list(row);
        }
        s.end_list();
    }
}

impl<T: codec::Decodable> codec::Decodable for Matrix<T> {
    fn decode(rlp: &codec::Rlp) -> codec::Result<Self> {
        let rows = rlp
            .iter()?
            .map(|row| row?.as_list())
            .collect::<codec::Result<Vec<Vec<T>>>>()?;
        Matrix::from_rows(rows).ok_or(codec::Error::InvalidValue("ragged matrix"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_stores_matrices_row_major() {
        let m = Matrix::from_fn(3, 2, |row, col| row * 10 + col);
        assert_eq!(m.rows(), 3);
        assert_eq!(m.cols(), 2);
        assert_eq!(m[(2, 1)], 21);
        assert_eq!(m.row(1), &[10, 11]);
        assert_eq!(Matrix::from_rows(vec![vec![0, 1], vec![10, 11], vec![20, 21]]), Some(m));
        assert_eq!(Matrix::from_rows(vec![vec![1], vec![1, 2]]), None);
    }

    #[test]
    fn it_encodes_matrices_as_nested_lists() {
        let m = Matrix::from_fn(2, 2, |row, col| (row * 2 + col) as u64);
        let bytes = codec::encode(&m);
        assert_eq!(bytes, vec![0xc6, 0xc2, 0x80, 0x01, 0xc2, 0x02, 0x03]);
        assert_eq!(codec::decode::<Matrix<u64>>(&bytes).unwrap(), m);
        // [[1], [2, 3]]
        assert!(codec::decode::<Matrix<u64>>(&[0xc5, 0xc1, 0x01, 0xc2, 0x02, 0x03]).is_err());
    }
}
