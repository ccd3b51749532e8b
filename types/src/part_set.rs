//! Blocks split into parts for gossip
//!
//! Parts are committed to with the simple Merkle tree; every part carries
//! the inner hashes needed to check it against the root alone.

use ensure_macro::ensure;
use serde::{Deserialize, Serialize};

use codec::{Decodable, Encodable, Encoder, Rlp};
use crypto::{keccak, merkle, Hash};

use crate::{Error, Result};

/// Number of parts and their Merkle root
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct PartSetHeader {
    pub total: u32,
    pub hash: Hash,
}

impl PartSetHeader {
    pub fn is_zero(&self) -> bool {
        self.total == 0 && self.hash.is_zero()
    }
}

impl Encodable for PartSetHeader {
    fn encode(&self, s: &mut Encoder) {
        s.begin_list().append(&self.total).append(&self.hash).end_list();
    }
}

impl Decodable for PartSetHeader {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let header = PartSetHeader {
            total: fields.next_val()?,
            hash: fields.next_val()?,
        };
        fields.finish()?;
        Ok(header)
    }
}

/// Path from a leaf to the root
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SimpleProof {
    pub total: u32,
    pub index: u32,
    pub leaf_hash: Hash,
    /// Sibling hashes, innermost first
    pub aunts: Vec<Hash>,
}

impl SimpleProof {
    /// Root implied by the proof
    pub fn compute_root(&self) -> Option<Hash> {
        root_from_aunts(
            self.index as usize,
            self.total as usize,
            &self.leaf_hash,
            &self.aunts,
        )
    }

    pub fn verify(&self, root: &Hash, leaf: &[u8]) -> bool {
        self.leaf_hash == keccak(leaf) && self.compute_root().as_ref() == Some(root)
    }
}

fn root_from_aunts(index: usize, total: usize, leaf: &Hash, aunts: &[Hash]) -> Option<Hash> {
    if index >= total {
        return None;
    }
    match total {
        0 => None,
        1 if aunts.is_empty() => Some(*leaf),
        1 => None,
        _ => {
            let (last, inner) = aunts.split_last()?;
            let left = (total + 1) / 2;
            if index < left {
                let left_hash = root_from_aunts(index, left, leaf, inner)?;
                Some(merkle::hash_from_two(&left_hash, last))
            } else {
                let right_hash = root_from_aunts(index - left, total - left, leaf, inner)?;
                Some(merkle::hash_from_two(last, &right_hash))
            }
        }
    }
}

fn aunts_from_leaves(leaves: &[Hash]) -> (Hash, Vec<Vec<Hash>>) {
    match leaves.len() {
        0 => (Hash::zero(), Vec::new()),
        1 => (leaves[0], vec![Vec::new()]),
        n => {
            let (left, right) = leaves.split_at((n + 1) / 2);
            let (left_root, mut left_trails) = aunts_from_leaves(left);
            let (right_root, mut right_trails) = aunts_from_leaves(right);
            left_trails.iter_mut().for_each(|trail| trail.push(right_root));
            right_trails.iter_mut().for_each(|trail| trail.push(left_root));
            left_trails.append(&mut right_trails);
            (merkle::hash_from_two(&left_root, &right_root), left_trails)
        }
    }
}

/// One chunk of an encoded block
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Part {
    pub index: u32,
    pub bytes: Vec<u8>,
    pub proof: SimpleProof,
}

/// A block's parts, possibly still being collected
#[derive(Clone, Debug)]
pub struct PartSet {
    header: PartSetHeader,
    parts: Vec<Option<Part>>,
    count: u32,
}

impl PartSet {
    /// Splits `data` into parts of `part_size` bytes
    pub fn from_data(data: &[u8], part_size: usize) -> Self {
        let chunks: Vec<&[u8]> = if data.is_empty() {
            vec![data]
        } else {
            data.chunks(part_size.max(1)).collect()
        };
        let leaves: Vec<Hash> = chunks.iter().map(keccak).collect();
        let (root, trails) = aunts_from_leaves(&leaves);
        let total = chunks.len() as u32;

        let parts = chunks
            .into_iter()
            .zip(trails)
            .enumerate()
            .map(|(index, (chunk, aunts))| {
                Some(Part {
                    index: index as u32,
                    bytes: chunk.to_vec(),
                    proof: SimpleProof {
                        total,
                        index: index as u32,
                        leaf_hash: leaves[index],
                        aunts,
                    },
                })
            })
            .collect();

        PartSet {
            header: PartSetHeader { total, hash: root },
            parts,
            count: total,
        }
    }

    /// An empty set awaiting the parts of `header`
    pub fn from_header(header: PartSetHeader) -> Self {
        PartSet {
            parts: vec![None; header.total as usize],
            header,
            count: 0,
        }
    }

    pub fn header(&self) -> &PartSetHeader {
        &self.header
    }

    pub fn has_header(&self, header: &PartSetHeader) -> bool {
        self.header == *header
    }

    pub fn total(&self) -> u32 {
        self.header.total
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn is_complete(&self) -> bool {
        self.count == self.header.total
    }

    pub fn get_part(&self, index: usize) -> Option<&Part> {
        self.parts.get(index).and_then(Option::as_ref)
    }

    /// Adds a gossiped part after checking its proof
    ///
    /// Returns false if the part was already present.
    pub fn add_part(&mut self, part: Part) -> Result<bool> {
        let index = part.index as usize;
        ensure!(
            index < self.parts.len(),
            Error::InvalidBlock(format!("part index {} out of range", index))
        );
        if self.parts[index].is_some() {
            return Ok(false);
        }
        ensure!(
            part.proof.index == part.index
                && part.proof.total == self.header.total
                && part.proof.verify(&self.header.hash, &part.bytes),
            Error::InvalidBlock(format!("invalid proof for part {}", index))
        );
        self.parts[index] = Some(part);
        self.count += 1;
        Ok(true)
    }

    /// Concatenated bytes of a complete set
    pub fn assemble(&self) -> Option<Vec<u8>> {
        if !self.is_complete() {
            return None;
        }
        let mut out = Vec::new();
        for part in self.parts.iter().flatten() {
            out.extend_from_slice(&part.bytes);
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_splits_and_reassembles() {
        let data: Vec<u8> = (0..1000u32).map(|i| i as u8).collect();
        let full = PartSet::from_data(&data, 64);
        assert_eq!(full.total(), 16);
        assert!(full.is_complete());
        assert_eq!(
            full.header().hash,
            merkle::hash_from_byte_slices(&data.chunks(64).collect::<Vec<_>>())
        );

        let mut partial = PartSet::from_header(full.header().clone());
        for i in (0..16).rev() {
            assert!(partial.add_part(full.get_part(i).unwrap().clone()).unwrap());
        }
        assert!(!partial.add_part(full.get_part(3).unwrap().clone()).unwrap());
        assert_eq!(partial.assemble().unwrap(), data);
    }

    #[test]
    fn it_rejects_forged_parts() {
        let full = PartSet::from_data(&[7u8; 300], 100);
        let mut partial = PartSet::from_header(full.header().clone());

        let mut forged = full.get_part(1).unwrap().clone();
        forged.bytes[0] ^= 1;
        assert!(partial.add_part(forged).is_err());

        let mut moved = full.get_part(1).unwrap().clone();
        moved.index = 2;
        assert!(partial.add_part(moved).is_err());
        assert!(partial.assemble().is_none());
    }

    #[test]
    fn it_proves_every_leaf() {
        for n in 1..9 {
            let leaves: Vec<Hash> = (0..n).map(|i| keccak([i as u8])).collect();
            let (root, trails) = aunts_from_leaves(&leaves);
            assert_eq!(root, merkle::hash_from_hashes(&leaves));
            for (i, aunts) in trails.iter().enumerate() {
                assert_eq!(root_from_aunts(i, n, &leaves[i], aunts), Some(root));
            }
        }
    }
}
