//! Simple binary Merkle tree
//!
//! Leaves are split left-biased: the left subtree takes `(n + 1) / 2` items.
//! Inner nodes hash the concatenation of their children.

use std::collections::BTreeMap;

use crate::hash::{keccak, keccak_concat, Hash};

/// Hash of an inner node
pub fn hash_from_two(left: &Hash, right: &Hash) -> Hash {
    keccak_concat(&[&left.0, &right.0])
}

/// Root over already hashed leaves
///
/// An empty tree hashes to zero and a single leaf is its own root.
pub fn hash_from_hashes(hashes: &[Hash]) -> Hash {
    match hashes.len() {
        0 => Hash::zero(),
        1 => hashes[0],
        n => {
            let (left, right) = hashes.split_at((n + 1) / 2);
            hash_from_two(&hash_from_hashes(left), &hash_from_hashes(right))
        }
    }
}

/// Root over raw byte strings, each leaf being the Keccak of the item
pub fn hash_from_byte_slices<T: AsRef<[u8]>>(items: &[T]) -> Hash {
    let leaves: Vec<Hash> = items.iter().map(keccak).collect();
    hash_from_hashes(&leaves)
}

/// Root over named field hashes
///
/// Entries are visited in key order; each leaf is the Keccak of the encoded
/// pair `[name, hash]`.
pub fn hash_from_map(map: &BTreeMap<&str, Hash>) -> Hash {
    let leaves: Vec<Hash> = map
        .iter()
        .map(|(name, hash)| {
            let mut s = codec::Encoder::new();
            s.begin_list();
            s.append_bytes(name.as_bytes());
            s.append(hash);
            s.end_list();
            keccak(s.out())
        })
        .collect();
    hash_from_hashes(&leaves)
}
