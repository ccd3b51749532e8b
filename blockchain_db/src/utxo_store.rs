use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::debug;

use crypto::{Address, Key};
use ringct::CtKey;
use types::censor::UtxoStore;
use types::tx::utxo::Output;
use types::tx::UtxoTx;

use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct Outputs {
    by_token: HashMap<Address, Vec<CtKey>>,
    key_images: HashSet<Key>,
}

/// The confidential output log and the spent key images
#[derive(Debug, Default)]
pub struct MemUtxoStore(RwLock<Outputs>);

impl MemUtxoStore {
    /// Creates an empty store
    pub fn new() -> Self {
        MemUtxoStore::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Outputs> {
        self.0.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Outputs> {
        self.0.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Appends outputs to the log of `token`
    ///
    /// # Returns
    /// The global index of the first appended output
    pub fn add_outputs(&self, token: &Address, outputs: &[CtKey]) -> u64 {
        let mut inner = self.write();
        let log = inner.by_token.entry(*token).or_default();
        let first = log.len() as u64;
        log.extend_from_slice(outputs);
        first
    }

    /// Marks key images as spent
    ///
    /// # Errors
    /// If any of them is spent already, in which case none is added
    pub fn add_key_images(&self, key_images: &[Key]) -> Result<()> {
        let mut inner = self.write();
        let unique: HashSet<&Key> = key_images.iter().collect();
        if unique.len() != key_images.len()
            || key_images.iter().any(|image| inner.key_images.contains(image))
        {
            return Err(Error::Exists);
        }
        inner.key_images.extend(key_images.iter().copied());
        Ok(())
    }

    /// Records a confirmed transaction: spends its key images and logs its outputs
    ///
    /// # Returns
    /// The global index of the transaction's first output
    pub fn apply_tx(&self, tx: &UtxoTx) -> Result<u64> {
        self.add_key_images(&tx.key_images())?;
        let ot_addrs = tx.outputs().iter().filter_map(|output| match output {
            Output::Utxo(output) => Some(output.ot_addr),
            Output::Account(_) => None,
        });
        let outputs: Vec<CtKey> = ot_addrs
            .zip(&tx.rct().base.out_pk)
            .map(|(dest, out_pk)| CtKey {
                dest,
                mask: out_pk.mask,
            })
            .collect();
        let first = self.add_outputs(&tx.token_id(), &outputs);
        debug!(
            "Logged {} outputs of {} from index {}",
            outputs.len(),
            tx.hash(),
            first
        );
        Ok(first)
    }

    /// Number of outputs logged for `token`
    pub fn output_count(&self, token: &Address) -> u64 {
        self.read().by_token.get(token).map_or(0, |log| log.len() as u64)
    }
}

impl UtxoStore for MemUtxoStore {
    fn get_utxo_outputs(&self, indices: &[u64], token: &Address) -> Option<Vec<CtKey>> {
        let inner = self.read();
        let log = inner.by_token.get(token)?;
        indices
            .iter()
            .map(|index| log.get(*index as usize).copied())
            .collect()
    }

    fn has_key_image(&self, key_image: &Key) -> bool {
        self.read().key_images.contains(key_image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto::KeyPair;

    fn ct_key() -> CtKey {
        CtKey {
            dest: Key::from(KeyPair::generate().public_key),
            mask: Key::from(KeyPair::generate().public_key),
        }
    }

    #[test]
    fn it_indexes_outputs_per_token() {
        let store = MemUtxoStore::new();
        let native = Address::default();
        let keys = vec![ct_key(), ct_key(), ct_key()];

        assert_eq!(store.add_outputs(&native, &keys[..2]), 0);
        assert_eq!(store.add_outputs(&native, &keys[2..]), 2);
        assert_eq!(store.output_count(&native), 3);

        assert_eq!(
            store.get_utxo_outputs(&[0, 2], &native),
            Some(vec![keys[0], keys[2]])
        );
        assert_eq!(store.get_utxo_outputs(&[3], &native), None);
        assert_eq!(store.get_utxo_outputs(&[0], &Address::from_name(b"t")), None);
    }

    #[test]
    fn it_spends_key_images_once() {
        let store = MemUtxoStore::new();
        let (a, b) = (ct_key().dest, ct_key().dest);

        store.add_key_images(&[a]).unwrap();
        assert!(store.has_key_image(&a));
        assert_eq!(store.add_key_images(&[b, a]), Err(Error::Exists));
        assert!(!store.has_key_image(&b));
        assert_eq!(store.add_key_images(&[b, b]), Err(Error::Exists));
    }
}
