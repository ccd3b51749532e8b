use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::debug;

use crypto::{Hash, Key};
use types::censor::Mempool;
use types::{Error, Result, Tx};

#[derive(Debug, Default)]
struct Pending {
    txs: HashMap<Hash, Arc<Tx>>,
    /// Hashes in arrival order
    order: Vec<Hash>,
    /// Slots held by transactions still under admission
    reserved: HashSet<Hash>,
}

impl Pending {
    fn occupied(&self) -> usize {
        self.txs.len() + self.reserved.len()
    }
}

/// Admitted transactions waiting for a block
///
/// Key images are reserved by admission through [`Mempool::key_image_push`]
/// and released when their transaction is taken.
#[derive(Debug)]
pub struct TxPool {
    pending: RwLock<Pending>,
    key_images: RwLock<HashSet<Key>>,
    max_size: usize,
}

impl TxPool {
    pub fn new(max_size: usize) -> Self {
        TxPool {
            pending: RwLock::new(Pending::default()),
            key_images: RwLock::new(HashSet::new()),
            max_size,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Pending> {
        self.pending.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Pending> {
        self.pending.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn images(&self) -> RwLockWriteGuard<'_, HashSet<Key>> {
        self.key_images.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.read().txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// No slot is left, counting those held by admissions in progress
    pub fn is_full(&self) -> bool {
        self.read().occupied() >= self.max_size
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.read().txs.contains_key(hash)
    }

    pub fn get(&self, hash: &Hash) -> Option<Arc<Tx>> {
        self.read().txs.get(hash).cloned()
    }

    /// Holds a slot for `hash` while its admission runs
    ///
    /// # Errors
    /// If it is already pending or under admission, or no slot is left
    pub(crate) fn reserve(&self, hash: Hash) -> Result<()> {
        let mut pending = self.write();
        if pending.txs.contains_key(&hash) || pending.reserved.contains(&hash) {
            return Err(Error::TxDuplicate);
        }
        if pending.occupied() >= self.max_size {
            return Err(Error::MempoolIsFull);
        }
        pending.reserved.insert(hash);
        Ok(())
    }

    /// Gives up a slot whose admission failed
    pub(crate) fn release(&self, hash: &Hash) {
        self.write().reserved.remove(hash);
    }

    /// Stores an admitted transaction in the slot reserved for it
    pub(crate) fn fill(&self, tx: Tx) -> Hash {
        let hash = tx.hash();
        let mut pending = self.write();
        pending.reserved.remove(&hash);
        if pending.txs.insert(hash, Arc::new(tx)).is_none() {
            pending.order.push(hash);
        }
        hash
    }

    /// Removes a transaction and releases its key images
    pub fn take_tx(&self, hash: &Hash) -> Option<Arc<Tx>> {
        let tx = {
            let mut pending = self.write();
            let tx = pending.txs.remove(hash)?;
            pending.order.retain(|pending_hash| pending_hash != hash);
            tx
        };
        self.key_image_remove(&tx.key_images());
        debug!("Took {} from the pool", hash);
        Some(tx)
    }

    /// Up to `max` pending transactions, oldest first
    pub fn pending(&self, max: usize) -> Vec<Arc<Tx>> {
        let pending = self.read();
        pending
            .order
            .iter()
            .take(max)
            .filter_map(|hash| pending.txs.get(hash).cloned())
            .collect()
    }
}

impl Mempool for TxPool {
    fn key_image_exists(&self, key_image: &Key) -> bool {
        self.key_images
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(key_image)
    }

    fn key_image_push(&self, key_images: &[Key]) {
        self.images().extend(key_images.iter().copied());
    }

    fn key_image_remove(&self, key_images: &[Key]) {
        let mut images = self.images();
        key_images.iter().for_each(|image| {
            images.remove(image);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use primitive_types::U256;
    use types::tx::Transfer;

    fn transfer(nonce: u64) -> Tx {
        Tx::Transfer(Transfer::new(
            nonce,
            None,
            U256::zero(),
            0,
            U256::zero(),
            Vec::new(),
        ))
    }

    fn admit(pool: &TxPool, tx: Tx) -> Result<Hash> {
        pool.reserve(tx.hash())?;
        Ok(pool.fill(tx))
    }

    #[test]
    fn it_keeps_arrival_order() {
        let pool = TxPool::new(2);
        let first = admit(&pool, transfer(0)).unwrap();
        let second = admit(&pool, transfer(1)).unwrap();

        assert_eq!(admit(&pool, transfer(0)), Err(Error::TxDuplicate));
        assert_eq!(admit(&pool, transfer(2)), Err(Error::MempoolIsFull));
        assert!(pool.is_full());

        let hashes: Vec<Hash> = pool.pending(5).iter().map(|tx| tx.hash()).collect();
        assert_eq!(hashes, vec![first, second]);

        assert!(pool.take_tx(&first).is_some());
        assert!(pool.take_tx(&first).is_none());
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.pending(5)[0].hash(), second);
    }

    #[test]
    fn it_counts_reserved_slots() {
        let pool = TxPool::new(1);
        let held = transfer(0).hash();

        pool.reserve(held).unwrap();
        assert!(pool.is_full());
        assert!(pool.is_empty());
        assert_eq!(pool.reserve(held), Err(Error::TxDuplicate));
        assert_eq!(admit(&pool, transfer(1)), Err(Error::MempoolIsFull));

        pool.release(&held);
        assert!(!pool.is_full());
        admit(&pool, transfer(1)).unwrap();
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn it_tracks_key_images() {
        let pool = TxPool::new(1);
        let image = Key::from([1u8; 32]);
        assert!(!pool.key_image_exists(&image));
        pool.key_image_push(&[image]);
        assert!(pool.key_image_exists(&image));
        pool.key_image_remove(&[image]);
        assert!(pool.is_empty());
        assert!(!pool.key_image_exists(&image));
    }
}
