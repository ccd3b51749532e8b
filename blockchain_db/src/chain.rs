use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::info;

use crypto::Hash;
use types::block::Block;
use types::censor::BlockChain;
use types::validator::ValidatorSet;

use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct Chain {
    blocks: Vec<Arc<Block>>,
    heights: HashMap<Hash, u64>,
    validators: ValidatorSet,
}

/// The main chain, the first block at height one
#[derive(Debug, Default)]
pub struct MemBlockChain(RwLock<Chain>);

impl MemBlockChain {
    /// Creates an empty chain governed by `validators`
    pub fn new(validators: ValidatorSet) -> Self {
        MemBlockChain(RwLock::new(Chain {
            validators,
            ..Chain::default()
        }))
    }

    fn read(&self) -> RwLockReadGuard<'_, Chain> {
        self.0.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Chain> {
        self.0.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds a new block to the main chain
    ///
    /// # Errors
    /// If the block is not at the next height, does not name the tail as its
    /// parent, or is already stored
    pub fn add_block(&self, block: Block) -> Result<()> {
        let mut chain = self.write();
        let height = chain.blocks.len() as u64 + 1;
        if block.height() != height {
            return Err(Error::InvalidHeight);
        }
        let hash = block.hash();
        if chain.heights.contains_key(&hash) {
            return Err(Error::Exists);
        }
        if let Some(tail) = chain.blocks.last() {
            if block.header().last_block_id.hash != tail.hash() {
                return Err(Error::DoesNotConnect);
            }
        }

        chain.heights.insert(hash, height);
        chain.blocks.push(Arc::new(block));
        info!("Added new block:\tBlock ID: {}\tBlock Height: {}", hash, height);
        Ok(())
    }

    /// Removes the tail block
    pub fn pop_block(&self) -> Result<Arc<Block>> {
        let mut chain = self.write();
        let block = chain.blocks.pop().ok_or(Error::DoesNotExist)?;
        chain.heights.remove(&block.hash());
        Ok(block)
    }

    /// Gets a block by its height
    pub fn get_block_by_height(&self, height: u64) -> Option<Arc<Block>> {
        let index = height.checked_sub(1)?;
        self.read().blocks.get(index as usize).cloned()
    }

    /// Gets a block by its hash
    pub fn get_block_by_hash(&self, hash: &Hash) -> Option<Arc<Block>> {
        let height = *self.read().heights.get(hash)?;
        self.get_block_by_height(height)
    }

    /// Gets the main chain's tail
    pub fn tail(&self) -> Option<Arc<Block>> {
        self.read().blocks.last().cloned()
    }

    /// Replaces the validator set
    pub fn set_validators(&self, validators: ValidatorSet) {
        self.write().validators = validators;
    }
}

impl BlockChain for MemBlockChain {
    fn height(&self) -> u64 {
        self.read().blocks.len() as u64
    }

    fn block_hash(&self, height: u64) -> Option<Hash> {
        self.get_block_by_height(height).map(|block| block.hash())
    }

    fn validators(&self) -> ValidatorSet {
        self.read().validators.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::block::BlockId;
    use types::evidence::EvidenceData;
    use types::vote::Commit;

    fn child_of(parent: Option<&Block>) -> Block {
        let height = parent.map_or(1, |block| block.height() + 1);
        let total_txs = parent.map_or(0, |block| block.header().total_txs);
        let mut block = Block::new(height, total_txs, Vec::new(), Commit::default(), EvidenceData::default());
        if let Some(parent) = parent {
            block.header_mut().last_block_id = BlockId {
                hash: parent.hash(),
                ..BlockId::default()
            };
        }
        block
    }

    #[test]
    fn it_extends_the_tail() {
        let chain = MemBlockChain::default();
        let first = child_of(None);
        let second = child_of(Some(&first));
        let first_hash = first.hash();

        assert_eq!(chain.add_block(second.clone()), Err(Error::InvalidHeight));
        chain.add_block(first).unwrap();
        chain.add_block(second.clone()).unwrap();

        assert_eq!(chain.height(), 2);
        assert_eq!(chain.block_hash(1), Some(first_hash));
        assert_eq!(chain.get_block_by_hash(&second.hash()).unwrap().height(), 2);
        assert_eq!(chain.tail().unwrap().hash(), second.hash());
        assert!(chain.get_block_by_height(0).is_none());
    }

    #[test]
    fn it_rejects_orphans() {
        let chain = MemBlockChain::default();
        let first = child_of(None);
        chain.add_block(first.clone()).unwrap();

        let mut orphan = child_of(Some(&first));
        orphan.header_mut().last_block_id = BlockId::default();
        assert_eq!(chain.add_block(orphan), Err(Error::DoesNotConnect));
    }

    #[test]
    fn it_pops_blocks() {
        let chain = MemBlockChain::default();
        let first = child_of(None);
        chain.add_block(first.clone()).unwrap();

        assert_eq!(chain.pop_block().unwrap().hash(), first.hash());
        assert!(chain.get_block_by_hash(&first.hash()).is_none());
        assert_eq!(chain.pop_block().map(|_| ()), Err(Error::DoesNotExist));
        chain.add_block(first).unwrap();
    }
}
