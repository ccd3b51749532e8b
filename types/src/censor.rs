//! Collaborators consulted by transaction admission
//!
//! Admission never owns chain state. Everything it reads or reserves goes
//! through these traits, bundled behind a [`TxCensor`].

use std::sync::MutexGuard;

use primitive_types::U256;

use crypto::{Address, Hash, Key};
use ringct::CtKey;

use crate::signer::Signer;
use crate::tx::SignersInfo;
use crate::validator::ValidatorSet;

/// Account balances, nonces and code
///
/// The token balance of the native token is the account balance.
pub trait State: Send {
    fn get_balance(&self, address: &Address) -> U256;
    fn get_token_balance(&self, address: &Address, token: &Address) -> U256;
    fn get_nonce(&self, address: &Address) -> u64;
    fn get_code(&self, address: &Address) -> Vec<u8>;

    fn set_nonce(&mut self, address: &Address, nonce: u64);
    fn add_balance(&mut self, address: &Address, amount: &U256);
    fn sub_balance(&mut self, address: &Address, amount: &U256);
    fn add_token_balance(&mut self, address: &Address, token: &Address, amount: &U256);
    fn sub_token_balance(&mut self, address: &Address, token: &Address, amount: &U256);

    /// The address holds code
    fn is_contract(&self, address: &Address) -> bool {
        !self.get_code(address).is_empty()
    }
}

/// Pending transactions and the key images they reserve
pub trait Mempool: Send + Sync {
    /// A pending transaction already spends `key_image`
    fn key_image_exists(&self, key_image: &Key) -> bool;

    /// Reserves the key images of an admitted transaction
    fn key_image_push(&self, key_images: &[Key]);

    /// Releases key images once their transaction left the pool
    fn key_image_remove(&self, key_images: &[Key]);
}

/// The global output log of confidential outputs
pub trait UtxoStore: Send + Sync {
    /// Ring members at the given global indices, `None` if any is missing
    fn get_utxo_outputs(&self, indices: &[u64], token: &Address) -> Option<Vec<CtKey>>;

    /// `key_image` was spent on chain
    fn has_key_image(&self, key_image: &Key) -> bool;
}

/// Read access to the committed chain
pub trait BlockChain: Send + Sync {
    fn height(&self) -> u64;

    /// Hash of the block at `height`
    fn block_hash(&self, height: u64) -> Option<Hash>;

    /// Validators voting on the next block
    fn validators(&self) -> ValidatorSet;
}

/// Signer sets authorising administrative transactions
pub trait TxMgr: Send + Sync {
    /// The active signer set for a transaction type name
    fn get_signers_info(&self, tx_type: &str) -> Option<SignersInfo>;
}

/// Everything admission needs, in one place
///
/// [`TxCensor::lock_state`] hands out the state behind a guard. Holders must
/// not call back into anything that locks the state again.
pub trait TxCensor: Send + Sync {
    fn lock_state(&self) -> MutexGuard<'_, Box<dyn State>>;
    fn mempool(&self) -> &dyn Mempool;
    fn utxo_store(&self) -> &dyn UtxoStore;
    fn blockchain(&self) -> &dyn BlockChain;
    fn tx_mgr(&self) -> &dyn TxMgr;

    /// Signer every account signature is checked with
    fn signer(&self) -> Signer;

    /// Gas charged when a transaction with ring inputs creates outputs
    fn utxo_gas(&self) -> u64;

    /// Recipient-less transfers are admitted
    fn is_test_mode(&self) -> bool;

    fn is_blacklisted(&self, address: &Address) -> bool;
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use super::*;

    /// Plain maps behind [`State`]
    #[derive(Default)]
    pub(crate) struct TestState {
        balances: HashMap<Address, U256>,
        tokens: HashMap<(Address, Address), U256>,
        nonces: HashMap<Address, u64>,
        code: HashMap<Address, Vec<u8>>,
    }

    impl TestState {
        pub(crate) fn with_balance(mut self, address: Address, amount: U256) -> Self {
            self.balances.insert(address, amount);
            self
        }

        pub(crate) fn with_code(mut self, address: Address, code: Vec<u8>) -> Self {
            self.code.insert(address, code);
            self
        }
    }

    impl State for TestState {
        fn get_balance(&self, address: &Address) -> U256 {
            self.balances.get(address).copied().unwrap_or_default()
        }

        fn get_token_balance(&self, address: &Address, token: &Address) -> U256 {
            if token.is_zero() {
                return self.get_balance(address);
            }
            self.tokens
                .get(&(*address, *token))
                .copied()
                .unwrap_or_default()
        }

        fn get_nonce(&self, address: &Address) -> u64 {
            self.nonces.get(address).copied().unwrap_or_default()
        }

        fn get_code(&self, address: &Address) -> Vec<u8> {
            self.code.get(address).cloned().unwrap_or_default()
        }

        fn set_nonce(&mut self, address: &Address, nonce: u64) {
            self.nonces.insert(*address, nonce);
        }

        fn add_balance(&mut self, address: &Address, amount: &U256) {
            *self.balances.entry(*address).or_default() += *amount;
        }

        fn sub_balance(&mut self, address: &Address, amount: &U256) {
            *self.balances.entry(*address).or_default() -= *amount;
        }

        fn add_token_balance(&mut self, address: &Address, token: &Address, amount: &U256) {
            *self.tokens.entry((*address, *token)).or_default() += *amount;
        }

        fn sub_token_balance(&mut self, address: &Address, token: &Address, amount: &U256) {
            *self.tokens.entry((*address, *token)).or_default() -= *amount;
        }
    }

    /// Every collaborator in one struct
    pub(crate) struct TestCensor {
        pub(crate) state: Mutex<Box<dyn State>>,
        pub(crate) pending_images: Mutex<HashSet<Key>>,
        /// Global output log, indexed by position
        pub(crate) outputs: Vec<CtKey>,
        pub(crate) spent_images: HashSet<Key>,
        pub(crate) validators: ValidatorSet,
        pub(crate) signers: HashMap<String, SignersInfo>,
        pub(crate) blacklist: HashSet<Address>,
        pub(crate) test_mode: bool,
    }

    impl TestCensor {
        pub(crate) fn new(state: TestState) -> Self {
            TestCensor {
                state: Mutex::new(Box::new(state)),
                pending_images: Mutex::new(HashSet::new()),
                outputs: Vec::new(),
                spent_images: HashSet::new(),
                validators: ValidatorSet::default(),
                signers: HashMap::new(),
                blacklist: HashSet::new(),
                test_mode: false,
            }
        }
    }

    impl Mempool for TestCensor {
        fn key_image_exists(&self, key_image: &Key) -> bool {
            self.pending_images.lock().unwrap().contains(key_image)
        }

        fn key_image_push(&self, key_images: &[Key]) {
            self.pending_images
                .lock()
                .unwrap()
                .extend(key_images.iter().copied());
        }

        fn key_image_remove(&self, key_images: &[Key]) {
            let mut pending = self.pending_images.lock().unwrap();
            key_images.iter().for_each(|image| {
                pending.remove(image);
            });
        }
    }

    impl UtxoStore for TestCensor {
        fn get_utxo_outputs(&self, indices: &[u64], _token: &Address) -> Option<Vec<CtKey>> {
            indices
                .iter()
                .map(|i| self.outputs.get(*i as usize).copied())
                .collect()
        }

        fn has_key_image(&self, key_image: &Key) -> bool {
            self.spent_images.contains(key_image)
        }
    }

    impl BlockChain for TestCensor {
        fn height(&self) -> u64 {
            1
        }

        fn block_hash(&self, _height: u64) -> Option<Hash> {
            None
        }

        fn validators(&self) -> ValidatorSet {
            self.validators.clone()
        }
    }

    impl TxMgr for TestCensor {
        fn get_signers_info(&self, tx_type: &str) -> Option<SignersInfo> {
            self.signers.get(tx_type).cloned()
        }
    }

    impl TxCensor for TestCensor {
        fn lock_state(&self) -> MutexGuard<'_, Box<dyn State>> {
            self.state.lock().unwrap()
        }

        fn mempool(&self) -> &dyn Mempool {
            self
        }

        fn utxo_store(&self) -> &dyn UtxoStore {
            self
        }

        fn blockchain(&self) -> &dyn BlockChain {
            self
        }

        fn tx_mgr(&self) -> &dyn TxMgr {
            self
        }

        fn signer(&self) -> Signer {
            Signer::new(1)
        }

        fn utxo_gas(&self) -> u64 {
            crate::params::DEFAULT_UTXO_GAS
        }

        fn is_test_mode(&self) -> bool {
            self.test_mode
        }

        fn is_blacklisted(&self, address: &Address) -> bool {
            self.blacklist.contains(address)
        }
    }
}
