use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info};
use primitive_types::U256;

use crypto::{Address, Hash};
use types::balance_record::{AccountKind, BalanceLedger, BalanceRecord, RecordType, TxBalanceRecords};
use types::blacklist::{global_blacklist, Blacklist};
use types::censor::{BlockChain, Mempool, State, TxCensor, TxMgr, UtxoStore};
use types::params::{native_token, GAS_PRICE};
use types::signer::Signer;
use types::{Error, Result, Tx};

use crate::{Config, TxPool};

/// Admits transactions into a [`TxPool`] against the chain collaborators
pub struct Censor {
    state: Mutex<Box<dyn State>>,
    pool: Arc<TxPool>,
    utxo_store: Arc<dyn UtxoStore>,
    blockchain: Arc<dyn BlockChain>,
    tx_mgr: Arc<dyn TxMgr>,
    signer: Signer,
    utxo_gas: u64,
    test_mode: bool,
    /// The process wide list unless overridden
    blacklist: Option<Arc<Blacklist>>,
    ledger: Option<BalanceLedger>,
}

impl Censor {
    pub fn new(
        config: &Config,
        state: Box<dyn State>,
        utxo_store: Arc<dyn UtxoStore>,
        blockchain: Arc<dyn BlockChain>,
        tx_mgr: Arc<dyn TxMgr>,
    ) -> Self {
        info!(
            "Censor using sign param {}, utxo gas {}, pool size {}",
            config.sign_param, config.utxo_gas, config.mempool_size
        );
        Censor {
            state: Mutex::new(state),
            pool: Arc::new(TxPool::new(config.mempool_size)),
            utxo_store,
            blockchain,
            tx_mgr,
            signer: Signer::new(config.sign_param),
            utxo_gas: config.utxo_gas,
            test_mode: config.test_mode,
            blacklist: None,
            ledger: if config.record_balances {
                Some(BalanceLedger::new())
            } else {
                None
            },
        }
    }

    /// Checks addresses against `blacklist` instead of the process wide one
    pub fn with_blacklist(mut self, blacklist: Arc<Blacklist>) -> Self {
        self.blacklist = Some(blacklist);
        self
    }

    pub fn pool(&self) -> &Arc<TxPool> {
        &self.pool
    }

    /// The ledger, when balance recording is enabled
    pub fn balance_ledger(&self) -> Option<&BalanceLedger> {
        self.ledger.as_ref()
    }

    /// Runs both admission phases and stores the transaction
    ///
    /// A pool slot is held before any check runs, so once `check_state` has
    /// debited the state the transaction is always stored. On success its
    /// key images are reserved in the pool.
    pub fn add_tx(&self, tx: Tx) -> Result<Hash> {
        let hash = tx.hash();
        self.pool.reserve(hash)?;

        let admitted = tx.check_basic(self).and_then(|()| tx.check_state(self));
        if let Err(e) = admitted {
            self.pool.release(&hash);
            debug!("Rejected {} {}: {}", tx.type_name(), hash, e);
            return Err(e);
        }

        if let Some(ledger) = &self.ledger {
            if let Some(records) = self.balance_records(&tx) {
                ledger.add_tx_balance_record(records);
            }
        }
        Ok(self.pool.fill(tx))
    }

    /// Movements admission debited for `tx`
    fn balance_records(&self, tx: &Tx) -> Option<TxBalanceRecords> {
        let account = |from, to, to_kind, record_type, token_id, amount| BalanceRecord {
            from,
            to,
            from_kind: AccountKind::Account,
            to_kind,
            record_type,
            token_id,
            amount,
        };

        match tx {
            Tx::Transfer(_) | Tx::Token(_) => {
                let message = tx.as_message(&self.signer).ok()?;
                let fee = message.gas_price.saturating_mul(U256::from(message.gas_limit));
                let mut records = vec![account(
                    message.from,
                    Address::default(),
                    AccountKind::Account,
                    RecordType::Fee,
                    native_token(),
                    fee,
                )];
                if let Some(to) = message.to.filter(|_| !message.amount.is_zero()) {
                    let to_kind = if self.lock_state().is_contract(&to) {
                        AccountKind::Contract
                    } else {
                        AccountKind::Account
                    };
                    records.push(account(
                        message.from,
                        to,
                        to_kind,
                        RecordType::Transfer,
                        message.token,
                        message.amount,
                    ));
                }
                Some(TxBalanceRecords::new(
                    tx.hash(),
                    &tx.type_name(),
                    records,
                    message.nonce,
                    message.gas_price,
                    message.gas_limit,
                ))
            }
            Tx::Utxo(utxo) => {
                let from = utxo.sender(&self.signer).ok()?;
                let record = BalanceRecord {
                    from: from.unwrap_or_default(),
                    to: Address::default(),
                    from_kind: if from.is_some() {
                        AccountKind::Account
                    } else {
                        AccountKind::Utxo
                    },
                    to_kind: AccountKind::Account,
                    record_type: RecordType::Fee,
                    token_id: native_token(),
                    amount: utxo.fee(),
                };
                let gas_price = U256::from(GAS_PRICE);
                Some(TxBalanceRecords::new(
                    tx.hash(),
                    &tx.type_name(),
                    vec![record],
                    0,
                    gas_price,
                    (utxo.fee() / gas_price).low_u64(),
                ))
            }
            _ => None,
        }
    }
}

impl TxCensor for Censor {
    fn lock_state(&self) -> MutexGuard<'_, Box<dyn State>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn mempool(&self) -> &dyn Mempool {
        &*self.pool
    }

    fn utxo_store(&self) -> &dyn UtxoStore {
        &*self.utxo_store
    }

    fn blockchain(&self) -> &dyn BlockChain {
        &*self.blockchain
    }

    fn tx_mgr(&self) -> &dyn TxMgr {
        &*self.tx_mgr
    }

    fn signer(&self) -> Signer {
        self.signer
    }

    fn utxo_gas(&self) -> u64 {
        self.utxo_gas
    }

    fn is_test_mode(&self) -> bool {
        self.test_mode
    }

    fn is_blacklisted(&self, address: &Address) -> bool {
        self.blacklist
            .as_deref()
            .unwrap_or_else(|| global_blacklist())
            .contains(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockchain_db::{MemBlockChain, MemState, MemTxMgr, MemUtxoStore};
    use crypto::ecc::Scalar;
    use crypto::secp256k1::PrivateKey;
    use crypto::{keccak, Key, KeyPair};
    use rand::rngs::OsRng;
    use ringct::{commit, CtKey};
    use transaction_util::tx_construction::TxDestinationType;
    use transaction_util::AccountKeys;
    use types::fee::cal_new_amount_gas;
    use types::params::{DEFAULT_UTXO_GAS, EVER_LIANKE_FEE, UTXO_COMMITMENT_CHANGE_RATE};
    use types::tx::utxo::{new_ain_transaction, new_uin_transaction, RingMember, UtxoDestination, UtxoSource};
    use types::tx::Transfer;

    fn ether(n: u64) -> U256 {
        U256::from(n) * U256::exp10(18)
    }

    fn censor_with(config: Config, state: MemState) -> (Censor, Arc<MemUtxoStore>) {
        let store = Arc::new(MemUtxoStore::new());
        let censor = Censor::new(
            &config,
            Box::new(state),
            store.clone(),
            Arc::new(MemBlockChain::default()),
            Arc::new(MemTxMgr::new()),
        )
        .with_blacklist(Arc::new(Blacklist::new()));
        (censor, store)
    }

    fn funded(key: &PrivateKey, amount: U256) -> MemState {
        let mut state = MemState::new();
        state.set_balance(key.address(), amount);
        state
    }

    fn transfer(key: &PrivateKey, nonce: u64, amount: U256) -> Tx {
        let mut tx = Transfer::new(
            nonce,
            Some(Address::from_name(b"bob")),
            amount,
            cal_new_amount_gas(&amount, EVER_LIANKE_FEE),
            U256::from(GAS_PRICE),
            Vec::new(),
        );
        tx.sign(&Signer::new(Config::default().sign_param), key).unwrap();
        Tx::Transfer(tx)
    }

    fn pay(amount: U256) -> UtxoDestination {
        UtxoDestination {
            destination: TxDestinationType::PayToAddress(AccountKeys::generate().address()),
            amount,
            remark: [0u8; 32],
        }
    }

    /// Logs a ring of `size` native outputs and returns a source spending the first
    fn source(store: &MemUtxoStore, size: usize, amount: U256) -> UtxoSource {
        let units = (amount / U256::from(UTXO_COMMITMENT_CHANGE_RATE)).low_u64();
        let secret = KeyPair::generate().secret_key;
        let mask = Scalar::random(&mut OsRng);
        let keys: Vec<CtKey> = (0..size)
            .map(|i| {
                let dest = if i == 0 {
                    KeyPair::from(secret).public_key
                } else {
                    KeyPair::generate().public_key
                };
                CtKey {
                    dest: Key::from(dest),
                    mask: Key::from(commit(units, &mask)),
                }
            })
            .collect();
        let first = store.add_outputs(&native_token(), &keys);
        UtxoSource {
            ring: keys
                .into_iter()
                .enumerate()
                .map(|(i, key)| RingMember {
                    index: first + i as u64,
                    key,
                })
                .collect(),
            real_index: 0,
            secret,
            mask,
            amount,
        }
    }

    fn spend(source: &UtxoSource) -> Tx {
        let fee = U256::from(GAS_PRICE) * U256::from(DEFAULT_UTXO_GAS);
        let tx = new_uin_transaction(
            &AccountKeys::generate(),
            std::slice::from_ref(source),
            &[pay(source.amount - fee)],
            None,
            fee,
            None,
        )
        .unwrap();
        Tx::Utxo(Box::new(tx))
    }

    #[test]
    fn it_admits_transfers() {
        let key = PrivateKey::random();
        let (censor, _) = censor_with(Config::default(), funded(&key, ether(2)));
        let tx = transfer(&key, 0, ether(1));

        let hash = censor.add_tx(tx.clone()).unwrap();
        assert_eq!(censor.add_tx(tx), Err(Error::TxDuplicate));
        {
            let state = censor.lock_state();
            assert_eq!(state.get_nonce(&key.address()), 1);
            assert!(state.get_balance(&key.address()) < ether(1));
        }

        assert_eq!(censor.add_tx(transfer(&key, 0, ether(1) / 2)), Err(Error::NonceTooLow));
        assert_eq!(censor.pool().take_tx(&hash).unwrap().hash(), hash);
        assert!(censor.pool().is_empty());
    }

    #[test]
    fn it_refuses_a_full_pool_before_touching_state() {
        let key = PrivateKey::random();
        let config = Config {
            mempool_size: 1,
            ..Config::default()
        };
        let (censor, _) = censor_with(config, funded(&key, ether(3)));

        censor.add_tx(transfer(&key, 0, ether(1))).unwrap();
        assert_eq!(censor.add_tx(transfer(&key, 1, ether(1))), Err(Error::MempoolIsFull));
        assert_eq!(censor.lock_state().get_nonce(&key.address()), 1);
    }

    #[test]
    fn it_leaves_state_alone_when_the_last_slot_is_taken() {
        let key = PrivateKey::random();
        let config = Config {
            mempool_size: 1,
            ..Config::default()
        };
        let (censor, _) = censor_with(config, funded(&key, ether(2)));

        let concurrent = Address::from_name(b"concurrent");
        censor.pool().reserve(keccak(concurrent.as_bytes())).unwrap();
        assert_eq!(censor.add_tx(transfer(&key, 0, ether(1))), Err(Error::MempoolIsFull));
        {
            let state = censor.lock_state();
            assert_eq!(state.get_nonce(&key.address()), 0);
            assert_eq!(state.get_balance(&key.address()), ether(2));
        }

        censor.pool().release(&keccak(concurrent.as_bytes()));
        censor.add_tx(transfer(&key, 0, ether(1))).unwrap();
        assert_eq!(censor.pool().len(), 1);
    }

    #[test]
    fn it_releases_the_slot_of_rejected_transactions() {
        let key = PrivateKey::random();
        let config = Config {
            mempool_size: 1,
            ..Config::default()
        };
        let (censor, _) = censor_with(config, funded(&key, ether(2)));

        assert_eq!(censor.add_tx(transfer(&key, 1, ether(1))), Err(Error::NonceTooHigh));
        assert!(!censor.pool().is_full());
        censor.add_tx(transfer(&key, 0, ether(1))).unwrap();
    }

    #[test]
    fn it_rejects_blacklisted_senders() {
        let key = PrivateKey::random();
        let blacklist = Arc::new(Blacklist::new());
        let (censor, _) = censor_with(Config::default(), funded(&key, ether(2)));
        let censor = censor.with_blacklist(blacklist.clone());

        blacklist.add(key.address());
        assert_eq!(
            censor.add_tx(transfer(&key, 0, ether(1))),
            Err(Error::BlacklistAddress)
        );
        blacklist.remove(&key.address());
        censor.add_tx(transfer(&key, 0, ether(1))).unwrap();
    }

    #[test]
    fn it_rejects_utxo_fees_below_the_transfer_gas() {
        let key = PrivateKey::random();
        let (censor, _) = censor_with(Config::default(), funded(&key, ether(2)));
        let fee = U256::from(GAS_PRICE);
        let tx = new_ain_transaction(
            &censor.signer(),
            &key,
            0,
            &AccountKeys::generate(),
            &[pay(ether(1) - fee)],
            fee,
        )
        .unwrap();

        assert_eq!(censor.add_tx(Tx::Utxo(Box::new(tx))), Err(Error::UtxoTxFeeTooLow));
        assert!(censor.pool().is_empty());
        assert_eq!(censor.lock_state().get_balance(&key.address()), ether(2));
    }

    #[test]
    fn it_rejects_double_spends() {
        let (censor, store) = censor_with(Config::default(), MemState::new());
        let source = source(&store, 3, ether(1));
        let first = spend(&source);
        let image = first.key_images()[0];

        let hash = censor.add_tx(first).unwrap();
        assert!(censor.pool().key_image_exists(&image));
        assert_eq!(censor.add_tx(spend(&source)), Err(Error::UtxoTxDoubleSpend));

        let taken = censor.pool().take_tx(&hash).unwrap();
        assert!(!censor.pool().key_image_exists(&image));
        if let Tx::Utxo(tx) = &*taken {
            store.apply_tx(tx).unwrap();
        }
        assert_eq!(censor.add_tx(spend(&source)), Err(Error::UtxoTxDoubleSpend));
        assert!(!censor.pool().key_image_exists(&image));
    }

    #[test]
    fn it_records_balances() {
        let key = PrivateKey::random();
        let config = Config {
            record_balances: true,
            ..Config::default()
        };
        let (censor, _) = censor_with(config, funded(&key, ether(2)));
        censor.add_tx(transfer(&key, 0, ether(1))).unwrap();

        let block = censor.balance_ledger().unwrap().snapshot();
        assert_eq!(block.tx_records.len(), 1);
        let records = &block.tx_records[0].records;
        assert_eq!(records[0].record_type, RecordType::Fee);
        assert_eq!(records[1].record_type, RecordType::Transfer);
        assert_eq!(records[1].amount, ether(1));
        assert_eq!(records[1].to, Address::from_name(b"bob"));
    }
}
