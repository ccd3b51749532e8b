use std::collections::HashSet;

use ensure_macro::ensure;
use log::debug;
use primitive_types::U256;

use crypto::ecc::{IsIdentity, Point};
use crypto::{Address, Key};
use ringct::{commit, commit_to_amount, RctSig, RctType, BULLETPROOF_MAX_OUTPUTS};
use transaction_util::tx_construction::absolute_offsets;

use super::{Input, Output, UtxoKind, UtxoTx};
use crate::censor::{State, TxCensor};
use crate::fee::cal_new_amount_gas;
use crate::params::{
    native_token, EVER_LIANKE_FEE, GAS_PRICE, MAX_PURE_TRANSACTION_SIZE,
    UTXO_COMMITMENT_CHANGE_RATE,
};
use crate::tx::transfer::check_nonce;
use crate::{Error, Result};

/// `amount / rate`, the amount as committed to
pub(crate) fn scaled(amount: &U256) -> Result<u64> {
    let units = *amount / U256::from(UTXO_COMMITMENT_CHANGE_RATE);
    ensure!(units.bits() <= 64, Error::InvalidUtxoTx("amount out of range"));
    Ok(units.low_u64())
}

fn is_rate_multiple(amount: &U256) -> bool {
    (*amount % U256::from(UTXO_COMMITMENT_CHANGE_RATE)).is_zero()
}

fn sum(points: &[Point]) -> Point {
    points.iter().sum()
}

impl UtxoTx {
    /// Stateless admission checks
    ///
    /// Shape, size, commitment balance, RingCT bundle and ring signatures.
    pub fn check_basic(&self, censor: &dyn TxCensor) -> Result<()> {
        self.check_semantic(censor)?;
        ensure!(self.size() <= MAX_PURE_TRANSACTION_SIZE, Error::OversizedData);
        self.check_commitments()?;

        let mut rv = self.restored_rct();
        self.check_rct_shape(&rv)?;
        self.verify_rings(censor, &mut rv).map_err(|e| {
            debug!("Utxo tx {} failed ring verification: {}", self.hash(), e);
            e
        })
    }

    fn check_semantic(&self, censor: &dyn TxCensor) -> Result<()> {
        ensure!(!self.inputs.is_empty(), Error::InvalidUtxoTx("no inputs"));
        ensure!(self.token_id == native_token(), Error::TxNotSupport);

        let mut images = HashSet::new();
        let mut account_inputs = 0;
        for input in &self.inputs {
            match input {
                Input::Utxo(input) => {
                    ensure!(
                        images.insert(input.key_image),
                        Error::InvalidUtxoTx("duplicate key image")
                    );
                    let image = input
                        .key_image
                        .decompress()
                        .map_err(|_| Error::InvalidUtxoTx("invalid key image"))?;
                    ensure!(
                        image.is_torsion_free() && !image.is_identity(),
                        Error::InvalidUtxoTx("invalid key image")
                    );
                    ensure!(
                        !input.key_offsets.is_empty(),
                        Error::InvalidUtxoTx("empty ring")
                    );
                    ensure!(
                        input.key_offsets[1..].iter().all(|offset| *offset != 0),
                        Error::InvalidUtxoTx("duplicate ring member")
                    );
                }
                Input::Account(input) => {
                    account_inputs += 1;
                    ensure!(
                        account_inputs == 1,
                        Error::InvalidUtxoTx("more than one account input")
                    );
                    ensure!(
                        input.amount >= U256::from(UTXO_COMMITMENT_CHANGE_RATE)
                            && is_rate_multiple(&input.amount),
                        Error::InvalidUtxoTx("invalid account input amount")
                    );
                }
                Input::Mine(_) => return Err(Error::TxNotSupport),
            }
        }

        let mut account_outputs = 0;
        let mut utxo_outputs = 0;
        for output in &self.outputs {
            match output {
                Output::Utxo(output) => {
                    utxo_outputs += 1;
                    ensure!(
                        output.amount.is_zero(),
                        Error::InvalidUtxoTx("utxo output amount is not hidden")
                    );
                }
                Output::Account(output) => {
                    account_outputs += 1;
                    ensure!(
                        account_outputs == 1,
                        Error::InvalidUtxoTx("more than one account output")
                    );
                    ensure!(
                        is_rate_multiple(&output.amount),
                        Error::InvalidUtxoTx("invalid account output amount")
                    );
                }
            }
        }
        ensure!(utxo_outputs <= BULLETPROOF_MAX_OUTPUTS, Error::UtxoOutputTooMore);

        let kind = self.kind();
        if kind.contains(UtxoKind::AIN) {
            ensure!(
                !kind.contains(UtxoKind::UIN) && !kind.contains(UtxoKind::AOUT),
                Error::InvalidUtxoTx("account input only pays utxo outputs")
            );
            ensure!(
                kind.contains(UtxoKind::UOUT),
                Error::InvalidUtxoTx("account input without outputs")
            );
        }

        ensure!(
            (self.fee % U256::from(GAS_PRICE)).is_zero(),
            Error::InvalidUtxoTx("fee is not a multiple of the gas price")
        );

        let to_contract = match self.account_output() {
            Some(output) => {
                ensure!(!censor.is_blacklisted(&output.to), Error::BlacklistAddress);
                let is_contract = censor.lock_state().is_contract(&output.to);
                if is_contract {
                    ensure!(
                        utxo_outputs == 0,
                        Error::InvalidUtxoTx("contract call with utxo outputs")
                    );
                } else {
                    ensure!(
                        !output.amount.is_zero(),
                        Error::InvalidUtxoTx("empty account output")
                    );
                }
                is_contract
            }
            None => false,
        };

        if kind.contains(UtxoKind::AIN) || to_contract {
            let from = self
                .sender(&censor.signer())
                .map_err(|_| Error::InvalidSender)?
                .ok_or(Error::InvalidSender)?;
            ensure!(!censor.is_blacklisted(&from), Error::BlacklistAddress);
        }
        Ok(())
    }

    /// Inputs and outputs commit to the same total
    fn check_commitments(&self) -> Result<()> {
        let mut ins = Vec::new();
        if let Some(input) = self.account_input() {
            let cf = input.cf.to_canonical_scalar()?;
            let expected = commit(scaled(&input.amount)?, &cf);
            ensure!(
                Key::from(expected) == input.commit,
                Error::InvalidUtxoTx("account input commitment mismatch")
            );
            ins.push(expected);
        }
        for pseudo_out in &self.rct.prunable.pseudo_outs {
            ins.push(pseudo_out.decompress()?);
        }
        ensure!(!ins.is_empty(), Error::SumOfCommitIllegal);

        let mut outs = Vec::new();
        for out_pk in &self.rct.base.out_pk {
            outs.push(out_pk.mask.decompress()?);
        }
        if self.token_id == native_token() {
            outs.push(commit_to_amount(scaled(&self.fee)?));
        }
        if let Some(output) = self.account_output() {
            let expected = commit_to_amount(scaled(&output.amount)?);
            ensure!(
                Key::from(expected) == output.commit,
                Error::InvalidUtxoTx("account output commitment mismatch")
            );
            outs.push(expected);
        }

        let (sum_in, sum_out) = (sum(&ins), sum(&outs));
        ensure!(
            !sum_in.is_identity() && !sum_out.is_identity(),
            Error::SumOfCommitIllegal
        );
        ensure!(
            sum_in == sum_out,
            Error::RingCT(ringct::Error::UnbalancedCommitments)
        );
        Ok(())
    }

    /// The bundle with the output keys put back in place
    fn restored_rct(&self) -> RctSig {
        let mut rv = self.rct.clone();
        for (out_pk, output) in rv.base.out_pk.iter_mut().zip(self.utxo_outputs()) {
            out_pk.dest = output.ot_addr;
        }
        rv
    }

    fn check_rct_shape(&self, rv: &RctSig) -> Result<()> {
        let utxo_ins = self.utxo_inputs().count();
        let utxo_outs = self.utxo_outputs().count();
        ensure!(
            rv.base.rct_type == RctType::Bulletproof,
            Error::RingCT(ringct::Error::UnsupportedType)
        );
        ensure!(
            rv.prunable.mgs.len() == utxo_ins && rv.prunable.pseudo_outs.len() == utxo_ins,
            Error::InvalidUtxoTx("one ring signature per utxo input")
        );
        ensure!(
            rv.base.out_pk.len() == utxo_outs,
            Error::InvalidUtxoTx("one commitment per utxo output")
        );
        ensure!(utxo_outs <= BULLETPROOF_MAX_OUTPUTS, Error::UtxoOutputTooMore);
        ringct::ver_rct_semantics_simple(rv)?;
        Ok(())
    }

    /// Fetches every ring and verifies the ring signatures
    fn verify_rings(&self, censor: &dyn TxCensor, rv: &mut RctSig) -> Result<()> {
        if !self.kind().contains(UtxoKind::UIN) {
            return Ok(());
        }

        let store = censor.utxo_store();
        let mut mix_ring = Vec::new();
        for (input, mg) in self.utxo_inputs().zip(rv.prunable.mgs.iter_mut()) {
            let indices = absolute_offsets(&input.key_offsets).ok_or(Error::CheckInvalidMixRing)?;
            let ring = store
                .get_utxo_outputs(&indices, &self.token_id)
                .ok_or(Error::CheckInvalidMixRing)?;
            ensure!(
                ring.len() == indices.len() && mg.ss.rows() == ring.len(),
                Error::CheckInvalidMixRing
            );
            mg.ii = vec![input.key_image];
            mix_ring.push(ring);
        }
        rv.base.mix_ring = mix_ring;
        rv.base.message = self.prefix_hash();

        ringct::ver_rct_non_semantics_simple(rv)?;
        Ok(())
    }

    /// Gas price times the gas the transaction must pay for
    pub fn needed_fee(&self, utxo_gas: u64) -> U256 {
        let kind = self.kind();
        let ain_amount = self.account_input().map_or_else(U256::zero, |input| input.amount);
        let aout_amount = self.account_output().map_or_else(U256::zero, |output| output.amount);

        let mut gas = 0u64;
        if ain_amount > self.fee {
            gas = gas.saturating_add(cal_new_amount_gas(&(ain_amount - self.fee), EVER_LIANKE_FEE));
        }
        if kind.contains(UtxoKind::UIN) {
            if !aout_amount.is_zero() {
                gas = gas.saturating_add(cal_new_amount_gas(&aout_amount, EVER_LIANKE_FEE));
            }
            if kind.contains(UtxoKind::UOUT) {
                gas = gas.saturating_add(utxo_gas);
            }
        }
        U256::from(GAS_PRICE) * U256::from(gas)
    }

    /// Admission checks against the current state
    ///
    /// Runs under the state lock. Key images are reserved in the mempool
    /// only once every other check passed.
    pub fn check_state(&self, censor: &dyn TxCensor) -> Result<()> {
        let mut state = censor.lock_state();

        let images = self.key_images();
        for image in &images {
            ensure!(
                !censor.utxo_store().has_key_image(image),
                Error::UtxoTxDoubleSpend
            );
            ensure!(
                !censor.mempool().key_image_exists(image),
                Error::UtxoTxDoubleSpend
            );
        }

        ensure!(
            self.fee >= self.needed_fee(censor.utxo_gas()),
            Error::UtxoTxFeeTooLow
        );

        if let Some(input) = self.account_input() {
            let from = self
                .sender(&censor.signer())
                .map_err(|_| Error::InvalidSender)?
                .ok_or(Error::InvalidSender)?;
            self.debit_account(&mut **state, &from, input.nonce, &input.amount)?;
        }

        censor.mempool().key_image_push(&images);
        Ok(())
    }

    fn debit_account(
        &self,
        state: &mut dyn State,
        from: &Address,
        nonce: u64,
        amount: &U256,
    ) -> Result<()> {
        check_nonce(state, from, nonce)?;
        if self.token_id == native_token() {
            ensure!(state.get_balance(from) >= *amount, Error::InsufficientFunds);
            state.sub_balance(from, amount);
        } else {
            ensure!(
                state.get_token_balance(from, &self.token_id) >= *amount,
                Error::InsufficientTokenFunds
            );
            ensure!(state.get_balance(from) >= self.fee, Error::InsufficientFunds);
            state.sub_token_balance(from, &self.token_id, amount);
            state.sub_balance(from, &self.fee);
        }
        state.set_nonce(from, nonce + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::OsRng;

    use crypto::ecc::Scalar;
    use crypto::KeyPair;
    use ringct::CtKey;
    use transaction_util::tx_construction::TxDestinationType;
    use transaction_util::AccountKeys;

    use super::*;
    use crate::censor::tests::{TestCensor, TestState};
    use crate::censor::Mempool;
    use crate::signer::Signer;
    use crate::tx::utxo::{
        new_ain_transaction, new_uin_transaction, AccountDestination, MineInput, RingMember,
        UtxoDestination, UtxoSource,
    };
    use crypto::secp256k1::PrivateKey;

    fn ether(n: u64) -> U256 {
        U256::from(n) * U256::exp10(18)
    }

    fn pay(receiver: &AccountKeys, amount: U256) -> UtxoDestination {
        UtxoDestination {
            destination: TxDestinationType::PayToAddress(receiver.address()),
            amount,
            remark: [7u8; 32],
        }
    }

    fn ain_tx(key: &PrivateKey, fee: U256) -> UtxoTx {
        let receiver = AccountKeys::generate();
        new_ain_transaction(
            &Signer::new(1),
            key,
            0,
            &AccountKeys::generate(),
            &[pay(&receiver, ether(1) - fee)],
            fee,
        )
        .unwrap()
    }

    /// Appends `size` outputs to the log and returns a source spending the
    /// one at `real_index`
    fn add_source(censor: &mut TestCensor, size: usize, real_index: usize, amount: U256) -> UtxoSource {
        let units = scaled(&amount).unwrap();
        let mut ring = Vec::new();
        let mut real = None;
        for i in 0..size {
            let keypair = KeyPair::generate();
            let mask = Scalar::random(&mut OsRng);
            let key = CtKey {
                dest: Key::from(keypair.public_key),
                mask: Key::from(commit(units, &mask)),
            };
            ring.push(RingMember {
                index: censor.outputs.len() as u64,
                key,
            });
            censor.outputs.push(key);
            if i == real_index {
                real = Some((keypair.secret_key, mask));
            }
        }
        let (secret, mask) = real.unwrap();
        UtxoSource {
            ring,
            real_index,
            secret,
            mask,
            amount,
        }
    }

    fn uin_tx(censor: &mut TestCensor, ring_size: usize) -> UtxoTx {
        let fee = U256::from(GAS_PRICE) * U256::from(crate::params::DEFAULT_UTXO_GAS);
        let source = add_source(censor, ring_size, ring_size / 2, ether(1));
        new_uin_transaction(
            &AccountKeys::generate(),
            &[source],
            &[pay(&AccountKeys::generate(), ether(1) - fee)],
            None,
            fee,
            None,
        )
        .unwrap()
    }

    #[test]
    fn it_admits_account_funded_outputs() {
        let key = PrivateKey::random();
        let censor = TestCensor::new(TestState::default().with_balance(key.address(), ether(2)));
        let fee = U256::from(GAS_PRICE) * U256::from(500_000u64);
        let tx = ain_tx(&key, fee);

        assert_eq!(tx.kind(), UtxoKind::AIN | UtxoKind::UOUT);
        tx.check_basic(&censor).unwrap();
        tx.check_state(&censor).unwrap();

        let state = censor.lock_state();
        assert_eq!(state.get_balance(&key.address()), ether(1));
        assert_eq!(state.get_nonce(&key.address()), 1);
    }

    #[test]
    fn it_rejects_fees_below_the_transfer_gas() {
        let key = PrivateKey::random();
        let censor = TestCensor::new(TestState::default().with_balance(key.address(), ether(2)));
        let tx = ain_tx(&key, U256::from(GAS_PRICE));

        tx.check_basic(&censor).unwrap();
        assert_eq!(tx.check_state(&censor), Err(Error::UtxoTxFeeTooLow));
        assert_eq!(censor.lock_state().get_balance(&key.address()), ether(2));
    }

    #[test]
    fn it_requires_the_account_balance() {
        let key = PrivateKey::random();
        let censor = TestCensor::new(TestState::default().with_balance(key.address(), ether(1) / 2));
        let tx = ain_tx(&key, U256::from(GAS_PRICE) * U256::from(500_000u64));

        tx.check_basic(&censor).unwrap();
        assert_eq!(tx.check_state(&censor), Err(Error::InsufficientFunds));
    }

    #[test]
    fn it_verifies_single_member_rings() {
        let mut censor = TestCensor::new(TestState::default());
        let tx = uin_tx(&mut censor, 1);

        assert_eq!(tx.kind(), UtxoKind::UIN | UtxoKind::UOUT);
        tx.check_basic(&censor).unwrap();
        tx.check_state(&censor).unwrap();
        assert!(censor.key_image_exists(&tx.key_images()[0]));
        assert_eq!(tx.check_state(&censor), Err(Error::UtxoTxDoubleSpend));
    }

    #[test]
    fn it_verifies_mlsag_rings() {
        let mut censor = TestCensor::new(TestState::default());
        let tx = uin_tx(&mut censor, 5);
        tx.check_basic(&censor).unwrap();
        tx.check_state(&censor).unwrap();
    }

    #[test]
    fn it_rejects_spent_key_images() {
        let mut censor = TestCensor::new(TestState::default());
        let tx = uin_tx(&mut censor, 3);
        censor.spent_images.insert(tx.key_images()[0]);

        tx.check_basic(&censor).unwrap();
        assert_eq!(tx.check_state(&censor), Err(Error::UtxoTxDoubleSpend));
        assert!(censor.pending_images.lock().unwrap().is_empty());
    }

    #[test]
    fn it_rejects_swapped_ring_members() {
        let mut censor = TestCensor::new(TestState::default());
        let tx = uin_tx(&mut censor, 3);
        censor.outputs[1].dest = Key::from(KeyPair::generate().public_key);

        match tx.check_basic(&censor) {
            Err(Error::RingCT(_)) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn it_rejects_missing_ring_members() {
        let mut censor = TestCensor::new(TestState::default());
        let tx = uin_tx(&mut censor, 3);
        censor.outputs.truncate(2);

        assert_eq!(tx.check_basic(&censor), Err(Error::CheckInvalidMixRing));
    }

    #[test]
    fn it_rejects_unbalanced_commitments() {
        let mut censor = TestCensor::new(TestState::default());
        let mut tx = uin_tx(&mut censor, 1);
        tx.fee = tx.fee + U256::from(GAS_PRICE);
        tx.reset_caches();

        assert_eq!(
            tx.check_basic(&censor),
            Err(Error::RingCT(ringct::Error::UnbalancedCommitments))
        );
    }

    #[test]
    fn it_rejects_mined_inputs() {
        let censor = TestCensor::new(TestState::default());
        let tx = UtxoTx::new(
            vec![Input::Mine(MineInput { amount: ether(1) })],
            Vec::new(),
            Key::default(),
            Vec::new(),
            U256::zero(),
        );
        assert_eq!(tx.check_basic(&censor), Err(Error::TxNotSupport));
    }

    #[test]
    fn it_pays_contracts_from_rings() {
        let contract = Address::from_name(b"contract");
        let mut censor = TestCensor::new(TestState::default().with_code(contract, vec![0, 0x61, 0x73, 0x6d]));
        let key = PrivateKey::random();
        let source = add_source(&mut censor, 2, 0, ether(1));
        let fee = ether(1) / 10;
        let call = AccountDestination {
            to: contract,
            amount: ether(1) - fee,
            data: b"call".to_vec(),
        };

        let tx = new_uin_transaction(
            &AccountKeys::generate(),
            &[source.clone()],
            &[],
            Some(call.clone()),
            fee,
            Some((&Signer::new(1), &key)),
        )
        .unwrap();
        assert_eq!(tx.kind(), UtxoKind::UIN | UtxoKind::AOUT);
        assert_eq!(tx.to(), Some(contract));
        assert_eq!(tx.sender(&Signer::new(1)).unwrap(), Some(key.address()));
        tx.check_basic(&censor).unwrap();
        tx.check_state(&censor).unwrap();

        let unsigned = new_uin_transaction(
            &AccountKeys::generate(),
            &[source],
            &[],
            Some(call),
            fee,
            None,
        )
        .unwrap();
        assert_eq!(unsigned.check_basic(&censor), Err(Error::InvalidSender));
    }

    #[test]
    fn it_round_trips() {
        let mut censor = TestCensor::new(TestState::default());
        let tx = uin_tx(&mut censor, 2);
        let decoded: UtxoTx = codec::decode(&codec::encode(&tx)).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.hash(), tx.hash());
        decoded.check_basic(&censor).unwrap();
    }
}
