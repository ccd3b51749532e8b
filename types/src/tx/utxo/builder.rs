//! Construction of confidential transactions

use ensure_macro::ensure;
use log::debug;
use primitive_types::U256;

use crypto::ecc::{key_image, Scalar};
use crypto::{secp256k1::PrivateKey, Address, Hash, Key, KeyPair};
use ringct::{commit, commit_to_amount, CtKey, Destination, InputSecret, RctSig};
use transaction_util::tx_construction::{
    generate_output_keys, mask_remark, relative_offsets, TxDestinationType, TxKeys,
};
use transaction_util::AccountKeys;

use super::check::scaled;
use super::{AccountInput, AccountOutput, Input, Output, UtxoInput, UtxoOutput, UtxoTx};
use crate::params::UTXO_COMMITMENT_CHANGE_RATE;
use crate::signer::Signer;
use crate::{Error, Result};

/// A confidential output to create
#[derive(Clone, Debug)]
pub struct UtxoDestination {
    pub destination: TxDestinationType,
    pub amount: U256,
    pub remark: [u8; 32],
}

/// A public payment to an account or contract
#[derive(Clone, Debug, Default)]
pub struct AccountDestination {
    pub to: Address,
    pub amount: U256,
    pub data: Vec<u8>,
}

/// An earlier output used as a ring member
#[derive(Clone, Copy, Debug)]
pub struct RingMember {
    /// Position in the global output log
    pub index: u64,
    pub key: CtKey,
}

/// An owned output to spend, hidden among decoys
#[derive(Clone, Debug)]
pub struct UtxoSource {
    /// Sorted by global index, the real output at `real_index`
    pub ring: Vec<RingMember>,
    pub real_index: usize,
    /// One-time secret key of the real output
    pub secret: Scalar,
    /// Commitment mask of the real output
    pub mask: Scalar,
    pub amount: U256,
}

fn check_rate(amount: &U256) -> Result<u64> {
    ensure!(
        (*amount % U256::from(UTXO_COMMITMENT_CHANGE_RATE)).is_zero(),
        Error::InvalidUtxoTx("amount is not a multiple of the commitment rate")
    );
    scaled(amount)
}

fn output_keys(sender: &AccountKeys, destinations: &[UtxoDestination]) -> Result<TxKeys> {
    let targets: Vec<TxDestinationType> = destinations
        .iter()
        .map(|dest| dest.destination.clone())
        .collect();
    generate_output_keys(sender, &targets)
        .map_err(|_| Error::InvalidUtxoTx("cannot derive output keys"))
}

/// Erased outputs and their RingCT destinations
fn utxo_outputs(
    keys: &TxKeys,
    destinations: &[UtxoDestination],
) -> Result<(Vec<Output>, Vec<Destination>)> {
    let mut outputs = Vec::with_capacity(destinations.len());
    let mut rct_dests = Vec::with_capacity(destinations.len());
    for (dest, output) in destinations.iter().zip(&keys.outputs) {
        let ot_addr = Key::from(output.one_time_key);
        outputs.push(Output::Utxo(UtxoOutput {
            ot_addr,
            amount: U256::zero(),
            remark: mask_remark(&dest.remark, &output.shared_secret),
        }));
        rct_dests.push(Destination {
            key: ot_addr,
            amount: check_rate(&dest.amount)?,
            shared_secret: output.shared_secret,
        });
    }
    Ok((outputs, rct_dests))
}

/// Drops what the verifier restores from the transaction itself
fn strip_restorable(mut rv: RctSig) -> RctSig {
    rv.base.message = Hash::zero();
    rv.base.mix_ring.clear();
    rv.base.out_pk.iter_mut().for_each(|pk| pk.dest = Key::default());
    rv.prunable.mgs.iter_mut().for_each(|mg| mg.ii.clear());
    rv
}

fn total(amounts: impl Iterator<Item = U256>) -> Result<U256> {
    amounts.fold(Ok(U256::zero()), |acc, amount| {
        acc?.checked_add(amount)
            .ok_or(Error::InvalidUtxoTx("amount overflow"))
    })
}

/// Moves `Σ destinations + fee` from the signing account into confidential outputs
pub fn new_ain_transaction(
    signer: &Signer,
    key: &PrivateKey,
    nonce: u64,
    sender_keys: &AccountKeys,
    destinations: &[UtxoDestination],
    fee: U256,
) -> Result<UtxoTx> {
    ensure!(
        !destinations.is_empty(),
        Error::InvalidUtxoTx("account input without outputs")
    );
    let amount = total(destinations.iter().map(|dest| dest.amount))?
        .checked_add(fee)
        .ok_or(Error::InvalidUtxoTx("amount overflow"))?;
    let units = check_rate(&amount)?;
    check_rate(&fee)?;

    let keys = output_keys(sender_keys, destinations)?;
    let (outputs, rct_dests) = utxo_outputs(&keys, destinations)?;
    let (rv, mask_sum) = ringct::gen_rct_simple(Hash::zero(), &[], &rct_dests)?;

    let input = AccountInput {
        nonce,
        amount,
        cf: Key::from(mask_sum),
        commit: Key::from(commit(units, &mask_sum)),
    };
    let mut tx = UtxoTx::new(
        vec![Input::Account(input)],
        outputs,
        Key::from(keys.tx_keypair.public_key),
        keys.additional_public_keys().iter().map(Key::from).collect(),
        fee,
    );
    tx.sign(signer, key)?;
    tx.set_rct(strip_restorable(rv));

    debug!(
        "Built account funded utxo tx {} with {} outputs",
        tx.hash(),
        destinations.len()
    );
    Ok(tx)
}

/// Spends `sources` into confidential outputs and an optional account output
///
/// `account_key` signs the transaction for the account side, required when
/// calling a contract.
pub fn new_uin_transaction(
    sender_keys: &AccountKeys,
    sources: &[UtxoSource],
    destinations: &[UtxoDestination],
    account: Option<AccountDestination>,
    fee: U256,
    account_key: Option<(&Signer, &PrivateKey)>,
) -> Result<UtxoTx> {
    ensure!(!sources.is_empty(), Error::InvalidUtxoTx("no inputs"));
    ensure!(
        !destinations.is_empty() || account.is_some(),
        Error::InvalidUtxoTx("no outputs")
    );
    check_rate(&fee)?;

    let spent = total(sources.iter().map(|source| source.amount))?;
    let paid = total(
        destinations
            .iter()
            .map(|dest| dest.amount)
            .chain(account.iter().map(|acc| acc.amount))
            .chain(std::iter::once(fee)),
    )?;
    ensure!(spent == paid, Error::InvalidUtxoTx("inputs and outputs do not balance"));

    let mut inputs = Vec::with_capacity(sources.len());
    let mut secrets = Vec::with_capacity(sources.len());
    for source in sources {
        ensure!(
            source.real_index < source.ring.len(),
            Error::InvalidUtxoTx("real output is not in its ring")
        );
        ensure!(
            source.ring.windows(2).all(|pair| pair[0].index < pair[1].index),
            Error::InvalidUtxoTx("ring is not sorted")
        );
        let real = source.ring[source.real_index].key.dest.decompress()?;
        let indices: Vec<u64> = source.ring.iter().map(|member| member.index).collect();
        inputs.push(Input::Utxo(UtxoInput {
            key_offsets: relative_offsets(&indices),
            key_image: Key::from(key_image(&source.secret, &real)),
        }));
        secrets.push(InputSecret {
            ring: source.ring.iter().map(|member| member.key).collect(),
            real_index: source.real_index,
            secret: source.secret,
            mask: source.mask,
            amount: check_rate(&source.amount)?,
        });
    }

    let (mut outputs, rct_dests, r_key, add_keys) = if destinations.is_empty() {
        (Vec::new(), Vec::new(), KeyPair::generate().public_key, Vec::new())
    } else {
        let keys = output_keys(sender_keys, destinations)?;
        let (outputs, rct_dests) = utxo_outputs(&keys, destinations)?;
        (outputs, rct_dests, keys.tx_keypair.public_key, keys.additional_public_keys())
    };
    if let Some(account) = account {
        let units = check_rate(&account.amount)?;
        outputs.push(Output::Account(AccountOutput {
            to: account.to,
            amount: account.amount,
            data: account.data,
            commit: Key::from(commit_to_amount(units)),
        }));
    }

    let mut tx = UtxoTx::new(
        inputs,
        outputs,
        Key::from(r_key),
        add_keys.iter().map(Key::from).collect(),
        fee,
    );
    if let Some((signer, key)) = account_key {
        tx.sign(signer, key)?;
    }

    let (rv, _) = ringct::gen_rct_simple(tx.prefix_hash(), &secrets, &rct_dests)?;
    tx.set_rct(strip_restorable(rv));

    debug!(
        "Built utxo tx {} spending {} inputs",
        tx.hash(),
        sources.len()
    );
    Ok(tx)
}
