//! Gas rules for transfers

use ensure_macro::ensure;
use primitive_types::U256;

use crate::params::{
    lianke, min_gas_used, EVER_LIANKE_FEE, GAS_PRICE, MAX_GAS_LIMIT, MIN_GAS_LIMIT, TX_DATA_NON_ZERO_GAS,
    TX_DATA_ZERO_GAS, TX_GAS, TX_GAS_CONTRACT_CREATION,
};
use crate::{Error, Result};

/// Gas owed for moving `value`
///
/// Every started lianke costs `fee_rule` gas, clamped to
/// `[MIN_GAS_LIMIT, MAX_GAS_LIMIT]`.
pub fn cal_new_amount_gas(value: &U256, fee_rule: u64) -> u64 {
    let (mut liankes, rem) = value.div_mod(lianke());
    if !rem.is_zero() {
        liankes += U256::one();
    }
    let gas = liankes.saturating_mul(U256::from(fee_rule));
    if gas < U256::from(MIN_GAS_LIMIT) {
        MIN_GAS_LIMIT
    } else if gas > U256::from(MAX_GAS_LIMIT) {
        MAX_GAS_LIMIT
    } else {
        gas.low_u64()
    }
}

fn transfer_cost(amount: &U256) -> U256 {
    *amount + U256::from(GAS_PRICE) * U256::from(cal_new_amount_gas(amount, EVER_LIANKE_FEE))
}

/// Splits a whole balance into the largest sendable amount and its fee
///
/// Returns `(amount, change, gas)` with
/// `balance == amount + change + GAS_PRICE * gas`. The change is whatever the
/// gas step function leaves over and is zero for most balances.
pub fn cal_sweep_balance_fee(balance: &U256) -> Result<(U256, U256, u64)> {
    ensure!(*balance > min_gas_used(), Error::InsufficientFunds);

    let (mut low, mut high) = (U256::zero(), *balance);
    while low < high {
        let mid = low + (high - low + 1) / 2;
        if transfer_cost(&mid) <= *balance {
            low = mid;
        } else {
            high = mid - 1;
        }
    }

    let gas = cal_new_amount_gas(&low, EVER_LIANKE_FEE);
    let change = *balance - transfer_cost(&low);
    Ok((low, change, gas))
}

/// Gas consumed before any execution
///
/// A base charge plus a charge per zero and non-zero payload byte.
pub fn intrinsic_gas(data: &[u8], contract_creation: bool) -> Result<u64> {
    let mut gas = if contract_creation {
        TX_GAS_CONTRACT_CREATION
    } else {
        TX_GAS
    };
    if data.is_empty() {
        return Ok(gas);
    }

    let non_zero = data.iter().filter(|b| **b != 0).count() as u64;
    ensure!(
        (u64::max_value() - gas) / TX_DATA_NON_ZERO_GAS >= non_zero,
        Error::OutOfGas
    );
    gas += non_zero * TX_DATA_NON_ZERO_GAS;

    let zero = data.len() as u64 - non_zero;
    ensure!(
        (u64::max_value() - gas) / TX_DATA_ZERO_GAS >= zero,
        Error::OutOfGas
    );
    gas += zero * TX_DATA_ZERO_GAS;

    Ok(gas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::EVER_CONTRACT_LIANKE_FEE;

    fn ether(n: u64) -> U256 {
        lianke() * U256::from(n)
    }

    #[test]
    fn it_clamps_amount_gas() {
        assert_eq!(cal_new_amount_gas(&U256::zero(), EVER_LIANKE_FEE), MIN_GAS_LIMIT);
        assert_eq!(cal_new_amount_gas(&ether(1), EVER_LIANKE_FEE), MIN_GAS_LIMIT);
        assert_eq!(cal_new_amount_gas(&ether(20), EVER_LIANKE_FEE), 1_000_000);
        assert_eq!(
            cal_new_amount_gas(&(ether(20) + U256::one()), EVER_LIANKE_FEE),
            1_050_000
        );
        assert_eq!(cal_new_amount_gas(&ether(40), EVER_CONTRACT_LIANKE_FEE), 1_000_000);
        assert_eq!(cal_new_amount_gas(&U256::max_value(), EVER_LIANKE_FEE), MAX_GAS_LIMIT);
    }

    #[test]
    fn it_sweeps_balances() {
        let balance = ether(1);
        let (amount, change, gas) = cal_sweep_balance_fee(&balance).unwrap();
        assert_eq!(gas, MIN_GAS_LIMIT);
        assert_eq!(change, U256::zero());
        assert_eq!(amount, balance - min_gas_used());

        let balance = ether(10) + U256::from(GAS_PRICE) * U256::from(MIN_GAS_LIMIT) + U256::one();
        let (amount, change, gas) = cal_sweep_balance_fee(&balance).unwrap();
        assert_eq!(
            amount + change + U256::from(GAS_PRICE) * U256::from(gas),
            balance
        );
        assert_eq!(gas, cal_new_amount_gas(&amount, EVER_LIANKE_FEE));
    }

    #[test]
    fn it_refuses_to_sweep_dust() {
        assert_eq!(
            cal_sweep_balance_fee(&min_gas_used()),
            Err(Error::InsufficientFunds)
        );
    }

    #[test]
    fn it_counts_intrinsic_gas() {
        assert_eq!(intrinsic_gas(&[], false).unwrap(), 21_000);
        assert_eq!(intrinsic_gas(&[], true).unwrap(), 53_000);
        assert_eq!(intrinsic_gas(&[0, 1, 0, 2], false).unwrap(), 21_000 + 2 * 68 + 2 * 4);
    }
}
