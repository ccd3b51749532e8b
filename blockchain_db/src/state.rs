use std::collections::HashMap;

use primitive_types::U256;

use crypto::Address;
use types::censor::State;
use types::params::native_token;

/// Account state held in maps
#[derive(Clone, Debug, Default)]
pub struct MemState {
    balances: HashMap<Address, U256>,
    token_balances: HashMap<(Address, Address), U256>,
    nonces: HashMap<Address, u64>,
    code: HashMap<Address, Vec<u8>>,
}

impl MemState {
    /// Creates an empty state
    pub fn new() -> Self {
        MemState::default()
    }

    /// Overwrites the native balance of `address`
    pub fn set_balance(&mut self, address: Address, amount: U256) {
        self.balances.insert(address, amount);
    }

    /// Overwrites the balance of `address` in `token`
    pub fn set_token_balance(&mut self, address: Address, token: Address, amount: U256) {
        if token == native_token() {
            self.set_balance(address, amount);
        } else {
            self.token_balances.insert((address, token), amount);
        }
    }

    /// Deploys `code` at `address`
    pub fn set_code(&mut self, address: Address, code: Vec<u8>) {
        self.code.insert(address, code);
    }
}

impl State for MemState {
    fn get_balance(&self, address: &Address) -> U256 {
        self.balances.get(address).copied().unwrap_or_default()
    }

    fn get_token_balance(&self, address: &Address, token: &Address) -> U256 {
        if *token == native_token() {
            return self.get_balance(address);
        }
        self.token_balances
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
        let balance = self.balances.entry(*address).or_default();
        *balance = balance.saturating_add(*amount);
    }

    fn sub_balance(&mut self, address: &Address, amount: &U256) {
        let balance = self.balances.entry(*address).or_default();
        *balance = balance.saturating_sub(*amount);
    }

    fn add_token_balance(&mut self, address: &Address, token: &Address, amount: &U256) {
        if *token == native_token() {
            return self.add_balance(address, amount);
        }
        let balance = self.token_balances.entry((*address, *token)).or_default();
        *balance = balance.saturating_add(*amount);
    }

    fn sub_token_balance(&mut self, address: &Address, token: &Address, amount: &U256) {
        if *token == native_token() {
            return self.sub_balance(address, amount);
        }
        let balance = self.token_balances.entry((*address, *token)).or_default();
        *balance = balance.saturating_sub(*amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_works() {
        let alice = Address::from_name(b"alice");
        let token = Address::from_name(b"token");
        let mut state = MemState::new();
        state.set_balance(alice, U256::from(10));
        state.set_token_balance(alice, token, U256::from(3));
        state.set_code(token, vec![0, 0x61, 0x73, 0x6d]);

        state.sub_balance(&alice, &U256::from(4));
        state.add_token_balance(&alice, &token, &U256::from(2));
        state.set_nonce(&alice, 7);

        assert_eq!(state.get_balance(&alice), U256::from(6));
        assert_eq!(state.get_token_balance(&alice, &native_token()), U256::from(6));
        assert_eq!(state.get_token_balance(&alice, &token), U256::from(5));
        assert_eq!(state.get_nonce(&alice), 7);
        assert!(state.is_contract(&token));
        assert!(!state.is_contract(&alice));
    }
}
