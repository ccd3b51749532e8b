//! Chain wide constants

use crypto::Address;
use primitive_types::U256;

/// The only gas price accepted by admission
pub const GAS_PRICE: u64 = 100_000_000_000;
/// Number of gas price units in one lianke
pub const GAS_TO_LIANKE_RATE: u64 = 10_000_000;
pub const MIN_GAS_LIMIT: u64 = 500_000;
pub const MAX_GAS_LIMIT: u64 = 5_000_000_000;

/// Gas charged per started lianke of a plain transfer
pub const EVER_LIANKE_FEE: u64 = 50_000;
/// Gas charged per started lianke sent to a contract
pub const EVER_CONTRACT_LIANKE_FEE: u64 = 25_000;

/// Gas limit reported by administrative transactions
pub const PAR_GAS_LIMIT: u64 = 100_000;

pub const MAX_PURE_TRANSACTION_SIZE: usize = 32 * 1024;
pub const MAX_WASM_TRANSACTION_SIZE: usize = 256 * 1024;

/// Intrinsic gas of a call
pub const TX_GAS: u64 = 21_000;
/// Intrinsic gas of a contract creation
pub const TX_GAS_CONTRACT_CREATION: u64 = 53_000;
pub const TX_DATA_ZERO_GAS: u64 = 4;
pub const TX_DATA_NON_ZERO_GAS: u64 = 68;

/// Smallest unit a confidential amount can express
pub const UTXO_COMMITMENT_CHANGE_RATE: u64 = 10_000_000_000;
/// Ring size that selects the single member ring signature
pub const SHORT_RING_MEMBER_NUM: usize = 1;
/// Default gas charged for confidential outputs
pub const DEFAULT_UTXO_GAS: u64 = 500_000;

pub const PUB_NET_SIGN_PARAM: u64 = 29153;
pub const TEST_NET_SIGN_PARAM: u64 = 29154;

/// Leading bytes of a wasm module
pub const WASM_MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6d];

/// `GAS_PRICE * GAS_TO_LIANKE_RATE`, 1e18
pub fn lianke() -> U256 {
    U256::from(GAS_PRICE) * U256::from(GAS_TO_LIANKE_RATE)
}

/// Cheapest possible fee of any transfer
pub fn min_gas_used() -> U256 {
    U256::from(GAS_PRICE) * U256::from(MIN_GAS_LIMIT)
}

/// Token id of the chain's own coin
pub fn native_token() -> Address {
    Address::default()
}

/// Reserved account holding the nonce of signer set proposals
pub fn multi_sign_admin() -> Address {
    Address::from_name(b"mst")
}

/// Payload is a wasm module
pub fn is_wasm(payload: &[u8]) -> bool {
    payload.len() >= WASM_MAGIC.len() && payload[..WASM_MAGIC.len()] == WASM_MAGIC
}
