//! Module for handling subaddresses

use byteorder::ByteOrder;
use serde::{Deserialize, Serialize};

use crate::{AccountKeys, StealthAddress};
use crypto::SecretKey;

/// Tuple of (major, minor) index for a subaddress
#[derive(Debug, Eq, Clone, Copy, Hash, PartialEq, Serialize, Deserialize)]
pub struct SubAddressIndex(pub u32, pub u32);

impl SubAddressIndex {
    /// Index of the main address
    pub const MAIN: SubAddressIndex = SubAddressIndex(0, 0);
}

/// Get the address at a given index from the current wallet
pub fn get_address_for_index(account_keys: &AccountKeys, index: &SubAddressIndex) -> StealthAddress {
    if index == &SubAddressIndex::MAIN {
        return account_keys.address();
    }
    // Subaddress secret key
    let subaddress_secret_key = get_subaddress_secret_key(account_keys, &index);
    let subaddress_public_key = &subaddress_secret_key * &crypto::ecc::BASEPOINT_TABLE;

    // Subaddress spend public key
    let spend_public_key = account_keys.spend_keypair.public_key + subaddress_public_key;

    // Subaddress view public key
    let view_public_key = account_keys.view_keypair.secret_key * spend_public_key;

    StealthAddress::subaddress(spend_public_key, view_public_key)
}

/// Get the secret key used in generating a subaddress in the given index
pub fn get_subaddress_secret_key(
    account_keys: &AccountKeys,
    SubAddressIndex(major, minor): &SubAddressIndex,
) -> SecretKey {
    // m = H_s("SubAddr" | a | major | minor)
    // Length of buffer = length("SubAddr\0") + length(public_key) + 2 * length(u32)
    //                  = 8 + 32 + 8 = 48
    let mut buffer = [0; 48];

    // SubAddr
    buffer[..8].copy_from_slice(b"SubAddr\0");
    // View secret key
    buffer[8..40].copy_from_slice(account_keys.view_keypair.secret_key.as_bytes());
    // Major index
    byteorder::LittleEndian::write_u32(&mut buffer[40..44], *major);
    // Minor index
    byteorder::LittleEndian::write_u32(&mut buffer[44..48], *minor);

    crypto::ecc::hash_to_scalar(&buffer[..])
}
