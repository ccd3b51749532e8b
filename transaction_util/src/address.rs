//! Module for handling addresses
//!
//! The string form is the hex encoding of a one byte type prefix, the spend
//! and view public keys and the first four bytes of their Keccak digest.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crypto::{keccak, Key, PublicKey};

const PREFIX_STANDARD: u8 = 0x12;
const PREFIX_SUBADDRESS: u8 = 0x2a;
const CHECKSUM_LEN: usize = 4;
const ADDRESS_LEN: usize = 1 + 32 + 32 + CHECKSUM_LEN;

/// Tags for each type of address
#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Debug)]
pub enum AddressType {
    /// Standard address
    Standard,
    /// Subaddress
    SubAddress,
}

impl Default for AddressType {
    fn default() -> Self {
        AddressType::Standard
    }
}

/// Wrapper for the set of public keys in an address
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StealthAddress {
    /// Type of address
    pub address_type: AddressType,
    /// Public spend key
    pub spend_public_key: PublicKey,
    /// Public view key
    pub view_public_key: PublicKey,
}

/// Error type for Address operations
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// Returned when the address is not valid hex or has the wrong length
    #[error("Invalid address encoding")]
    InvalidEncoding,

    /// Returned when the address prefix is invalid
    #[error("Invalid address prefix")]
    InvalidPrefix,

    /// Returned when the checksum does not match the keys
    #[error("Invalid address checksum")]
    InvalidChecksum,

    /// Returned when a key is not a curve point
    #[error("Invalid address key")]
    InvalidKey,
}

impl StealthAddress {
    /// Generate the standard address from the given public keys
    pub fn standard(spend_public_key: PublicKey, view_public_key: PublicKey) -> Self {
        StealthAddress {
            address_type: AddressType::Standard,
            spend_public_key,
            view_public_key,
        }
    }

    /// Generate a subaddress from the given public keys
    pub fn subaddress(spend_public_key: PublicKey, view_public_key: PublicKey) -> Self {
        StealthAddress {
            address_type: AddressType::SubAddress,
            spend_public_key,
            view_public_key,
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(ADDRESS_LEN);
        data.push(match self.address_type {
            AddressType::Standard => PREFIX_STANDARD,
            AddressType::SubAddress => PREFIX_SUBADDRESS,
        });
        data.extend_from_slice(self.spend_public_key.compress().as_bytes());
        data.extend_from_slice(self.view_public_key.compress().as_bytes());
        let checksum = keccak(&data);
        data.extend_from_slice(&checksum.as_bytes()[..CHECKSUM_LEN]);
        data
    }
}

impl fmt::Display for StealthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_bytes()))
    }
}

impl FromStr for StealthAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let data = hex::decode(s).map_err(|_| Error::InvalidEncoding)?;
        if data.len() != ADDRESS_LEN {
            return Err(Error::InvalidEncoding);
        }

        let (body, checksum) = data.split_at(ADDRESS_LEN - CHECKSUM_LEN);
        if &keccak(body).as_bytes()[..CHECKSUM_LEN] != checksum {
            return Err(Error::InvalidChecksum);
        }

        let address_type = match body[0] {
            PREFIX_STANDARD => AddressType::Standard,
            PREFIX_SUBADDRESS => AddressType::SubAddress,
            _ => return Err(Error::InvalidPrefix),
        };
        let key = |bytes: &[u8]| {
            Key::from_slice(bytes)
                .and_then(|key| key.decompress())
                .map_err(|_| Error::InvalidKey)
        };

        Ok(StealthAddress {
            address_type,
            spend_public_key: key(&body[1..33])?,
            view_public_key: key(&body[33..65])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AccountKeys;

    #[test]
    fn it_parses_its_own_string_form() {
        let address = AccountKeys::generate().address();
        let string = address.to_string();
        assert_eq!(string.len(), ADDRESS_LEN * 2);
        assert_eq!(string.parse::<StealthAddress>().unwrap(), address);
    }

    #[test]
    fn it_detects_typos() {
        let mut string = AccountKeys::generate().address().to_string();
        let last = if string.ends_with('0') { "1" } else { "0" };
        string.replace_range(string.len() - 1.., last);
        assert_eq!(
            string.parse::<StealthAddress>(),
            Err(Error::InvalidChecksum)
        );
        assert_eq!("12ab".parse::<StealthAddress>(), Err(Error::InvalidEncoding));
    }
}
