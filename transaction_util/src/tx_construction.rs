//! Module for deriving the keys of new confidential outputs

use ensure_macro::ensure;
use log::debug;

use crypto::{
    ecc::{hash_to_point, Scalar},
    hash::sha256,
    KeyImage, KeyPair, PublicKey,
};

use crate::{
    account_keys::AccountKeys, address::AddressType, derivation::Derivation, subaddress,
    tx_scanning, StealthAddress, SubAddressIndex,
};

/// Error type for output key construction
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// Returned when there are no transaction destinations
    #[error("No transaction destinations")]
    NoDestinations,

    /// Returned when a key derivation could not be computed
    #[error("Key derivation failed")]
    KeyDerivation,
}

type Result<T> = std::result::Result<T, Error>;

/// Destination type
#[derive(Clone, Debug)]
pub enum TxDestinationType {
    /// Output amount is towards another address
    PayToAddress(StealthAddress),
    /// Output amount is to be sent back to us as change
    Change(SubAddressIndex),
}

/// Keys of one new output
#[derive(Clone, Debug)]
pub struct OutputKeys {
    /// One-time public key `H_s(rA || idx)G + B`
    pub one_time_key: PublicKey,
    /// `H_s(rA || idx)`, shared with the recipient
    pub shared_secret: Scalar,
}

/// Transaction keys and the per output keys derived from them
#[derive(Clone, Debug)]
pub struct TxKeys {
    /// Main transaction keypair `(r, R)`
    pub tx_keypair: KeyPair,
    /// One keypair per output, present when subaddresses need them
    pub additional_keypairs: Vec<KeyPair>,
    /// Keys of every output in destination order
    pub outputs: Vec<OutputKeys>,
}

impl TxKeys {
    /// The public keys published with the transaction
    pub fn additional_public_keys(&self) -> Vec<PublicKey> {
        self.additional_keypairs
            .iter()
            .map(|kp| kp.public_key)
            .collect()
    }
}

/// Derives a transaction keypair and the one-time key of every destination
pub fn generate_output_keys(
    sender_keys: &AccountKeys,
    destinations: &[TxDestinationType],
) -> Result<TxKeys> {
    ensure!(!destinations.is_empty(), Error::NoDestinations);

    // Classify our destinations
    let mut num_standard = 0;
    let mut num_subaddr = 0;
    for dest in destinations {
        // Ignore change addresses. They pay to the sender
        if let TxDestinationType::PayToAddress(address) = dest {
            match address.address_type {
                AddressType::Standard => num_standard += 1,
                AddressType::SubAddress => num_subaddr += 1,
            }
        }
    }

    // Create the transaction keypair (r, R = rG)
    //
    // If the payment is towards one or more standard addresses or a single subaddress
    // this is the only keypair needed
    let mut tx_keypair = KeyPair::generate();

    if num_standard == 0 && num_subaddr == 1 {
        // If we have a single subaddress destination, set the transaction public key to rD
        let dest_addr = destinations.iter().find_map(|dest| match dest {
            TxDestinationType::PayToAddress(address)
                if address.address_type == AddressType::SubAddress =>
            {
                Some(address)
            }
            _ => None,
        });
        if let Some(address) = dest_addr {
            tx_keypair.public_key = tx_keypair.secret_key * address.spend_public_key;
        }
    }

    // More than one key is needed when there are multiple subaddress destinations (ignoring change)
    // or a subaddress along with a standard address
    let need_additional_tx_keypairs = num_subaddr > 0 && (num_standard > 0 || num_subaddr > 1);
    let mut additional_keypairs = Vec::new();
    let mut outputs = Vec::with_capacity(destinations.len());

    for (output_index, dest) in destinations.iter().enumerate() {
        let destination_address = match dest {
            TxDestinationType::Change(subaddress_index) => {
                subaddress::get_address_for_index(sender_keys, subaddress_index)
            }
            TxDestinationType::PayToAddress(address) => address.clone(),
        };

        let additional_tx_keypair = if need_additional_tx_keypairs {
            // Each additional keypair is generated as before, as (r, R = rG)
            let mut kp = KeyPair::generate();
            if destination_address.address_type == AddressType::SubAddress {
                // Change the public key to rD
                kp.public_key = kp.secret_key * destination_address.spend_public_key;
            }
            additional_keypairs.push(kp.clone());
            Some(kp)
        } else {
            None
        };

        let derivation = match dest {
            TxDestinationType::Change(_) => {
                // Change to ourselves, aR = arG
                Derivation::from(&sender_keys.view_keypair.secret_key, &tx_keypair.public_key)
            }
            TxDestinationType::PayToAddress(address) => {
                // Paying a different address, rA
                let secret_key = match &additional_tx_keypair {
                    Some(kp) if address.address_type == AddressType::SubAddress => kp.secret_key,
                    _ => tx_keypair.secret_key,
                };

                Derivation::from(&secret_key, &address.view_public_key)
            }
        }
        .ok_or(Error::KeyDerivation)?;

        // Generate the target keypair
        // (H_s(rA || idx), H_s(rA || idx)G + B)
        // This is derivable by both receiver and sender
        let target_keypair =
            derivation.to_keypair(output_index as u64, destination_address.spend_public_key);

        outputs.push(OutputKeys {
            one_time_key: target_keypair.public_key,
            shared_secret: target_keypair.secret_key,
        });
    }

    debug!(
        "Derived {} output keys ({} additional tx keys)",
        outputs.len(),
        additional_keypairs.len()
    );

    Ok(TxKeys {
        tx_keypair,
        additional_keypairs,
        outputs,
    })
}

/// XORs a remark with `SHA-256(shared_secret)`
///
/// Applying the mask twice restores the remark.
pub fn mask_remark(remark: &[u8; 32], shared_secret: &Scalar) -> [u8; 32] {
    let mask = sha256(shared_secret.as_bytes());
    let mut masked = [0u8; 32];
    for (out, (r, m)) in masked.iter_mut().zip(remark.iter().zip(mask.as_bytes())) {
        *out = r ^ m;
    }
    masked
}

/// Generates a key image for an owned output
///
/// The key image is a tag used to prevent double spends of a transaction input.
/// Returns `None` when the output does not belong to the account.
pub fn generate_key_image(
    account_keys: &AccountKeys,
    subaddress_index: &SubAddressIndex,
    output_index: u64,
    output_key: &PublicKey,
    tx_public_keys: &[PublicKey],
) -> Option<(KeyImage, KeyPair)> {
    // x = H_s(arG || idx) + b
    let output_secret_key = tx_scanning::get_output_secret_key(
        account_keys,
        subaddress_index,
        output_index,
        *output_key,
        tx_public_keys,
    )?;

    // Generate the ephemeral keypair for this output (x, X = xG)
    let ephemeral_keypair = KeyPair::from(output_secret_key);

    // Check if the ephemeral keypair matches the output key
    if ephemeral_keypair.public_key != *output_key {
        return None;
    }

    // KI = x * H_p(X)
    let key_image = ephemeral_keypair.secret_key
        * hash_to_point(ephemeral_keypair.public_key.compress().as_bytes());

    Some((key_image, ephemeral_keypair))
}

/// Converts absolute global output indices into the relative form stored on chain
pub fn relative_offsets(absolute: &[u64]) -> Vec<u64> {
    let mut last = 0;
    absolute
        .iter()
        .map(|pos| {
            let offset = pos - last;
            last = *pos;
            offset
        })
        .collect()
}

/// Converts relative offsets back into absolute indices, `None` on overflow
pub fn absolute_offsets(relative: &[u64]) -> Option<Vec<u64>> {
    let mut acc: u64 = 0;
    relative
        .iter()
        .map(|offset| {
            acc = acc.checked_add(*offset)?;
            Some(acc)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx_scanning::scan_output;

    #[test]
    fn it_pays_standard_addresses() {
        let sender = AccountKeys::generate();
        let receiver = AccountKeys::generate();
        let destinations = vec![
            TxDestinationType::PayToAddress(receiver.address()),
            TxDestinationType::Change(SubAddressIndex::MAIN),
        ];

        let keys = generate_output_keys(&sender, &destinations).unwrap();
        assert!(keys.additional_keypairs.is_empty());

        let tx_public_keys = [keys.tx_keypair.public_key];
        let found = scan_output(
            &receiver,
            &[SubAddressIndex::MAIN],
            0,
            &keys.outputs[0].one_time_key,
            &tx_public_keys,
        )
        .unwrap();
        assert_eq!(found.shared_secret, keys.outputs[0].shared_secret);

        // The change output belongs to the sender only
        assert!(scan_output(
            &receiver,
            &[SubAddressIndex::MAIN],
            1,
            &keys.outputs[1].one_time_key,
            &tx_public_keys
        )
        .is_none());
        assert!(scan_output(
            &sender,
            &[SubAddressIndex::MAIN],
            1,
            &keys.outputs[1].one_time_key,
            &tx_public_keys
        )
        .is_some());
    }

    #[test]
    fn it_pays_subaddresses() {
        let sender = AccountKeys::generate();
        let receiver = AccountKeys::generate();
        let index = SubAddressIndex(0, 3);
        let subaddress = subaddress::get_address_for_index(&receiver, &index);
        let destinations = vec![
            TxDestinationType::PayToAddress(subaddress),
            TxDestinationType::PayToAddress(AccountKeys::generate().address()),
        ];

        let keys = generate_output_keys(&sender, &destinations).unwrap();
        assert_eq!(keys.additional_keypairs.len(), 2);

        let mut tx_public_keys = vec![keys.tx_keypair.public_key];
        tx_public_keys.push(keys.additional_public_keys()[0]);

        let (key_image, keypair) = generate_key_image(
            &receiver,
            &index,
            0,
            &keys.outputs[0].one_time_key,
            &tx_public_keys,
        )
        .unwrap();
        assert_eq!(keypair.public_key, keys.outputs[0].one_time_key);
        assert_eq!(key_image, keypair.key_image());
    }

    #[test]
    fn it_masks_remarks() {
        let secret = KeyPair::generate().secret_key;
        let remark = [7u8; 32];
        let masked = mask_remark(&remark, &secret);
        assert_ne!(masked, remark);
        assert_eq!(mask_remark(&masked, &secret), remark);
    }

    #[test]
    fn it_converts_offsets() {
        let absolute = vec![3, 10, 11, 40];
        let relative = relative_offsets(&absolute);
        assert_eq!(relative, vec![3, 7, 1, 29]);
        assert_eq!(absolute_offsets(&relative), Some(absolute));
        assert_eq!(absolute_offsets(&[u64::max_value(), 1]), None);
    }
}
