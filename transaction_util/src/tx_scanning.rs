//! Module for scanning transactions

use ensure_macro::ensure;

use crypto::{ecc::Scalar, Key, PublicKey, SecretKey};
use ringct::EcdhTuple;

use crate::{
    account_keys::AccountKeys,
    derivation::Derivation,
    subaddress::{self, SubAddressIndex},
    tx_construction::mask_remark,
};

/// An output recognised as ours
#[derive(Clone, Debug)]
pub struct OwnedOutput {
    /// Subaddress the output was paid to
    pub subaddress_index: SubAddressIndex,
    /// Secret key spending the output
    pub secret_key: SecretKey,
    /// `H_s(aR || idx)`, decrypts the amount and the remark
    pub shared_secret: Scalar,
}

/// Error type for decoding owned outputs
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// Returned when the decoded mask and amount do not open the commitment
    #[error("Decoded amount does not match the output commitment")]
    CommitmentMismatch,

    /// Returned when the commitment or the tuple is malformed
    #[error(transparent)]
    RingCT(#[from] ringct::Error),
}

/// Computes the output secret key needed for spending the given output
///
/// Returns the output secret key H_s(aR || idx) (=H_s(arG || idx)) if it indeed is towards the account given
pub fn get_output_secret_key(
    account_keys: &AccountKeys,
    subaddress_index: &SubAddressIndex,
    tx_output_index: u64,
    output_key: PublicKey,
    tx_public_keys: &[PublicKey],
) -> Option<SecretKey> {
    scan_output(
        account_keys,
        &[*subaddress_index],
        tx_output_index,
        &output_key,
        tx_public_keys,
    )
    .map(|owned| owned.secret_key)
}

/// Checks whether an output pays any of the given subaddresses
pub fn scan_output(
    account_keys: &AccountKeys,
    subaddress_indices: &[SubAddressIndex],
    tx_output_index: u64,
    output_key: &PublicKey,
    tx_public_keys: &[PublicKey],
) -> Option<OwnedOutput> {
    let addresses: Vec<_> = subaddress_indices
        .iter()
        .map(|index| (index, subaddress::get_address_for_index(account_keys, index)))
        .collect();

    for tx_public_key in tx_public_keys {
        let derivation = Derivation::from(&account_keys.view_keypair.secret_key, tx_public_key)?;
        let derivation_scalar = derivation.to_scalar(tx_output_index);

        let target_public_key = output_key - (&derivation_scalar * &crypto::ecc::BASEPOINT_TABLE);

        for (index, address) in &addresses {
            if target_public_key != address.spend_public_key {
                continue;
            }

            let mut output_secret_key = derivation_scalar + account_keys.spend_keypair.secret_key;
            if **index != SubAddressIndex::MAIN {
                // Subaddresses require an extra addition for the subaddress secret key
                // H_s(aR) + b + m_i
                output_secret_key += subaddress::get_subaddress_secret_key(account_keys, index)
            };

            return Some(OwnedOutput {
                subaddress_index: **index,
                secret_key: output_secret_key,
                shared_secret: derivation_scalar,
            });
        }
    }

    None
}

impl OwnedOutput {
    /// Decodes the mask and scaled amount of the output and checks them
    /// against its commitment
    pub fn decode_amount(&self, ecdh: &EcdhTuple, commitment: &Key) -> Result<(Scalar, u64), Error> {
        let (mask, amount) = ringct::ecdh_decode(ecdh, &self.shared_secret)?;
        ensure!(
            Key::from(ringct::commit(amount, &mask)) == *commitment,
            Error::CommitmentMismatch
        );
        Ok((mask, amount))
    }

    /// Removes the mask from the output's remark
    pub fn unmask_remark(&self, remark: &[u8; 32]) -> [u8; 32] {
        mask_remark(remark, &self.shared_secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx_construction::{generate_output_keys, TxDestinationType};
    use crypto::KeyPair;

    #[test]
    fn it_decodes_owned_outputs() {
        let sender = AccountKeys::generate();
        let receiver = AccountKeys::generate();
        let keys = generate_output_keys(
            &sender,
            &[TxDestinationType::PayToAddress(receiver.address())],
        )
        .unwrap();
        let output = &keys.outputs[0];

        let mask = KeyPair::generate().secret_key;
        let ecdh = ringct::ecdh_encode(&mask, 42, &output.shared_secret);
        let commitment = Key::from(ringct::commit(42, &mask));
        let remark = mask_remark(&[9u8; 32], &output.shared_secret);

        let owned = scan_output(
            &receiver,
            &[SubAddressIndex(0, 1), SubAddressIndex::MAIN],
            0,
            &output.one_time_key,
            &[keys.tx_keypair.public_key],
        )
        .unwrap();
        assert_eq!(owned.subaddress_index, SubAddressIndex::MAIN);
        assert_eq!(owned.decode_amount(&ecdh, &commitment).unwrap(), (mask, 42));
        assert_eq!(owned.unmask_remark(&remark), [9u8; 32]);

        let other = Key::from(ringct::commit(43, &mask));
        assert_eq!(
            owned.decode_amount(&ecdh, &other),
            Err(Error::CommitmentMismatch)
        );
    }
}
