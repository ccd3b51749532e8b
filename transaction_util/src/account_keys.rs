use serde::{Deserialize, Serialize};

use crypto::{keccak, KeyPair, ScalarExt, SecretKey};

use crate::StealthAddress;

#[derive(Clone, Debug, Deserialize, Serialize)]
/// A combination of a view and spend keypair which is used to create and recognize transactions
pub struct AccountKeys {
    /// Spend keypair
    pub spend_keypair: KeyPair,
    /// View keypair
    pub view_keypair: KeyPair,
}

/// Deterministic keypair generation
///
/// The view secret key is derived by taking the Keccak hash of the spend secret key
impl From<SecretKey> for AccountKeys {
    fn from(spend_secret_key: SecretKey) -> AccountKeys {
        let view_secret_key = SecretKey::from_keccak_hash(&keccak(spend_secret_key.as_bytes()));

        AccountKeys {
            spend_keypair: KeyPair::from(spend_secret_key),
            view_keypair: KeyPair::from(view_secret_key),
        }
    }
}

impl AccountKeys {
    /// Generate an account keypair with distinct view and secret keys
    pub fn from_non_deterministic_keys(
        spend_secret_key: SecretKey,
        view_secret_key: SecretKey,
    ) -> AccountKeys {
        AccountKeys {
            spend_keypair: KeyPair::from(spend_secret_key),
            view_keypair: KeyPair::from(view_secret_key),
        }
    }

    /// Generates a fresh account
    pub fn generate() -> AccountKeys {
        AccountKeys::from(KeyPair::generate().secret_key)
    }

    /// The main (standard) address of this account
    pub fn address(&self) -> StealthAddress {
        StealthAddress::standard(self.spend_keypair.public_key, self.view_keypair.public_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_derives_the_view_key() {
        let keys = AccountKeys::generate();
        let again = AccountKeys::from(keys.spend_keypair.secret_key);
        assert_eq!(again.view_keypair.secret_key, keys.view_keypair.secret_key);
        assert_ne!(keys.view_keypair.secret_key, keys.spend_keypair.secret_key);
    }
}
