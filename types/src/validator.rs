//! Validators and validator sets

use std::collections::HashSet;

use ensure_macro::ensure;
use serde::{Deserialize, Serialize};

use codec::{Decodable, Encodable, Encoder, Rlp};
use crypto::{ed25519::PubKey, keccak, merkle, Address, Hash};

use crate::block::BlockId;
use crate::vote::{Commit, SignedMsgType};
use crate::{Error, Result};

/// A voting member of the consensus
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Validator {
    pub address: Address,
    #[serde(with = "typed_pub_key")]
    pub pub_key: PubKey,
    pub voting_power: u64,
    pub coinbase: Address,
}

impl Validator {
    pub fn new(pub_key: PubKey, voting_power: u64, coinbase: Address) -> Self {
        Validator {
            address: pub_key.address(),
            pub_key,
            voting_power,
            coinbase,
        }
    }

    pub fn hash(&self) -> Hash {
        keccak(codec::encode(self))
    }
}

impl Encodable for Validator {
    fn encode(&self, s: &mut Encoder) {
        s.begin_list()
            .append(&self.address)
            .append(&self.pub_key)
            .append(&self.voting_power)
            .append(&self.coinbase)
            .end_list();
    }
}

impl Decodable for Validator {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let validator = Validator {
            address: fields.next_val()?,
            pub_key: fields.next_val()?,
            voting_power: fields.next_val()?,
            coinbase: fields.next_val()?,
        };
        fields.finish()?;
        Ok(validator)
    }
}

/// Validators ordered by address
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ValidatorSet {
    validators: Vec<Validator>,
    total_voting_power: u64,
}

impl ValidatorSet {
    /// Sorts `validators` by address
    ///
    /// Later duplicates of an address are dropped.
    pub fn new(mut validators: Vec<Validator>) -> Self {
        validators.sort_by(|a, b| a.address.cmp(&b.address));
        validators.dedup_by(|a, b| a.address == b.address);
        let total_voting_power = validators
            .iter()
            .fold(0u64, |acc, v| acc.saturating_add(v.voting_power));
        ValidatorSet {
            validators,
            total_voting_power,
        }
    }

    pub fn size(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn total_voting_power(&self) -> u64 {
        self.total_voting_power
    }

    /// Smallest voting power that is more than two thirds of the total
    pub fn supermajority(&self) -> u64 {
        self.total_voting_power / 3 * 2 + (self.total_voting_power % 3) * 2 / 3 + 1
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    pub fn has_address(&self, address: &Address) -> bool {
        self.find_address(address).is_some()
    }

    /// Position and entry of `address`
    pub fn find_address(&self, address: &Address) -> Option<(usize, &Validator)> {
        self.validators
            .binary_search_by(|v| v.address.cmp(address))
            .ok()
            .map(|index| (index, &self.validators[index]))
    }

    pub fn get_by_index(&self, index: usize) -> Option<&Validator> {
        self.validators.get(index)
    }

    /// Merkle root over the validators' hashes
    pub fn hash(&self) -> Hash {
        let leaves: Vec<Hash> = self.validators.iter().map(Validator::hash).collect();
        merkle::hash_from_hashes(&leaves)
    }

    /// Checks that `commit` carries more than two thirds of the voting power
    /// for `block_id` at `height`
    pub fn verify_commit(
        &self,
        chain_id: &str,
        block_id: &BlockId,
        height: u64,
        commit: &Commit,
    ) -> Result<()> {
        ensure!(
            self.size() == commit.size(),
            Error::InvalidCommit(format!(
                "expected {} precommits, got {}",
                self.size(),
                commit.size()
            ))
        );
        ensure!(
            commit.height() == Some(height),
            Error::InvalidCommit(format!("expected height {}", height))
        );

        let round = commit.round();
        let mut tallied = 0u64;
        let mut seen = HashSet::new();
        for (index, precommit) in commit.precommits().iter().enumerate() {
            let precommit = match precommit {
                Some(precommit) => precommit,
                None => continue,
            };
            ensure!(
                precommit.vote_type == SignedMsgType::Precommit
                    && precommit.height == height
                    && Some(precommit.round) == round,
                Error::InvalidCommit(format!("precommit {} is out of place", index))
            );
            let validator = &self.validators[index];
            ensure!(
                precommit.validator_address == validator.address && seen.insert(validator.address),
                Error::InvalidCommit(format!("precommit {} is not from validator {}", index, validator.address))
            );
            precommit.verify(chain_id, &validator.pub_key)?;

            if precommit.block_id == *block_id {
                tallied = tallied.saturating_add(validator.voting_power);
            }
        }

        ensure!(
            tallied >= self.supermajority(),
            Error::InvalidCommit(format!(
                "insufficient voting power: got {}, needed {}",
                tallied,
                self.supermajority()
            ))
        );
        Ok(())
    }
}

impl Encodable for ValidatorSet {
    fn encode(&self, s: &mut Encoder) {
        s.append_list(&self.validators);
    }
}

impl Decodable for ValidatorSet {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        Ok(ValidatorSet::new(rlp.as_list()?))
    }
}

/// Serde helper writing public keys as `{"type": "ed25519", "value": hex}`
pub mod typed_pub_key {
    use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

    use crypto::ed25519::{PubKey, KEY_TYPE};

    #[derive(Serialize, Deserialize)]
    struct TypedKey {
        #[serde(rename = "type")]
        key_type: String,
        value: PubKey,
    }

    pub fn serialize<S: Serializer>(key: &PubKey, serializer: S) -> Result<S::Ok, S::Error> {
        TypedKey {
            key_type: KEY_TYPE.to_string(),
            value: *key,
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PubKey, D::Error> {
        let typed = TypedKey::deserialize(deserializer)?;
        if typed.key_type != KEY_TYPE {
            return Err(D::Error::custom(format!("unsupported key type {}", typed.key_type)));
        }
        Ok(typed.value)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crypto::ed25519::PrivKey;

    /// `n` validators of power one with their keys, in set order
    pub(crate) fn validators(n: usize) -> (ValidatorSet, Vec<PrivKey>) {
        let mut keys: Vec<PrivKey> = (0..n).map(|_| PrivKey::generate()).collect();
        keys.sort_by(|a, b| a.pub_key().address().cmp(&b.pub_key().address()));
        let set = ValidatorSet::new(
            keys.iter()
                .map(|key| Validator::new(key.pub_key(), 1, Address::default()))
                .collect(),
        );
        (set, keys)
    }

    #[test]
    fn it_orders_by_address() {
        let (set, keys) = validators(5);
        assert_eq!(set.size(), 5);
        assert_eq!(set.total_voting_power(), 5);
        for (i, key) in keys.iter().enumerate() {
            let (index, validator) = set.find_address(&key.pub_key().address()).unwrap();
            assert_eq!(index, i);
            assert_eq!(validator.pub_key, key.pub_key());
        }
        assert!(!set.has_address(&Address::from_name(b"nobody")));
    }

    #[test]
    fn it_computes_supermajorities() {
        assert_eq!(validators(10).0.supermajority(), 7);
        assert_eq!(validators(3).0.supermajority(), 3);
        assert_eq!(validators(4).0.supermajority(), 3);
        assert_eq!(validators(1).0.supermajority(), 1);
    }

    #[test]
    fn it_hashes_the_member_list() {
        let (set, _) = validators(3);
        let decoded: ValidatorSet = codec::decode(&codec::encode(&set)).unwrap();
        assert_eq!(decoded, set);
        assert_eq!(decoded.hash(), set.hash());
        assert_ne!(set.hash(), ValidatorSet::default().hash());
    }

    #[test]
    fn it_writes_typed_keys() {
        let validator = Validator::new(PrivKey::generate().pub_key(), 10, Address::from_name(b"cb"));
        let json = serde_json::to_value(&validator).unwrap();
        assert_eq!(json["pub_key"]["type"], "ed25519");
        let back: Validator = serde_json::from_value(json).unwrap();
        assert_eq!(back, validator);
    }
}
