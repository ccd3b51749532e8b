//! Votes, proposals and commits
//!
//! Validators sign the canonical encoding
//! `[type, height, round, block_id, timestamp, chain_id]` of a vote;
//! proposals add their proof-of-lock round after the round.

use ensure_macro::ensure;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use codec::{Decodable, Encodable, Encoder, Rlp};
use crypto::{
    ed25519::{PubKey, Signature},
    keccak, merkle, Address, Hash,
};

use crate::bit_array::BitArray;
use crate::block::BlockId;
use crate::{Error, Result};

/// Step of the consensus a signature belongs to
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum SignedMsgType {
    Prevote = 0x01,
    Precommit = 0x02,
    Proposal = 0x20,
}

impl Encodable for SignedMsgType {
    fn encode(&self, s: &mut Encoder) {
        s.append(&(*self as u8));
    }
}

impl Decodable for SignedMsgType {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        match rlp.as_val::<u8>()? {
            0x01 => Ok(SignedMsgType::Prevote),
            0x02 => Ok(SignedMsgType::Precommit),
            0x20 => Ok(SignedMsgType::Proposal),
            _ => Err(codec::Error::InvalidValue("signed message type")),
        }
    }
}

/// The signed form of a vote
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CanonicalVote {
    pub vote_type: SignedMsgType,
    pub height: u64,
    pub round: u32,
    pub block_id: BlockId,
    pub timestamp: u64,
    pub chain_id: String,
}

impl Encodable for CanonicalVote {
    fn encode(&self, s: &mut Encoder) {
        s.begin_list()
            .append(&self.vote_type)
            .append(&self.height)
            .append(&self.round)
            .append(&self.block_id)
            .append(&self.timestamp)
            .append(&self.chain_id)
            .end_list();
    }
}

impl Decodable for CanonicalVote {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let vote = CanonicalVote {
            vote_type: fields.next_val()?,
            height: fields.next_val()?,
            round: fields.next_val()?,
            block_id: fields.next_val()?,
            timestamp: fields.next_val()?,
            chain_id: fields.next_val()?,
        };
        fields.finish()?;
        Ok(vote)
    }
}

/// A prevote or precommit
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Vote {
    pub vote_type: SignedMsgType,
    pub height: u64,
    pub round: u32,
    /// Milliseconds since the unix epoch
    pub timestamp: u64,
    pub block_id: BlockId,
    pub validator_address: Address,
    pub validator_index: u32,
    pub signature: Option<Signature>,
}

impl Vote {
    pub fn canonical(&self, chain_id: &str) -> CanonicalVote {
        CanonicalVote {
            vote_type: self.vote_type,
            height: self.height,
            round: self.round,
            block_id: self.block_id.clone(),
            timestamp: self.timestamp,
            chain_id: chain_id.to_string(),
        }
    }

    pub fn sign_bytes(&self, chain_id: &str) -> Vec<u8> {
        codec::encode(&self.canonical(chain_id))
    }

    pub fn hash(&self) -> Hash {
        keccak(codec::encode(self))
    }

    /// Checks the signature against the validator key `pub_key`
    pub fn verify(&self, chain_id: &str, pub_key: &PubKey) -> Result<()> {
        ensure!(
            pub_key.address() == self.validator_address,
            Error::InvalidVote("validator address does not match the key")
        );
        let signature = self
            .signature
            .as_ref()
            .ok_or(Error::InvalidVote("vote is not signed"))?;
        ensure!(
            pub_key.verify(&self.sign_bytes(chain_id), signature),
            Error::InvalidVote("invalid signature")
        );
        Ok(())
    }
}

impl Encodable for Vote {
    fn encode(&self, s: &mut Encoder) {
        s.begin_list()
            .append(&self.vote_type)
            .append(&self.height)
            .append(&self.round)
            .append(&self.timestamp)
            .append(&self.block_id)
            .append(&self.validator_address)
            .append(&self.validator_index)
            .append(&self.signature)
            .end_list();
    }
}

impl Decodable for Vote {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let vote = Vote {
            vote_type: fields.next_val()?,
            height: fields.next_val()?,
            round: fields.next_val()?,
            timestamp: fields.next_val()?,
            block_id: fields.next_val()?,
            validator_address: fields.next_val()?,
            validator_index: fields.next_val()?,
            signature: fields.next_val()?,
        };
        fields.finish()?;
        Ok(vote)
    }
}

/// The signed form of a proposal
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CanonicalProposal {
    pub height: u64,
    pub round: u32,
    pub pol_round: Option<u32>,
    pub block_id: BlockId,
    pub timestamp: u64,
    pub chain_id: String,
}

// The proof-of-lock round is written shifted by one so that "none" is zero
fn encode_pol_round(pol_round: Option<u32>) -> u64 {
    pol_round.map_or(0, |round| u64::from(round) + 1)
}

fn decode_pol_round(value: u64) -> codec::Result<Option<u32>> {
    match value {
        0 => Ok(None),
        v if v <= u64::from(u32::max_value()) + 1 => Ok(Some((v - 1) as u32)),
        _ => Err(codec::Error::InvalidValue("proof of lock round")),
    }
}

impl Encodable for CanonicalProposal {
    fn encode(&self, s: &mut Encoder) {
        s.begin_list()
            .append(&SignedMsgType::Proposal)
            .append(&self.height)
            .append(&self.round)
            .append(&encode_pol_round(self.pol_round))
            .append(&self.block_id)
            .append(&self.timestamp)
            .append(&self.chain_id)
            .end_list();
    }
}

impl Decodable for CanonicalProposal {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let msg_type: SignedMsgType = fields.next_val()?;
        ensure!(
            msg_type == SignedMsgType::Proposal,
            codec::Error::InvalidValue("expected a proposal")
        );
        let proposal = CanonicalProposal {
            height: fields.next_val()?,
            round: fields.next_val()?,
            pol_round: decode_pol_round(fields.next_val()?)?,
            block_id: fields.next_val()?,
            timestamp: fields.next_val()?,
            chain_id: fields.next_val()?,
        };
        fields.finish()?;
        Ok(proposal)
    }
}

/// A block proposed for a round
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Proposal {
    pub height: u64,
    pub round: u32,
    pub pol_round: Option<u32>,
    pub block_id: BlockId,
    pub timestamp: u64,
    pub signature: Option<Signature>,
}

impl Proposal {
    pub fn canonical(&self, chain_id: &str) -> CanonicalProposal {
        CanonicalProposal {
            height: self.height,
            round: self.round,
            pol_round: self.pol_round,
            block_id: self.block_id.clone(),
            timestamp: self.timestamp,
            chain_id: chain_id.to_string(),
        }
    }

    pub fn sign_bytes(&self, chain_id: &str) -> Vec<u8> {
        codec::encode(&self.canonical(chain_id))
    }

    pub fn verify(&self, chain_id: &str, pub_key: &PubKey) -> Result<()> {
        let signature = self
            .signature
            .as_ref()
            .ok_or(Error::InvalidVote("proposal is not signed"))?;
        ensure!(
            pub_key.verify(&self.sign_bytes(chain_id), signature),
            Error::InvalidVote("invalid proposal signature")
        );
        Ok(())
    }
}

/// Precommits for one block, indexed like the validator set
///
/// Height and round are those of the first precommit present.
#[derive(Clone, Debug, Default)]
pub struct Commit {
    block_id: BlockId,
    precommits: Vec<Option<Vote>>,
    first_precommit: OnceCell<Option<usize>>,
    bit_array: OnceCell<BitArray>,
    hash: OnceCell<Hash>,
}

impl Commit {
    pub fn new(block_id: BlockId, precommits: Vec<Option<Vote>>) -> Self {
        Commit {
            block_id,
            precommits,
            first_precommit: OnceCell::new(),
            bit_array: OnceCell::new(),
            hash: OnceCell::new(),
        }
    }

    pub fn block_id(&self) -> &BlockId {
        &self.block_id
    }

    pub fn precommits(&self) -> &[Option<Vote>] {
        &self.precommits
    }

    pub fn first_precommit(&self) -> Option<&Vote> {
        let index = self
            .first_precommit
            .get_or_init(|| self.precommits.iter().position(Option::is_some));
        index.and_then(|i| self.precommits[i].as_ref())
    }

    pub fn height(&self) -> Option<u64> {
        self.first_precommit().map(|vote| vote.height)
    }

    pub fn round(&self) -> Option<u32> {
        self.first_precommit().map(|vote| vote.round)
    }

    pub fn size(&self) -> usize {
        self.precommits.len()
    }

    /// Any precommit is present
    pub fn is_commit(&self) -> bool {
        !self.precommits.is_empty()
    }

    pub fn get_by_index(&self, index: usize) -> Option<&Vote> {
        self.precommits.get(index).and_then(Option::as_ref)
    }

    /// Which validator slots voted
    pub fn bit_array(&self) -> &BitArray {
        self.bit_array.get_or_init(|| {
            let mut bits = BitArray::new(self.precommits.len());
            for (i, precommit) in self.precommits.iter().enumerate() {
                bits.set_index(i, precommit.is_some());
            }
            bits
        })
    }

    pub fn validate_basic(&self) -> Result<()> {
        ensure!(
            !self.block_id.is_zero(),
            Error::InvalidCommit("commit cannot be for a nil block".to_string())
        );
        ensure!(
            !self.precommits.is_empty(),
            Error::InvalidCommit("no precommits in commit".to_string())
        );
        let (height, round) = match self.first_precommit() {
            Some(first) => (first.height, first.round),
            None => return Err(Error::InvalidCommit("every precommit is nil".to_string())),
        };

        for precommit in self.precommits.iter().flatten() {
            ensure!(
                precommit.vote_type == SignedMsgType::Precommit,
                Error::InvalidCommit(format!("invalid vote type {:?}", precommit.vote_type))
            );
            ensure!(
                precommit.height == height,
                Error::InvalidCommit(format!(
                    "invalid height, want {} got {}",
                    height, precommit.height
                ))
            );
            ensure!(
                precommit.round == round,
                Error::InvalidCommit(format!(
                    "invalid round, want {} got {}",
                    round, precommit.round
                ))
            );
        }
        Ok(())
    }

    /// Merkle root over the precommit hashes, absent precommits hash to zero
    pub fn hash(&self) -> Hash {
        *self.hash.get_or_init(|| {
            let leaves: Vec<Hash> = self
                .precommits
                .iter()
                .map(|precommit| precommit.as_ref().map_or_else(Hash::zero, Vote::hash))
                .collect();
            merkle::hash_from_hashes(&leaves)
        })
    }
}

impl PartialEq for Commit {
    fn eq(&self, other: &Self) -> bool {
        self.block_id == other.block_id && self.precommits == other.precommits
    }
}

impl Eq for Commit {}

impl Encodable for Commit {
    fn encode(&self, s: &mut Encoder) {
        s.begin_list()
            .append(&self.block_id)
            .append_list(&self.precommits)
            .end_list();
    }
}

impl Decodable for Commit {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let block_id = fields.next_val()?;
        let precommits = fields.next_list()?;
        fields.finish()?;
        Ok(Commit::new(block_id, precommits))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::block::PartSetHeader;
    use crypto::ed25519::PrivKey;

    pub(crate) fn block_id(seed: &[u8]) -> BlockId {
        BlockId {
            hash: keccak(seed),
            parts_header: PartSetHeader {
                total: 1,
                hash: keccak([seed, b"parts"].concat()),
            },
        }
    }

    pub(crate) fn signed_vote(
        key: &PrivKey,
        index: u32,
        vote_type: SignedMsgType,
        height: u64,
        round: u32,
        block_id: &BlockId,
        chain_id: &str,
    ) -> Vote {
        let mut vote = Vote {
            vote_type,
            height,
            round,
            timestamp: 1_000,
            block_id: block_id.clone(),
            validator_address: key.pub_key().address(),
            validator_index: index,
            signature: None,
        };
        vote.signature = Some(key.sign(&vote.sign_bytes(chain_id)));
        vote
    }

    #[test]
    fn it_verifies_votes() {
        let key = PrivKey::generate();
        let vote = signed_vote(&key, 0, SignedMsgType::Prevote, 3, 0, &block_id(b"a"), "chain");
        assert!(vote.verify("chain", &key.pub_key()).is_ok());
        assert_eq!(
            vote.verify("other", &key.pub_key()),
            Err(Error::InvalidVote("invalid signature"))
        );
        assert!(vote.verify("chain", &PrivKey::generate().pub_key()).is_err());

        let decoded: Vote = codec::decode(&codec::encode(&vote)).unwrap();
        assert_eq!(decoded, vote);
        assert_eq!(decoded.hash(), vote.hash());
    }

    #[test]
    fn it_reads_canonical_votes_back() {
        let key = PrivKey::generate();
        let vote = signed_vote(&key, 0, SignedMsgType::Precommit, 9, 2, &block_id(b"b"), "c");
        let canonical: CanonicalVote = codec::decode(&vote.sign_bytes("c")).unwrap();
        assert_eq!(canonical, vote.canonical("c"));
    }

    #[test]
    fn it_encodes_pol_rounds() {
        let proposal = Proposal {
            height: 4,
            round: 1,
            pol_round: Some(0),
            block_id: block_id(b"p"),
            timestamp: 5,
            signature: None,
        };
        let canonical: CanonicalProposal = codec::decode(&proposal.sign_bytes("c")).unwrap();
        assert_eq!(canonical.pol_round, Some(0));

        let none = Proposal {
            pol_round: None,
            ..proposal
        };
        let canonical: CanonicalProposal = codec::decode(&none.sign_bytes("c")).unwrap();
        assert_eq!(canonical.pol_round, None);
    }

    #[test]
    fn it_validates_commits() {
        let keys: Vec<PrivKey> = (0..3).map(|_| PrivKey::generate()).collect();
        let id = block_id(b"c");
        let precommits = keys
            .iter()
            .enumerate()
            .map(|(i, key)| {
                Some(signed_vote(key, i as u32, SignedMsgType::Precommit, 5, 1, &id, "c"))
            })
            .collect::<Vec<_>>();

        let mut with_gap = precommits.clone();
        with_gap[0] = None;
        let commit = Commit::new(id.clone(), with_gap);
        assert!(commit.validate_basic().is_ok());
        assert_eq!(commit.height(), Some(5));
        assert_eq!(commit.round(), Some(1));
        assert_eq!(commit.bit_array().to_string(), "_xx");

        let mut wrong_round = precommits.clone();
        wrong_round[2] = Some(signed_vote(&keys[2], 2, SignedMsgType::Precommit, 5, 2, &id, "c"));
        assert!(Commit::new(id.clone(), wrong_round).validate_basic().is_err());

        let mut prevote = precommits.clone();
        prevote[1] = Some(signed_vote(&keys[1], 1, SignedMsgType::Prevote, 5, 1, &id, "c"));
        assert!(Commit::new(id.clone(), prevote).validate_basic().is_err());

        assert!(Commit::new(BlockId::default(), precommits).validate_basic().is_err());
        assert!(Commit::new(id, Vec::new()).validate_basic().is_err());
    }

    #[test]
    fn it_hashes_commits() {
        let key = PrivKey::generate();
        let id = block_id(b"h");
        let vote = signed_vote(&key, 0, SignedMsgType::Precommit, 1, 0, &id, "c");
        let commit = Commit::new(id, vec![Some(vote.clone()), None]);
        assert_eq!(
            commit.hash(),
            merkle::hash_from_two(&vote.hash(), &Hash::zero())
        );

        let decoded: Commit = codec::decode(&codec::encode(&commit)).unwrap();
        assert_eq!(decoded, commit);
        assert_eq!(decoded.hash(), commit.hash());
    }
}
