//! Proof of validator misbehaviour

use ensure_macro::ensure;
use once_cell::sync::OnceCell;

use codec::{Decodable, Encodable, Encoder, Rlp, TypeTag};
use crypto::{ed25519::PubKey, keccak, merkle, Address, Hash};

use crate::validator::ValidatorSet;
use crate::vote::Vote;
use crate::{Error, Result};

pub const EVIDENCE_DUPLICATE_VOTE: TypeTag = TypeTag::from_name("dve");

/// Two conflicting votes signed by one validator for the same step
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DuplicateVoteEvidence {
    pub pub_key: PubKey,
    pub vote_a: Vote,
    pub vote_b: Vote,
}

impl DuplicateVoteEvidence {
    pub fn height(&self) -> u64 {
        self.vote_a.height
    }

    pub fn address(&self) -> Address {
        self.pub_key.address()
    }

    pub fn hash(&self) -> Hash {
        keccak(codec::encode(self))
    }

    /// Both votes are signed and carry the same validator
    pub fn validate_basic(&self) -> Result<()> {
        for vote in &[&self.vote_a, &self.vote_b] {
            ensure!(
                vote.signature.is_some(),
                Error::InvalidEvidence("unsigned vote".to_string())
            );
        }
        ensure!(
            self.vote_a.validator_address == self.vote_b.validator_address
                && self.vote_a.validator_index == self.vote_b.validator_index,
            Error::InvalidEvidence("votes are from different validators".to_string())
        );
        Ok(())
    }

    /// The votes conflict and were both signed by `pub_key`
    pub fn verify(&self, chain_id: &str) -> Result<()> {
        self.validate_basic()?;
        let (a, b) = (&self.vote_a, &self.vote_b);
        ensure!(
            a.height == b.height && a.round == b.round && a.vote_type == b.vote_type,
            Error::InvalidEvidence(format!(
                "H/R/S does not match: {}/{}/{:?} vs {}/{}/{:?}",
                a.height, a.round, a.vote_type, b.height, b.round, b.vote_type
            ))
        );
        ensure!(
            a.block_id != b.block_id,
            Error::InvalidEvidence("votes are for the same block".to_string())
        );
        ensure!(
            self.address() == a.validator_address,
            Error::InvalidEvidence("address does not match the key".to_string())
        );
        a.verify(chain_id, &self.pub_key)
            .map_err(|e| Error::InvalidEvidence(format!("vote a: {}", e)))?;
        b.verify(chain_id, &self.pub_key)
            .map_err(|e| Error::InvalidEvidence(format!("vote b: {}", e)))?;
        Ok(())
    }
}

impl Encodable for DuplicateVoteEvidence {
    fn encode(&self, s: &mut Encoder) {
        s.begin_list()
            .append(&self.pub_key)
            .append(&self.vote_a)
            .append(&self.vote_b)
            .end_list();
    }
}

impl Decodable for DuplicateVoteEvidence {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let evidence = DuplicateVoteEvidence {
            pub_key: fields.next_val()?,
            vote_a: fields.next_val()?,
            vote_b: fields.next_val()?,
        };
        fields.finish()?;
        Ok(evidence)
    }
}

/// Any kind of misbehaviour
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Evidence {
    DuplicateVote(DuplicateVoteEvidence),
}

impl Evidence {
    pub fn tag(&self) -> TypeTag {
        match self {
            Evidence::DuplicateVote(_) => EVIDENCE_DUPLICATE_VOTE,
        }
    }

    pub fn height(&self) -> u64 {
        match self {
            Evidence::DuplicateVote(ev) => ev.height(),
        }
    }

    pub fn address(&self) -> Address {
        match self {
            Evidence::DuplicateVote(ev) => ev.address(),
        }
    }

    pub fn hash(&self) -> Hash {
        match self {
            Evidence::DuplicateVote(ev) => ev.hash(),
        }
    }

    pub fn validate_basic(&self) -> Result<()> {
        match self {
            Evidence::DuplicateVote(ev) => ev.validate_basic(),
        }
    }

    /// Checks the evidence and that it names a member of `validators`
    pub fn verify(&self, chain_id: &str, validators: &ValidatorSet) -> Result<()> {
        ensure!(
            validators.has_address(&self.address()),
            Error::InvalidEvidence("address is not a validator".to_string())
        );
        match self {
            Evidence::DuplicateVote(ev) => ev.verify(chain_id),
        }
    }
}

impl Encodable for Evidence {
    fn encode(&self, s: &mut Encoder) {
        let bytes = match self {
            Evidence::DuplicateVote(ev) => codec::encode_tagged(self.tag(), ev),
        };
        s.append_bytes(&bytes);
    }
}

impl Decodable for Evidence {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let (tag, body) = TypeTag::split(rlp.data()?)?;
        match tag {
            EVIDENCE_DUPLICATE_VOTE => Ok(Evidence::DuplicateVote(codec::decode(body)?)),
            other => Err(codec::Error::UnknownTag(other.name())),
        }
    }
}

/// The evidence included in a block
#[derive(Clone, Debug, Default)]
pub struct EvidenceData {
    evidence: Vec<Evidence>,
    hash: OnceCell<Hash>,
}

impl EvidenceData {
    pub fn new(evidence: Vec<Evidence>) -> Self {
        EvidenceData {
            evidence,
            hash: OnceCell::new(),
        }
    }

    pub fn evidence(&self) -> &[Evidence] {
        &self.evidence
    }

    pub fn is_empty(&self) -> bool {
        self.evidence.is_empty()
    }

    /// Merkle root of the evidence hashes
    pub fn hash(&self) -> Hash {
        *self.hash.get_or_init(|| {
            let hashes: Vec<Hash> = self.evidence.iter().map(Evidence::hash).collect();
            merkle::hash_from_hashes(&hashes)
        })
    }
}

impl PartialEq for EvidenceData {
    fn eq(&self, other: &Self) -> bool {
        self.evidence == other.evidence
    }
}

impl Eq for EvidenceData {}

impl Encodable for EvidenceData {
    fn encode(&self, s: &mut Encoder) {
        s.append_list(&self.evidence);
    }
}

impl Decodable for EvidenceData {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        Ok(EvidenceData::new(rlp.as_list()?))
    }
}
