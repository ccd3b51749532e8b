//! Blocks and their headers

use std::collections::BTreeMap;

use ensure_macro::ensure;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use codec::{Decodable, Encodable, Encoder, Rlp};
use crypto::{keccak, merkle, Address, Bloom, Hash};

use crate::evidence::EvidenceData;
use crate::tx::Tx;
use crate::vote::Commit;
use crate::{Error, Result};

pub use crate::part_set::{PartSet, PartSetHeader};

/// Default size of the parts a block is gossiped in
pub const BLOCK_PART_SIZE: usize = 64 * 1024;

/// Identifies a block together with the parts it was gossiped in
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct BlockId {
    pub hash: Hash,
    pub parts_header: PartSetHeader,
}

impl BlockId {
    pub fn is_zero(&self) -> bool {
        self.hash.is_zero() && self.parts_header.is_zero()
    }

    /// Both halves are set
    pub fn is_complete(&self) -> bool {
        !self.hash.is_zero() && self.parts_header.total > 0 && !self.parts_header.hash.is_zero()
    }
}

impl Encodable for BlockId {
    fn encode(&self, s: &mut Encoder) {
        s.begin_list()
            .append(&self.hash)
            .append(&self.parts_header)
            .end_list();
    }
}

impl Decodable for BlockId {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let id = BlockId {
            hash: fields.next_val()?,
            parts_header: fields.next_val()?,
        };
        fields.finish()?;
        Ok(id)
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Header {
    pub chain_id: String,
    pub height: u64,
    pub coinbase: Address,
    /// Seconds since the unix epoch
    pub time: u64,
    pub num_txs: u64,
    pub total_txs: u64,
    /// Non-zero when the block was produced while recovering the chain
    pub recover: u64,

    pub parent_hash: Hash,
    pub last_block_id: BlockId,

    pub last_commit_hash: Hash,
    pub validators_hash: Hash,
    pub consensus_hash: Hash,

    pub data_hash: Hash,
    pub state_hash: Hash,
    pub receipt_hash: Hash,
    pub gas_limit: u64,
    pub gas_used: u64,

    pub evidence_hash: Hash,
    pub bloom: Bloom,
}

fn field_hash<E: Encodable + ?Sized>(value: &E) -> Hash {
    keccak(codec::encode(value))
}

impl Header {
    /// Merkle root over the hashes of the named fields
    pub fn hash(&self) -> Hash {
        let mut fields = BTreeMap::new();
        fields.insert("ChainID", field_hash(&self.chain_id));
        fields.insert("Height", field_hash(&self.height));
        fields.insert("Coinbase", field_hash(&self.coinbase));
        fields.insert("Time", field_hash(&self.time));
        fields.insert("NumTxs", field_hash(&self.num_txs));
        fields.insert("TotalTxs", field_hash(&self.total_txs));
        fields.insert("Recover", field_hash(&self.recover));
        fields.insert("ParentHash", field_hash(&self.parent_hash));
        fields.insert("LastBlockID", field_hash(&self.last_block_id));
        fields.insert("LastCommit", field_hash(&self.last_commit_hash));
        fields.insert("Validators", field_hash(&self.validators_hash));
        fields.insert("Consensus", field_hash(&self.consensus_hash));
        fields.insert("Data", field_hash(&self.data_hash));
        fields.insert("State", field_hash(&self.state_hash));
        fields.insert("Receipt", field_hash(&self.receipt_hash));
        fields.insert("GasLimit", field_hash(&self.gas_limit));
        fields.insert("GasUsed", field_hash(&self.gas_used));
        fields.insert("Evidence", field_hash(&self.evidence_hash));
        fields.insert("Bloom", field_hash(&self.bloom));
        merkle::hash_from_map(&fields)
    }
}

impl Encodable for Header {
    fn encode(&self, s: &mut Encoder) {
        s.begin_list()
            .append(&self.chain_id)
            .append(&self.height)
            .append(&self.coinbase)
            .append(&self.time)
            .append(&self.num_txs)
            .append(&self.total_txs)
            .append(&self.recover)
            .append(&self.parent_hash)
            .append(&self.last_block_id)
            .append(&self.last_commit_hash)
            .append(&self.validators_hash)
            .append(&self.consensus_hash)
            .append(&self.data_hash)
            .append(&self.state_hash)
            .append(&self.receipt_hash)
            .append(&self.gas_limit)
            .append(&self.gas_used)
            .append(&self.evidence_hash)
            .append(&self.bloom)
            .end_list();
    }
}

impl Decodable for Header {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let header = Header {
            chain_id: fields.next_val()?,
            height: fields.next_val()?,
            coinbase: fields.next_val()?,
            time: fields.next_val()?,
            num_txs: fields.next_val()?,
            total_txs: fields.next_val()?,
            recover: fields.next_val()?,
            parent_hash: fields.next_val()?,
            last_block_id: fields.next_val()?,
            last_commit_hash: fields.next_val()?,
            validators_hash: fields.next_val()?,
            consensus_hash: fields.next_val()?,
            data_hash: fields.next_val()?,
            state_hash: fields.next_val()?,
            receipt_hash: fields.next_val()?,
            gas_limit: fields.next_val()?,
            gas_used: fields.next_val()?,
            evidence_hash: fields.next_val()?,
            bloom: fields.next_val()?,
        };
        fields.finish()?;
        Ok(header)
    }
}

/// The transactions of a block
#[derive(Clone, Debug, Default)]
pub struct Data {
    txs: Vec<Tx>,
    hash: OnceCell<Hash>,
}

impl Data {
    pub fn new(txs: Vec<Tx>) -> Self {
        Data {
            txs,
            hash: OnceCell::new(),
        }
    }

    pub fn txs(&self) -> &[Tx] {
        &self.txs
    }

    /// Merkle root over the transaction hashes
    pub fn hash(&self) -> Hash {
        *self.hash.get_or_init(|| {
            let leaves: Vec<Hash> = self.txs.iter().map(Tx::hash).collect();
            merkle::hash_from_hashes(&leaves)
        })
    }
}

impl PartialEq for Data {
    fn eq(&self, other: &Self) -> bool {
        self.txs == other.txs
    }
}

impl Encodable for Data {
    fn encode(&self, s: &mut Encoder) {
        s.append_list(&self.txs);
    }
}

impl Decodable for Data {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        Ok(Data::new(rlp.as_list()?))
    }
}

/// A header with everything it commits to
#[derive(Clone, Debug, Default)]
pub struct Block {
    header: Header,
    data: Data,
    evidence: EvidenceData,
    last_commit: Commit,
    hash: OnceCell<Hash>,
}

impl Block {
    /// Assembles a block at `height` and fills the header hashes it owns
    ///
    /// `last_total_txs` is the running transaction count up to the parent.
    pub fn new(
        height: u64,
        last_total_txs: u64,
        txs: Vec<Tx>,
        last_commit: Commit,
        evidence: EvidenceData,
    ) -> Self {
        let mut block = Block {
            header: Header {
                height,
                total_txs: last_total_txs,
                ..Header::default()
            },
            data: Data::new(txs),
            evidence,
            last_commit,
            hash: OnceCell::new(),
        };
        block.fill_header();
        block
    }

    /// Recomputes the counts and hashes the header takes from the body
    ///
    /// The running total keeps the count of the parent chain.
    pub fn fill_header(&mut self) {
        let last_total_txs = self.header.total_txs.saturating_sub(self.header.num_txs);
        self.header.num_txs = self.data.txs().len() as u64;
        self.header.total_txs = last_total_txs + self.header.num_txs;
        self.header.last_commit_hash = self.last_commit.hash();
        self.header.data_hash = self.data.hash();
        self.header.evidence_hash = self.evidence.hash();
        self.hash = OnceCell::new();
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Mutable header access, dropping the cached hash
    pub fn header_mut(&mut self) -> &mut Header {
        self.hash = OnceCell::new();
        &mut self.header
    }

    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn evidence(&self) -> &EvidenceData {
        &self.evidence
    }

    pub fn last_commit(&self) -> &Commit {
        &self.last_commit
    }

    pub fn height(&self) -> u64 {
        self.header.height
    }

    pub fn hash(&self) -> Hash {
        *self.hash.get_or_init(|| self.header.hash())
    }

    /// Encodes the block and splits it into parts
    pub fn make_part_set(&self, part_size: usize) -> PartSet {
        PartSet::from_data(&codec::encode(self), part_size)
    }

    /// The header agrees with the body
    ///
    /// The previous commit is checked from the second block on; the first
    /// block carries an empty one.
    pub fn validate_basic(&self) -> Result<()> {
        let header = &self.header;
        ensure!(
            header.num_txs == self.data.txs().len() as u64,
            Error::InvalidBlock(format!(
                "wrong num txs, header {} data {}",
                header.num_txs,
                self.data.txs().len()
            ))
        );
        ensure!(
            header.total_txs >= header.num_txs,
            Error::InvalidBlock("total txs below num txs".to_string())
        );
        if header.height > 1 {
            self.last_commit.validate_basic()?;
        }
        ensure!(
            header.last_commit_hash == self.last_commit.hash(),
            Error::InvalidBlock("wrong last commit hash".to_string())
        );
        ensure!(
            header.data_hash == self.data.hash(),
            Error::InvalidBlock("wrong data hash".to_string())
        );
        ensure!(
            header.evidence_hash == self.evidence.hash(),
            Error::InvalidBlock("wrong evidence hash".to_string())
        );
        Ok(())
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header
            && self.data == other.data
            && self.evidence == other.evidence
            && self.last_commit == other.last_commit
    }
}

impl Encodable for Block {
    fn encode(&self, s: &mut Encoder) {
        s.begin_list()
            .append(&self.header)
            .append(&self.data)
            .append(&self.evidence)
            .append(&self.last_commit)
            .end_list();
    }
}

impl Decodable for Block {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let block = Block {
            header: fields.next_val()?,
            data: fields.next_val()?,
            evidence: fields.next_val()?,
            last_commit: fields.next_val()?,
            hash: OnceCell::new(),
        };
        fields.finish()?;
        Ok(block)
    }
}
