//! Consensus limits fixed at genesis

use ensure_macro::ensure;
use serde::{Deserialize, Serialize};

use codec::{Decodable, Encodable, Encoder, Rlp};
use crypto::{keccak, Hash};

use crate::{Error, Result};

/// Upper bound on `BlockSize::max_bytes`, 100 MiB
pub const MAX_BLOCK_SIZE_BYTES: u64 = 100 * 1024 * 1024;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BlockSize {
    pub max_bytes: u64,
    /// Zero means unlimited
    pub max_gas: u64,
}

impl Default for BlockSize {
    fn default() -> Self {
        BlockSize {
            max_bytes: 22_020_096,
            max_gas: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct EvidenceParams {
    /// Blocks after which evidence is too old to punish
    pub max_age: u64,
}

impl Default for EvidenceParams {
    fn default() -> Self {
        EvidenceParams { max_age: 100_000 }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConsensusParams {
    pub block_size: BlockSize,
    pub evidence: EvidenceParams,
}

impl ConsensusParams {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.block_size.max_bytes > 0,
            Error::InvalidGenesis("block max bytes must be positive".to_string())
        );
        ensure!(
            self.block_size.max_bytes <= MAX_BLOCK_SIZE_BYTES,
            Error::InvalidGenesis(format!(
                "block max bytes {} is above {}",
                self.block_size.max_bytes, MAX_BLOCK_SIZE_BYTES
            ))
        );
        ensure!(
            self.evidence.max_age > 0,
            Error::InvalidGenesis("evidence max age must be positive".to_string())
        );
        Ok(())
    }

    /// Committed to by every header
    pub fn hash(&self) -> Hash {
        keccak(codec::encode(self))
    }
}

impl Encodable for ConsensusParams {
    fn encode(&self, s: &mut Encoder) {
        s.begin_list()
            .append(&self.block_size.max_bytes)
            .append(&self.block_size.max_gas)
            .append(&self.evidence.max_age)
            .end_list();
    }
}

impl Decodable for ConsensusParams {
    fn decode(rlp: &Rlp) -> codec::Result<Self> {
        let mut fields = rlp.iter()?;
        let params = ConsensusParams {
            block_size: BlockSize {
                max_bytes: fields.next_val()?,
                max_gas: fields.next_val()?,
            },
            evidence: EvidenceParams {
                max_age: fields.next_val()?,
            },
        };
        fields.finish()?;
        Ok(params)
    }
}
