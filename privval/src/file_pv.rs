use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use ensure_macro::ensure;
use log::{debug, info, warn};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use tempfile::NamedTempFile;

use crypto::ed25519::{PrivKey, PubKey, Signature, KEY_TYPE};
use crypto::Address;
use types::tx::MultiSignAccountTx;
use types::validator::typed_pub_key;
use types::vote::{CanonicalProposal, CanonicalVote, Proposal, SignedMsgType, Vote};

use crate::{Error, Result};

/// Consensus step a signature was made at
#[derive(Clone, Copy, Eq, Ord, PartialEq, PartialOrd)]
pub enum Step {
    None = 0,
    Propose = 1,
    Prevote = 2,
    Precommit = 3,
}

impl Step {
    fn of_vote(vote_type: SignedMsgType) -> Result<Step> {
        match vote_type {
            SignedMsgType::Prevote => Ok(Step::Prevote),
            SignedMsgType::Precommit => Ok(Step::Precommit),
            SignedMsgType::Proposal => Err(Error::UnknownVoteType),
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::None => "none",
            Step::Propose => "propose",
            Step::Prevote => "prevote",
            Step::Precommit => "precommit",
        };
        f.write_str(name)
    }
}

impl Default for Step {
    fn default() -> Self {
        Step::None
    }
}

impl Serialize for Step {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for Step {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(Step::None),
            1 => Ok(Step::Propose),
            2 => Ok(Step::Prevote),
            3 => Ok(Step::Precommit),
            other => Err(D::Error::custom(format!("unknown step {}", other))),
        }
    }
}

/// What was signed last
#[derive(Clone, Debug, Default, PartialEq)]
struct LastSigned {
    height: u64,
    round: u32,
    step: Step,
    signature: Option<Signature>,
    sign_bytes: Option<Vec<u8>>,
}

#[derive(Serialize, Deserialize)]
struct TypedPrivKey {
    #[serde(rename = "type")]
    key_type: String,
    value: String,
}

/// Layout of the file on disk
#[derive(Serialize, Deserialize)]
struct PvFile {
    address: Address,
    #[serde(with = "typed_pub_key")]
    pub_key: PubKey,
    last_height: u64,
    last_round: u32,
    last_step: Step,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_signature: Option<Signature>,
    #[serde(
        default,
        rename = "last_signbytes",
        skip_serializing_if = "Option::is_none",
        with = "hex_bytes"
    )]
    last_sign_bytes: Option<Vec<u8>>,
    priv_key: TypedPrivKey,
}

mod hex_bytes {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_str(&hex::encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| hex::decode(s).map_err(D::Error::custom))
            .transpose()
    }
}

fn io_error(path: &Path, e: impl fmt::Display) -> Error {
    Error::Io(format!("{}: {}", path.display(), e))
}

/// A private validator backed by a JSON file
///
/// Every fresh signature is written to disk before it is handed out.
pub struct FilePV {
    key: PrivKey,
    last: LastSigned,
    path: PathBuf,
}

impl FilePV {
    /// A new key, not yet written to `path`
    pub fn generate<P: AsRef<Path>>(path: P) -> Self {
        FilePV {
            key: PrivKey::generate(),
            last: LastSigned::default(),
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
        let file: PvFile = serde_json::from_str(&json).map_err(|e| Error::Json(e.to_string()))?;

        ensure!(
            file.priv_key.key_type == KEY_TYPE,
            Error::Json(format!("unsupported key type {}", file.priv_key.key_type))
        );
        let bytes = hex::decode(&file.priv_key.value).map_err(|e| Error::Json(e.to_string()))?;
        let key = PrivKey::from_bytes(&bytes)?;
        ensure!(
            key.pub_key() == file.pub_key && key.pub_key().address() == file.address,
            Error::Json("keys do not match".to_string())
        );

        debug!("Loaded private validator {} from {}", file.address, path.display());
        Ok(FilePV {
            key,
            last: LastSigned {
                height: file.last_height,
                round: file.last_round,
                step: file.last_step,
                signature: file.last_signature,
                sign_bytes: file.last_sign_bytes,
            },
            path: path.to_path_buf(),
        })
    }

    /// Loads `path` if it exists, otherwise generates and saves a new key
    pub fn load_or_generate<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return FilePV::load(path);
        }
        let pv = FilePV::generate(path);
        pv.save()?;
        info!("Generated private validator {} at {}", pv.address(), path.display());
        Ok(pv)
    }

    pub fn address(&self) -> Address {
        self.key.pub_key().address()
    }

    pub fn pub_key(&self) -> PubKey {
        self.key.pub_key()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last_height(&self) -> u64 {
        self.last.height
    }

    pub fn last_round(&self) -> u32 {
        self.last.round
    }

    pub fn last_step(&self) -> Step {
        self.last.step
    }

    pub fn save(&self) -> Result<()> {
        write_file(&self.path, &self.last, &self.key)
    }

    /// Forgets what was signed
    ///
    /// Only safe when the chain is restarted from scratch.
    pub fn reset(&mut self) -> Result<()> {
        let last = LastSigned::default();
        write_file(&self.path, &last, &self.key)?;
        self.last = last;
        warn!("Reset private validator {}", self.address());
        Ok(())
    }

    /// Checks that `(height, round, step)` does not go back
    ///
    /// Returns whether it is the step signed last.
    fn check_hrs(&self, height: u64, round: u32, step: Step) -> Result<bool> {
        let last = &self.last;
        match height.cmp(&last.height) {
            Ordering::Less => Err(Error::HeightRegression {
                got: height,
                last: last.height,
            }),
            Ordering::Greater => Ok(false),
            Ordering::Equal => match round.cmp(&last.round) {
                Ordering::Less => Err(Error::RoundRegression {
                    height,
                    got: round,
                    last: last.round,
                }),
                Ordering::Greater => Ok(false),
                Ordering::Equal => match step.cmp(&last.step) {
                    Ordering::Less => Err(Error::StepRegression {
                        height,
                        round,
                        got: step,
                        last: last.step,
                    }),
                    Ordering::Greater => Ok(false),
                    Ordering::Equal => {
                        ensure!(
                            last.sign_bytes.is_some() && last.signature.is_some(),
                            Error::NoLastSignBytes
                        );
                        Ok(true)
                    }
                },
            },
        }
    }

    /// Signs `sign_bytes` at the given step
    ///
    /// For the step signed last, hands out the stored signature when the
    /// payload matches it up to the timestamp; `last_timestamp` recovers the
    /// timestamp of the stored payload in that case. Returns the signature
    /// and the timestamp to adopt, if it changed.
    fn sign_step<F>(
        &mut self,
        height: u64,
        round: u32,
        step: Step,
        sign_bytes: Vec<u8>,
        last_timestamp: F,
    ) -> Result<(Signature, Option<u64>)>
    where
        F: FnOnce(&[u8]) -> Result<Option<u64>>,
    {
        if self.check_hrs(height, round, step)? {
            if let (Some(last_bytes), Some(signature)) = (&self.last.sign_bytes, self.last.signature) {
                if *last_bytes == sign_bytes {
                    debug!("Re-using signature at {}/{}/{:?}", height, round, step);
                    return Ok((signature, None));
                }
                if let Some(timestamp) = last_timestamp(last_bytes)? {
                    debug!("Re-using signature at {}/{}/{:?} with its timestamp", height, round, step);
                    return Ok((signature, Some(timestamp)));
                }
            }
            warn!(
                "Refusing to sign conflicting data at {}/{}/{:?}",
                height, round, step
            );
            return Err(Error::ConflictingData);
        }

        let signature = self.key.sign(&sign_bytes);
        let last = LastSigned {
            height,
            round,
            step,
            signature: Some(signature),
            sign_bytes: Some(sign_bytes),
        };
        write_file(&self.path, &last, &self.key)?;
        self.last = last;
        info!("Signed {:?} at height {} round {}", step, height, round);
        Ok((signature, None))
    }

    /// Signs a prevote or precommit
    pub fn sign_vote(&mut self, chain_id: &str, vote: &mut Vote) -> Result<()> {
        let step = Step::of_vote(vote.vote_type)?;
        let canonical = vote.canonical(chain_id);
        let (signature, timestamp) = self.sign_step(
            vote.height,
            vote.round,
            step,
            codec::encode(&canonical),
            |last| {
                let mut last: CanonicalVote = codec::decode(last)?;
                let timestamp = last.timestamp;
                last.timestamp = canonical.timestamp;
                Ok(if last == canonical { Some(timestamp) } else { None })
            },
        )?;
        if let Some(timestamp) = timestamp {
            vote.timestamp = timestamp;
        }
        vote.signature = Some(signature);
        Ok(())
    }

    pub fn sign_proposal(&mut self, chain_id: &str, proposal: &mut Proposal) -> Result<()> {
        let canonical = proposal.canonical(chain_id);
        let (signature, timestamp) = self.sign_step(
            proposal.height,
            proposal.round,
            Step::Propose,
            codec::encode(&canonical),
            |last| {
                let mut last: CanonicalProposal = codec::decode(last)?;
                let timestamp = last.timestamp;
                last.timestamp = canonical.timestamp;
                Ok(if last == canonical { Some(timestamp) } else { None })
            },
        )?;
        if let Some(timestamp) = timestamp {
            proposal.timestamp = timestamp;
        }
        proposal.signature = Some(signature);
        Ok(())
    }

    /// Adds this validator's signature to a signer set proposal
    ///
    /// Not bound to a consensus step, so the last signed state is untouched.
    pub fn sign_multi_sign_tx(&self, tx: &mut MultiSignAccountTx) {
        tx.sign(&self.key);
        debug!("Signed signer set proposal {}", tx.hash());
    }
}

impl fmt::Debug for FilePV {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FilePV({} {}/{}/{:?})",
            self.address(),
            self.last.height,
            self.last.round,
            self.last.step
        )
    }
}

/// Replaces `path` in one rename, readable by the owner only
fn write_file(path: &Path, last: &LastSigned, key: &PrivKey) -> Result<()> {
    let file = PvFile {
        address: key.pub_key().address(),
        pub_key: key.pub_key(),
        last_height: last.height,
        last_round: last.round,
        last_step: last.step,
        last_signature: last.signature,
        last_sign_bytes: last.sign_bytes.clone(),
        priv_key: TypedPrivKey {
            key_type: KEY_TYPE.to_string(),
            value: hex::encode(&key.to_bytes()[..]),
        },
    };
    let json = serde_json::to_vec_pretty(&file).map_err(|e| Error::Json(e.to_string()))?;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| io_error(path, e))?;
    tmp.write_all(&json).map_err(|e| io_error(path, e))?;
    tmp.as_file().sync_all().map_err(|e| io_error(path, e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o600))
            .map_err(|e| io_error(path, e))?;
    }
    tmp.persist(path).map_err(|e| io_error(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto::keccak;
    use types::block::{BlockId, PartSetHeader};
    use types::tx::{MultiSignMainInfo, SignersInfo};
    use types::validator::{Validator, ValidatorSet};

    const CHAIN: &str = "test-chain";

    fn block_id(seed: &[u8]) -> BlockId {
        BlockId {
            hash: keccak(seed),
            parts_header: PartSetHeader {
                total: 1,
                hash: keccak([seed, b"parts"].concat()),
            },
        }
    }

    fn vote(pv: &FilePV, vote_type: SignedMsgType, height: u64, round: u32, seed: &[u8]) -> Vote {
        Vote {
            vote_type,
            height,
            round,
            timestamp: 1_000,
            block_id: block_id(seed),
            validator_address: pv.address(),
            validator_index: 0,
            signature: None,
        }
    }

    fn new_pv() -> (tempfile::TempDir, FilePV) {
        let dir = tempfile::tempdir().unwrap();
        let pv = FilePV::load_or_generate(dir.path().join("priv_validator.json")).unwrap();
        (dir, pv)
    }

    #[test]
    fn it_signs_and_persists() {
        let (_dir, mut pv) = new_pv();
        let mut v = vote(&pv, SignedMsgType::Prevote, 1, 0, b"a");
        pv.sign_vote(CHAIN, &mut v).unwrap();
        v.verify(CHAIN, &pv.pub_key()).unwrap();

        let loaded = FilePV::load(pv.path()).unwrap();
        assert_eq!(loaded.address(), pv.address());
        assert_eq!(loaded.last, pv.last);
        assert_eq!(loaded.last_height(), 1);
        assert_eq!(loaded.last_step(), Step::Prevote);
    }

    #[cfg(unix)]
    #[test]
    fn it_keeps_the_file_private() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, pv) = new_pv();
        let mode = fs::metadata(pv.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn it_refuses_to_double_sign() {
        let (_dir, mut pv) = new_pv();
        let mut first = vote(&pv, SignedMsgType::Prevote, 10, 1, b"a");
        pv.sign_vote(CHAIN, &mut first).unwrap();
        let on_disk = fs::read(pv.path()).unwrap();

        let mut second = vote(&pv, SignedMsgType::Prevote, 10, 1, b"b");
        let err = pv.sign_vote(CHAIN, &mut second).unwrap_err();
        assert_eq!(err, Error::ConflictingData);
        assert_eq!(err.to_string(), "Conflicting data");
        assert_eq!(second.signature, None);
        assert_eq!(fs::read(pv.path()).unwrap(), on_disk);
    }

    #[test]
    fn it_replays_the_last_signature() {
        let (_dir, mut pv) = new_pv();
        let mut first = vote(&pv, SignedMsgType::Precommit, 4, 0, b"a");
        pv.sign_vote(CHAIN, &mut first).unwrap();

        let mut again = first.clone();
        again.signature = None;
        pv.sign_vote(CHAIN, &mut again).unwrap();
        assert_eq!(again, first);

        let mut later = first.clone();
        later.signature = None;
        later.timestamp += 5_000;
        pv.sign_vote(CHAIN, &mut later).unwrap();
        assert_eq!(later.timestamp, first.timestamp);
        assert_eq!(later.signature, first.signature);
        later.verify(CHAIN, &pv.pub_key()).unwrap();
    }

    #[test]
    fn it_rejects_regressions() {
        let (_dir, mut pv) = new_pv();
        let mut v = vote(&pv, SignedMsgType::Precommit, 5, 2, b"a");
        pv.sign_vote(CHAIN, &mut v).unwrap();

        let mut lower = vote(&pv, SignedMsgType::Precommit, 4, 2, b"a");
        assert_eq!(
            pv.sign_vote(CHAIN, &mut lower),
            Err(Error::HeightRegression { got: 4, last: 5 })
        );
        let mut earlier = vote(&pv, SignedMsgType::Precommit, 5, 1, b"a");
        assert_eq!(
            pv.sign_vote(CHAIN, &mut earlier),
            Err(Error::RoundRegression {
                height: 5,
                got: 1,
                last: 2
            })
        );
        let mut prevote = vote(&pv, SignedMsgType::Prevote, 5, 2, b"a");
        assert_eq!(
            pv.sign_vote(CHAIN, &mut prevote),
            Err(Error::StepRegression {
                height: 5,
                round: 2,
                got: Step::Prevote,
                last: Step::Precommit
            })
        );

        let mut next = vote(&pv, SignedMsgType::Prevote, 5, 3, b"a");
        pv.sign_vote(CHAIN, &mut next).unwrap();
    }

    #[test]
    fn it_signs_proposals_before_votes() {
        let (_dir, mut pv) = new_pv();
        let mut proposal = Proposal {
            height: 3,
            round: 0,
            pol_round: None,
            block_id: block_id(b"p"),
            timestamp: 7,
            signature: None,
        };
        pv.sign_proposal(CHAIN, &mut proposal).unwrap();
        proposal.verify(CHAIN, &pv.pub_key()).unwrap();
        assert_eq!(pv.last_step(), Step::Propose);

        let mut prevote = vote(&pv, SignedMsgType::Prevote, 3, 0, b"p");
        pv.sign_vote(CHAIN, &mut prevote).unwrap();

        let mut late = proposal.clone();
        late.signature = None;
        assert!(matches!(
            pv.sign_proposal(CHAIN, &mut late),
            Err(Error::StepRegression { .. })
        ));
    }

    #[test]
    fn it_resets() {
        let (_dir, mut pv) = new_pv();
        let mut v = vote(&pv, SignedMsgType::Prevote, 8, 0, b"a");
        pv.sign_vote(CHAIN, &mut v).unwrap();

        pv.reset().unwrap();
        assert_eq!(FilePV::load(pv.path()).unwrap().last, LastSigned::default());
        let mut lower = vote(&pv, SignedMsgType::Prevote, 2, 0, b"a");
        pv.sign_vote(CHAIN, &mut lower).unwrap();
    }

    #[test]
    fn it_signs_signer_set_proposals() {
        let (_dir, pv) = new_pv();
        let validators = ValidatorSet::new(vec![Validator::new(pv.pub_key(), 1, Address::default())]);
        let mut tx = MultiSignAccountTx::new(MultiSignMainInfo {
            account_nonce: 0,
            support_tx_type: "cct".to_string(),
            signers_info: SignersInfo::default(),
        });
        pv.sign_multi_sign_tx(&mut tx);
        tx.verify_sign(&validators).unwrap();
        assert_eq!(pv.last_step(), Step::None);
    }
}
