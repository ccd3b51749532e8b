//! # Private validator
//!
//! A validator's signing key kept in a JSON file together with the last
//! height, round and step it signed. Signing never moves backwards and
//! never signs two different payloads for the same step.

mod file_pv;

pub use file_pv::{FilePV, Step};

/// Type alias for private validator operations that may fail
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for private validator operations
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// Returned when asked to sign below the last signed height
    #[error("Height regression. Got {got}, last height {last}")]
    HeightRegression { got: u64, last: u64 },

    /// Returned when asked to sign below the last signed round
    #[error("Round regression at height {height}. Got {got}, last round {last}")]
    RoundRegression { height: u64, got: u32, last: u32 },

    /// Returned when asked to sign below the last signed step
    #[error("Step regression at height {height} round {round}. Got {got:?}, last step {last:?}")]
    StepRegression {
        height: u64,
        round: u32,
        got: Step,
        last: Step,
    },

    /// Returned when the last step was signed but its payload was not kept
    #[error("No last sign bytes found")]
    NoLastSignBytes,

    /// Returned when asked to sign a different payload for the last step
    #[error("Conflicting data")]
    ConflictingData,

    /// Returned for messages that are not signed at a consensus step
    #[error("Unknown vote type")]
    UnknownVoteType,

    /// Returned when the file cannot be read or written
    #[error("{0}")]
    Io(String),

    /// Returned when the file is not a valid private validator
    #[error("Invalid private validator file: {0}")]
    Json(String),

    #[error(transparent)]
    Crypto(#[from] crypto::Error),

    #[error(transparent)]
    Codec(#[from] codec::Error),
}
