/// Type alias for admission and block operations that may fail
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by transaction admission and block validation
///
/// Variants with a numeric code form the stable API taxonomy, see
/// [`Error::code`]. The rest are plain messages.
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    #[error("invalid params")]
    Params,
    #[error("tx is empty")]
    TxEmpty,
    #[error("invalid tx sign")]
    TxSign,
    #[error("nonce too low")]
    NonceTooLow,
    #[error("nonce too high")]
    NonceTooHigh,
    #[error("insufficient balance for gas * price + value")]
    InsufficientFunds,
    #[error("tx already exists in mempool")]
    TxDuplicate,
    #[error("mempool is full")]
    MempoolIsFull,
    #[error("invalid sender")]
    InvalidSender,
    #[error("transaction underpriced")]
    Underpriced,
    #[error("replacement transaction underpriced")]
    ReplaceUnderpriced,
    #[error("intrinsic gas too low")]
    IntrinsicGas,
    #[error("exceeds block gas limit")]
    GasLimit,
    #[error("out of gas")]
    OutOfGas,
    #[error("negative value")]
    NegativeValue,
    #[error("oversized data")]
    OversizedData,
    #[error("tx type not support")]
    TxNotSupport,
    #[error("invalid gas limit or gas price")]
    GasLimitOrGasPrice,

    #[error("invalid sign param for signer")]
    InvalidSignParam,
    #[error("invalid transaction v, r, s values")]
    InvalidSig,
    #[error("invalid receiver")]
    InvalidReceiver,
    #[error("unknown block")]
    UnknownBlock,
    #[error("blacklist address")]
    BlacklistAddress,
    #[error("utxo tx double spend")]
    UtxoTxDoubleSpend,
    #[error("utxo tx fee too low")]
    UtxoTxFeeTooLow,
    #[error("utxo output too more")]
    UtxoOutputTooMore,
    #[error("invalid mix ring")]
    CheckInvalidMixRing,
    #[error("sum of commit illegal")]
    SumOfCommitIllegal,
    #[error("insufficient token balance")]
    InsufficientTokenFunds,
    #[error("invalid utxo tx: {0}")]
    InvalidUtxoTx(&'static str),
    #[error("signature verification failed: {0}")]
    VerifySignFailed(&'static str),
    #[error("invalid block: {0}")]
    InvalidBlock(String),
    #[error("invalid commit: {0}")]
    InvalidCommit(String),
    #[error("invalid vote: {0}")]
    InvalidVote(&'static str),
    #[error("invalid evidence: {0}")]
    InvalidEvidence(String),
    #[error("invalid genesis: {0}")]
    InvalidGenesis(String),
    #[error("json: {0}")]
    Json(String),
    #[error("io: {0}")]
    Io(String),

    #[error(transparent)]
    Codec(#[from] codec::Error),
    #[error(transparent)]
    Crypto(#[from] crypto::Error),
    #[error(transparent)]
    RingCT(#[from] ringct::Error),
}

impl Error {
    /// Stable numeric code exposed to API clients
    pub fn code(&self) -> Option<i32> {
        let code = match self {
            Error::Params => -3001,
            Error::TxEmpty => -3002,
            Error::TxSign => -3003,
            Error::NonceTooLow => -3010,
            Error::NonceTooHigh => -3011,
            Error::InsufficientFunds => -3012,
            Error::TxDuplicate => -3013,
            Error::MempoolIsFull => -3014,
            Error::InvalidSender => -3020,
            Error::Underpriced => -3023,
            Error::ReplaceUnderpriced => -3024,
            Error::IntrinsicGas => -3025,
            Error::GasLimit | Error::OutOfGas => -3026,
            Error::NegativeValue => -3027,
            Error::OversizedData | Error::TxNotSupport => -3039,
            Error::GasLimitOrGasPrice => -3040,
            _ => return None,
        };
        Some(code)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
