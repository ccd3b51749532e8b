/// Type alias for fallible crypto operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned when parsing keys, points or signatures
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// Returned when a hex string cannot be decoded
    #[error("Invalid hex string")]
    InvalidHex,

    /// Returned when a byte string has the wrong width
    #[error("Invalid length: expected {expected}, got {got}")]
    InvalidLength {
        /// Width required by the type
        expected: usize,
        /// Width supplied
        got: usize,
    },

    /// Returned when 32 bytes do not decompress to a curve point
    #[error("Bytes are not a valid curve point")]
    InvalidPoint,

    /// Returned when 32 bytes are not a reduced scalar
    #[error("Bytes are not a canonical scalar")]
    InvalidScalar,

    /// Returned when a secret key is zero or out of range
    #[error("Invalid private key")]
    InvalidPrivateKey,

    /// Returned when a signature cannot be parsed or does not verify
    #[error("Invalid signature")]
    InvalidSignature,

    /// Returned when a recovery id is not 0 or 1
    #[error("Invalid recovery id {0}")]
    InvalidRecoveryId(u8),

    /// Returned when no public key can be recovered from a signature
    #[error("Public key recovery failed")]
    RecoveryFailed,
}
