/// Type alias for codec operations that may fail
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for decoding canonical bytes
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// Returned when the input ends in the middle of an item
    #[error("Unexpected end of input")]
    UnexpectedEnd,

    /// Returned when bytes remain after the top level item
    #[error("Trailing bytes after item")]
    TrailingBytes,

    /// Returned when a length prefix is not the shortest possible one
    #[error("Non-canonical length prefix")]
    NonCanonicalLength,

    /// Returned when a single byte below 0x80 is wrapped in a string header
    #[error("Single byte wrapped in a string header")]
    NonCanonicalSingleByte,

    /// Returned when an integer carries leading zero bytes
    #[error("Integer has leading zero bytes")]
    LeadingZero,

    /// Returned when an integer does not fit its target type
    #[error("Integer does not fit in {0} bytes")]
    IntegerOverflow(usize),

    /// Returned when a list was found where a byte string was expected
    #[error("Expected a byte string")]
    ExpectedData,

    /// Returned when a byte string was found where a list was expected
    #[error("Expected a list")]
    ExpectedList,

    /// Returned when a fixed width field has the wrong size
    #[error("Invalid length: expected {expected}, got {got}")]
    InvalidLength {
        /// Width the field must have
        expected: usize,
        /// Width found on the wire
        got: usize,
    },

    /// Returned when a list ends before all fields were read
    #[error("List is missing an item")]
    MissingItem,

    /// Returned when a list carries more items than the type has fields
    #[error("List has unexpected trailing items")]
    TrailingItems,

    /// Returned when an interface slot carries an unregistered tag
    #[error("Unknown type tag {0}")]
    UnknownTag(String),

    /// Returned when a value decodes structurally but is not acceptable
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),
}

impl From<rlp::DecoderError> for Error {
    fn from(err: rlp::DecoderError) -> Self {
        use rlp::DecoderError::*;

        match err {
            RlpIsTooBig => Error::IntegerOverflow(8),
            RlpDataLenWithZeroPrefix | RlpListLenWithZeroPrefix | RlpInvalidIndirection => {
                Error::NonCanonicalLength
            }
            RlpExpectedToBeData => Error::ExpectedData,
            RlpExpectedToBeList => Error::ExpectedList,
            RlpIncorrectListLen => Error::MissingItem,
            Custom(msg) => Error::InvalidValue(msg),
            // Short input and inconsistent lengths
            _ => Error::UnexpectedEnd,
        }
    }
}
