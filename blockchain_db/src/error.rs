/// Result of a store update
pub type Result<T> = std::result::Result<T, Error>;

/// Why a store rejected an update
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// The block's parent is not the chain tail
    #[error("Block does not extend the chain tail")]
    DoesNotConnect,

    /// The block is not at the next height
    #[error("Block is not at the next height")]
    InvalidHeight,

    /// A block or key image is already recorded
    #[error("Already recorded")]
    Exists,

    /// There is nothing to remove
    #[error("Not recorded")]
    DoesNotExist,
}
