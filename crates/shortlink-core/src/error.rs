use thiserror::Error;

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("token already taken by a live link: {0}")]
    Conflict(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
    #[error("expiry loop already started for this repository")]
    ExpiryLoopAlreadyStarted,
}

/// Why an original URL was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidUrlReason {
    #[error(transparent)]
    Parse(#[from] url::ParseError),
    /// The parser drops tabs and newlines silently; the raw input keeps them
    /// and could not be sent back in a `Location` header.
    #[error("url contains control characters")]
    ControlCharacter,
}

/// Errors surfaced by the link service to transports.
#[derive(Debug, Clone, Error)]
pub enum LinkError {
    #[error("url is not valid: {input}: {source}")]
    InvalidUrl {
        input: String,
        #[source]
        source: InvalidUrlReason,
    },
    #[error("link not found")]
    NotFound,
    #[error("storage error: {0}")]
    Storage(
        #[from]
        #[source]
        StorageError,
    ),
}
