use thiserror::Error;

/// Errors returned when a token generator is misconfigured.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("alphabet must not be empty")]
    EmptyAlphabet,
    #[error("token length must be greater than zero")]
    ZeroLength,
    #[error("token length {length} exceeds the {digest_len}-byte digest of {algorithm}")]
    DigestTooShort {
        length: usize,
        digest_len: usize,
        algorithm: &'static str,
    },
    #[error("unknown hash algorithm: {0}")]
    UnknownAlgorithm(String),
}
