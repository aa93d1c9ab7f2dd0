use thiserror::Error;

/// Errors raised when a [`LinkService`](crate::LinkService) is misconfigured.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceConfigError {
    #[error("link ttl must be greater than zero")]
    ZeroTtl,
}
