use crate::error::LinkError;
use crate::link::CreatedLink;
use crate::token::Token;
use async_trait::async_trait;

type Result<T> = std::result::Result<T, LinkError>;

/// The service API consumed by transport adapters.
#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Creates (or returns the existing) short link for `original_link`.
    async fn create_short_link(&self, original_link: &str) -> Result<CreatedLink>;

    /// Resolves a token to the URL it shortens.
    /// Returns `Err(NotFound)` if the token is unknown or has expired.
    async fn get_full_link(&self, token: &Token) -> Result<String>;
}
