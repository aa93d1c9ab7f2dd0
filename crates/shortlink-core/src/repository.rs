use crate::error::Result;
use crate::expiry::{ExpiryLoop, RemovedSink};
use crate::link::Link;
use crate::token::Token;
use async_trait::async_trait;
use std::time::Duration;

/// What a backend can do natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// The backend can find a link by its original URL.
    pub reverse_lookup: bool,
    /// The backend expires links on its own; no sweep is needed.
    pub native_expiry: bool,
}

/// Outcome of a lookup by original URL.
///
/// `Unsupported` means the backend cannot answer, not that the link is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReverseLookup {
    Found(Link),
    Missing,
    Unsupported,
}

/// Storage contract consumed by the link service.
///
/// Implementations must be safe to call concurrently without external locking;
/// ordering guarantees come from the backend's atomic single-record operations.
#[async_trait]
pub trait LinkRepository: Send + Sync + 'static {
    fn capabilities(&self) -> Capabilities;

    /// Retrieves the live link for a given token.
    /// Returns `None` if the token is unknown or the link has expired.
    async fn get_by_token(&self, token: &Token) -> Result<Option<Link>>;

    /// Retrieves the live link for a given original URL.
    ///
    /// Backends without a reverse index keep the default, which reports the
    /// capability as absent.
    async fn get_by_original(&self, _original_link: &str) -> Result<ReverseLookup> {
        Ok(ReverseLookup::Unsupported)
    }

    /// Inserts a new link as a single atomic write.
    /// Returns `Err(Conflict)` if the token is held by a live link.
    async fn store(&self, link: &Link) -> Result<()>;

    /// Starts removing expired links every `interval`, publishing each batch
    /// of removed tokens to `removed`.
    ///
    /// Natively expiring backends return [`ExpiryLoop::Native`] without
    /// spawning anything. May be called once per repository instance; later
    /// calls fail with `ExpiryLoopAlreadyStarted`.
    fn start_expiry_loop(&self, interval: Duration, removed: RemovedSink) -> Result<ExpiryLoop>;
}

#[async_trait]
impl<R: LinkRepository> LinkRepository for std::sync::Arc<R> {
    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }

    async fn get_by_token(&self, token: &Token) -> Result<Option<Link>> {
        (**self).get_by_token(token).await
    }

    async fn get_by_original(&self, original_link: &str) -> Result<ReverseLookup> {
        (**self).get_by_original(original_link).await
    }

    async fn store(&self, link: &Link) -> Result<()> {
        (**self).store(link).await
    }

    fn start_expiry_loop(&self, interval: Duration, removed: RemovedSink) -> Result<ExpiryLoop> {
        (**self).start_expiry_loop(interval, removed)
    }
}
