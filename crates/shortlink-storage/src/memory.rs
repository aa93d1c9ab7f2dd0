use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jiff::Timestamp;
use shortlink_core::error::{Result, StorageError};
use shortlink_core::{
    validate_interval, Capabilities, Clock, ExpiryLoop, ExpiryReconciler, Link, LinkRepository,
    RemovedSink, ReverseLookup, StartOnce, Sweeper, SystemClock, Token,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// In-memory implementation of [`LinkRepository`] using DashMap.
///
/// Behaves like the relational backend: it answers lookups by original URL,
/// has no native expiry, and relies on the reconciler to remove expired
/// links. Expired links are invisible to reads as soon as they expire.
///
/// Clones share the same storage.
#[derive(Debug, Clone)]
pub struct InMemoryLinkStore<C = SystemClock> {
    links: Arc<DashMap<String, Link>>,
    by_original: Arc<DashMap<String, Token>>,
    clock: C,
    expiry: Arc<StartOnce>,
}

impl InMemoryLinkStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for InMemoryLinkStore {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock + Clone> InMemoryLinkStore<C> {
    /// Creates a new in-memory store that reads time from `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self {
            links: Arc::new(DashMap::new()),
            by_original: Arc::new(DashMap::new()),
            clock,
            expiry: Arc::new(StartOnce::new()),
        }
    }

    /// Number of stored links, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    fn forget_original(&self, link: &Link) {
        self.by_original
            .remove_if(&link.original_link, |_, token| *token == link.token);
    }
}

#[async_trait]
impl<C: Clock + Clone> LinkRepository for InMemoryLinkStore<C> {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            reverse_lookup: true,
            native_expiry: false,
        }
    }

    async fn get_by_token(&self, token: &Token) -> Result<Option<Link>> {
        let now = self.clock.now();

        let Some(link) = self.links.get(token.as_str()) else {
            return Ok(None);
        };

        if link.is_expired_at(now) {
            trace!(token = %token, "link expired, awaiting sweep");
            return Ok(None);
        }

        Ok(Some(link.value().clone()))
    }

    async fn get_by_original(&self, original_link: &str) -> Result<ReverseLookup> {
        let now = self.clock.now();

        let Some(token) = self.by_original.get(original_link).map(|t| t.value().clone()) else {
            return Ok(ReverseLookup::Missing);
        };

        match self.links.get(token.as_str()) {
            Some(link) if link.original_link == original_link && !link.is_expired_at(now) => {
                Ok(ReverseLookup::Found(link.value().clone()))
            }
            _ => Ok(ReverseLookup::Missing),
        }
    }

    async fn store(&self, link: &Link) -> Result<()> {
        let now = self.clock.now();

        // Check-and-insert under the shard lock: a live holder of the token
        // wins, an expired one is replaced.
        let replaced = match self.links.entry(link.token.as_str().to_owned()) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get().is_expired_at(now) {
                    return Err(StorageError::Conflict(link.token.to_string()));
                }
                Some(occupied.insert(link.clone()))
            }
            Entry::Vacant(vacant) => {
                vacant.insert(link.clone());
                None
            }
        };

        if let Some(old) = replaced.filter(|old| old.original_link != link.original_link) {
            self.forget_original(&old);
        }
        self.by_original
            .insert(link.original_link.clone(), link.token.clone());

        Ok(())
    }

    fn start_expiry_loop(&self, interval: Duration, removed: RemovedSink) -> Result<ExpiryLoop> {
        validate_interval(interval)?;
        self.expiry.claim()?;

        let reconciler =
            ExpiryReconciler::with_clock(self.clone(), self.clock.clone(), interval, removed);
        Ok(ExpiryLoop::Sweeping(reconciler.spawn()?))
    }
}

#[async_trait]
impl<C: Clock + Clone> Sweeper for InMemoryLinkStore<C> {
    async fn sweep_expired(&self, now: Timestamp) -> Result<Vec<Token>> {
        let mut removed = Vec::new();

        // The index entry goes while the link's shard is still locked, so a
        // concurrent store of the same token cannot slip in between.
        self.links.retain(|_, link| {
            if link.expires_at < now {
                self.forget_original(link);
                removed.push(link.token.clone());
                false
            } else {
                true
            }
        });

        Ok(removed)
    }
}
