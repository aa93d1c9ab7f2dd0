use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use shortlink_core::error::{Result, StorageError};
use shortlink_core::{
    Capabilities, ExpiryLoop, Link, LinkRepository, RemovedSink, StartOnce, Token,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

pub const DEFAULT_KEY_PREFIX: &str = "shortlink:";

/// Redis implementation of the repository contract.
///
/// Each link is a single string key `{prefix}{token}` holding the original
/// URL, with a millisecond TTL set to the link's expiry. Redis removes keys
/// on its own, so there is no sweep and no reverse index: lookups by
/// original URL report [`ReverseLookup::Unsupported`](shortlink_core::ReverseLookup)
/// and every create writes the key again. Concurrent writers of the same
/// token overwrite each other; the last one wins.
#[derive(Clone)]
pub struct RedisLinkStore {
    conn: MultiplexedConnection,
    key_prefix: String,
    expiry: Arc<StartOnce>,
}

impl std::fmt::Debug for RedisLinkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisLinkStore")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> StorageError {
    let message = format!("{operation}: {err}");
    if err.is_timeout() || message.to_ascii_lowercase().contains("timed out") {
        StorageError::Timeout(message)
    } else if err.is_connection_dropped() || err.is_connection_refusal() || err.is_io_error() {
        StorageError::Unavailable(message)
    } else {
        StorageError::Operation(message)
    }
}

impl RedisLinkStore {
    /// Creates a store over an existing multiplexed connection.
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self::with_prefix(conn, DEFAULT_KEY_PREFIX)
    }

    /// Creates a store whose keys start with `key_prefix` (e.g. `"myapp:link:"`).
    pub fn with_prefix(conn: MultiplexedConnection, key_prefix: impl Into<String>) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
            expiry: Arc::new(StartOnce::new()),
        }
    }

    /// Opens a multiplexed connection to `redis_url`.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| map_redis_error("invalid Redis url", e))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| map_redis_error("failed to connect to Redis", e))?;
        Ok(Self::new(conn))
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    fn link_key(&self, token: &Token) -> String {
        format!("{}{}", self.key_prefix, token)
    }
}

/// Converts a PTTL reply into an expiry instant. `None` means the key is gone.
fn expiry_from_pttl(now: Timestamp, pttl: i64) -> Option<Timestamp> {
    match pttl {
        -2 => None,
        -1 => Some(Timestamp::MAX),
        ms if ms < 0 => None,
        ms => Some(
            now.checked_add(SignedDuration::from_millis(ms))
                .unwrap_or(Timestamp::MAX),
        ),
    }
}

#[async_trait]
impl LinkRepository for RedisLinkStore {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            reverse_lookup: false,
            native_expiry: true,
        }
    }

    async fn get_by_token(&self, token: &Token) -> Result<Option<Link>> {
        let key = self.link_key(token);
        trace!(token = %token, "fetching link from Redis");

        let mut conn = self.conn.clone();
        let (original, pttl): (Option<String>, i64) = redis::pipe()
            .atomic()
            .get(&key)
            .pttl(&key)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(token = %token, error = %e, "failed to fetch link from Redis");
                map_redis_error("failed to fetch link from Redis", e)
            })?;

        let Some(original_link) = original else {
            debug!(token = %token, "link not in Redis");
            return Ok(None);
        };

        let Some(expires_at) = expiry_from_pttl(Timestamp::now(), pttl) else {
            return Ok(None);
        };

        Ok(Some(Link {
            original_link,
            token: token.clone(),
            expires_at,
        }))
    }

    async fn store(&self, link: &Link) -> Result<()> {
        let ttl = link.expires_at.duration_since(Timestamp::now());
        let ttl_ms = ttl.as_millis();
        if ttl_ms <= 0 {
            return Err(StorageError::InvalidData(format!(
                "link {} already expired at {}",
                link.token, link.expires_at
            )));
        }
        let ttl_ms = i64::try_from(ttl_ms).unwrap_or(i64::MAX);

        let key = self.link_key(&link.token);
        trace!(token = %link.token, ttl_ms, "storing link in Redis");

        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(&key, &link.original_link)
            .await
            .map_err(|e| {
                warn!(token = %link.token, error = %e, "failed to store link in Redis");
                map_redis_error("failed to store link in Redis", e)
            })?;

        // The key now exists without a TTL. A failure here leaves it that way.
        match conn.pexpire::<_, bool>(&key, ttl_ms).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(token = %link.token, "Redis key vanished before its TTL was set");
                return Err(StorageError::Operation(format!(
                    "failed to set expiry on Redis key {key}: key does not exist"
                )));
            }
            Err(e) => {
                warn!(token = %link.token, error = %e, "failed to set TTL on Redis key");
                return Err(StorageError::Operation(format!(
                    "failed to set expiry on Redis key {key}: {e}"
                )));
            }
        }

        debug!(token = %link.token, "stored link in Redis");
        Ok(())
    }

    fn start_expiry_loop(&self, interval: Duration, _removed: RemovedSink) -> Result<ExpiryLoop> {
        self.expiry.claim()?;
        debug!(interval = ?interval, "Redis expires keys natively, no sweep started");
        Ok(ExpiryLoop::Native)
    }
}
