use async_trait::async_trait;
use jiff::Timestamp;
use shortlink_core::error::{Result, StorageError};
use shortlink_core::{
    validate_interval, Capabilities, ExpiryLoop, ExpiryReconciler, Link, LinkRepository,
    RemovedSink, ReverseLookup, StartOnce, Sweeper, Token,
};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const SCHEMA: &str = include_str!("../ddl/postgres/links.sql");

/// Postgres implementation of the repository contract.
///
/// `expires_at` is stored as Unix milliseconds. Reads only return live links
/// (`expires_at > now`). Expired rows stay in the table until the reconciler
/// deletes them; an insert that collides with an expired row replaces it,
/// while a collision with a live row is a `Conflict`.
///
/// Two concurrent creations of the same URL both insert the same token; the
/// database accepts the first and the second gets `Conflict`.
#[derive(Debug, Clone)]
pub struct PostgresLinkStore {
    pool: PgPool,
    expiry: Arc<StartOnce>,
}

impl PostgresLinkStore {
    /// Creates a repository from an existing Postgres connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            expiry: Arc::new(StartOnce::new()),
        }
    }

    /// Creates a repository by opening a new Postgres connection pool.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Creates the `links` table and its indexes if they don't exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn parse_expires_at(millis: i64) -> Result<Timestamp> {
    Timestamp::from_millisecond(millis).map_err(|e| {
        StorageError::InvalidData(format!("invalid expires_at timestamp '{}': {e}", millis))
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

fn link_from_row(row: &PgRow) -> Result<Link> {
    let token: String = row.try_get("token").map_err(map_sqlx_error)?;
    let original_link: String = row.try_get("original_link").map_err(map_sqlx_error)?;
    let expires_at: i64 = row.try_get("expires_at").map_err(map_sqlx_error)?;

    Ok(Link {
        original_link,
        token: Token::new(token),
        expires_at: parse_expires_at(expires_at)?,
    })
}

#[async_trait]
impl LinkRepository for PostgresLinkStore {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            reverse_lookup: true,
            native_expiry: false,
        }
    }

    async fn get_by_token(&self, token: &Token) -> Result<Option<Link>> {
        let now = Timestamp::now().as_millisecond();

        let row = sqlx::query(
            r#"
            SELECT token, original_link, expires_at
            FROM links
            WHERE token = $1
              AND expires_at > $2
            LIMIT 1
            "#,
        )
        .bind(token.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(link_from_row).transpose()
    }

    async fn get_by_original(&self, original_link: &str) -> Result<ReverseLookup> {
        let now = Timestamp::now().as_millisecond();

        let row = sqlx::query(
            r#"
            SELECT token, original_link, expires_at
            FROM links
            WHERE original_link = $1
              AND expires_at > $2
            ORDER BY expires_at DESC
            LIMIT 1
            "#,
        )
        .bind(original_link)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(row) => Ok(ReverseLookup::Found(link_from_row(&row)?)),
            None => Ok(ReverseLookup::Missing),
        }
    }

    async fn store(&self, link: &Link) -> Result<()> {
        let now = Timestamp::now().as_millisecond();

        let result = sqlx::query(
            r#"
            INSERT INTO links (token, original_link, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (token) DO UPDATE
              SET original_link = EXCLUDED.original_link,
                  expires_at = EXCLUDED.expires_at
              WHERE links.expires_at <= $4
            "#,
        )
        .bind(link.token.as_str())
        .bind(&link.original_link)
        .bind(link.expires_at.as_millisecond())
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() > 0 => Ok(()),
            Ok(_) => Err(StorageError::Conflict(link.token.to_string())),
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::Conflict(link.token.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    fn start_expiry_loop(&self, interval: Duration, removed: RemovedSink) -> Result<ExpiryLoop> {
        validate_interval(interval)?;
        self.expiry.claim()?;

        debug!(interval = ?interval, "starting postgres expiry sweep");
        let reconciler = ExpiryReconciler::new(self.clone(), interval, removed);
        Ok(ExpiryLoop::Sweeping(reconciler.spawn()?))
    }
}

#[async_trait]
impl Sweeper for PostgresLinkStore {
    async fn sweep_expired(&self, now: Timestamp) -> Result<Vec<Token>> {
        let rows = sqlx::query(
            r#"
            DELETE FROM links
            WHERE expires_at < $1
            RETURNING token
            "#,
        )
        .bind(now.as_millisecond())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("token")
                    .map(Token::new)
                    .map_err(map_sqlx_error)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_map_to_availability() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            StorageError::Timeout(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolClosed),
            StorageError::Unavailable(_)
        ));
    }

    #[test]
    fn decode_errors_map_to_invalid_data() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            StorageError::InvalidData(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::ColumnNotFound("token".to_string())),
            StorageError::InvalidData(_)
        ));
    }

    #[test]
    fn expires_at_round_trips_through_millis() {
        let at = Timestamp::from_millisecond(1_700_000_000_123).unwrap();
        assert_eq!(parse_expires_at(at.as_millisecond()).unwrap(), at);
    }

    #[test]
    fn schema_creates_links_table() {
        assert!(SCHEMA.contains("CREATE TABLE IF NOT EXISTS links"));
        assert!(SCHEMA.contains("PRIMARY KEY"));
    }
}
