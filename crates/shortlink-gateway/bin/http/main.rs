mod cli;

use crate::cli::{LogFormat, StorageBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use jiff::SignedDuration;
use shortlink_core::{LinkRepository, Token};
use shortlink_gateway::{App, AppState};
use shortlink_generator::{HashTokenGenerator, HashTokenGeneratorSettings};
use shortlink_service::{LinkService, LinkServiceSettings};
use shortlink_storage::{InMemoryLinkStore, PostgresLinkStore, RedisLinkStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Batches of removed tokens buffered before the reconciler starts dropping them.
const REMOVED_BATCH_BUFFER: usize = 16;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    init_tracing(config.log_format);

    info!(
        listen_addr = %config.listen_addr,
        storage_backend = %config.storage,
        hash = %config.hash,
        token_length = config.token_length,
        link_ttl_secs = config.link_ttl_secs,
        "starting shortlink HTTP server"
    );

    let generator = HashTokenGenerator::new(
        HashTokenGeneratorSettings::builder()
            .alphabet(config.alphabet.clone())
            .length(config.token_length)
            .algorithm(config.hash)
            .build(),
    )
    .context("invalid token generator settings")?;

    match config.storage {
        StorageBackendArg::InMemory => {
            run_server(&config, InMemoryLinkStore::new(), generator).await
        }
        StorageBackendArg::Postgres => {
            let dsn = config
                .postgres_dsn
                .as_deref()
                .context("postgres dsn is required when storage backend is postgres")?;
            let repository = PostgresLinkStore::connect(dsn, config.postgres_pool_max)
                .await
                .context("failed to connect to postgres")?;
            repository
                .ensure_schema()
                .await
                .context("failed to create postgres schema")?;
            run_server(&config, repository, generator).await
        }
        StorageBackendArg::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .context("redis url is required when storage backend is redis")?;
            let repository = RedisLinkStore::connect(url)
                .await
                .context("failed to connect to redis")?;
            run_server(&config, repository, generator).await
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run_server<R: LinkRepository>(
    config: &CLI,
    repository: R,
    generator: HashTokenGenerator,
) -> anyhow::Result<()> {
    let (removed_tx, removed_rx) = mpsc::channel(REMOVED_BATCH_BUFFER);
    let expiry = repository
        .start_expiry_loop(Duration::from_secs(config.sweep_interval_secs), removed_tx)
        .context("failed to start expiry loop")?;
    if expiry.is_native() {
        info!("backend expires links natively");
    } else {
        info!(
            sweep_interval_secs = config.sweep_interval_secs,
            "expiry sweep started"
        );
    }
    let removed_logger = tokio::spawn(log_removed_batches(removed_rx));

    let settings = LinkServiceSettings::builder()
        .short_link_prefix(config.short_link_prefix())
        .link_ttl(SignedDuration::from_secs(config.link_ttl_secs))
        .build();
    let service = LinkService::new(repository, generator, settings)
        .context("invalid link service settings")?;

    let app = App::router(
        AppState::new(Arc::new(service)),
        Duration::from_millis(config.request_timeout_ms),
    );

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!(listen_addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;

    info!("shutting down");
    expiry.stop().await;
    if let Err(e) = removed_logger.await {
        warn!(error = %e, "removed-token logger ended abnormally");
    }

    Ok(())
}

async fn log_removed_batches(mut removed: mpsc::Receiver<Vec<Token>>) {
    while let Some(batch) = removed.recv().await {
        if batch.is_empty() {
            debug!("expiry sweep removed nothing");
            continue;
        }
        info!(count = batch.len(), "expired links removed");
        debug!(tokens = ?batch, "removed tokens");
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c, serving until killed");
        std::future::pending::<()>().await;
    }
}
