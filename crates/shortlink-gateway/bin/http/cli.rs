use clap::{Parser, ValueEnum};
use shortlink_generator::hash::{DEFAULT_ALPHABET, DEFAULT_LENGTH};
use shortlink_generator::HashAlgorithm;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;

pub const LISTEN_ADDR_ENV: &str = "SHORTLINK_LISTEN_ADDR";
pub const PUBLIC_HOST_ENV: &str = "SHORTLINK_PUBLIC_HOST";
pub const PUBLIC_PORT_ENV: &str = "SHORTLINK_PUBLIC_PORT";
pub const STORAGE_BACKEND_ENV: &str = "SHORTLINK_STORAGE_BACKEND";
pub const POSTGRES_DSN_ENV: &str = "SHORTLINK_POSTGRES_DSN";
pub const POSTGRES_POOL_MAX_ENV: &str = "SHORTLINK_POSTGRES_POOL_MAX";
pub const REDIS_URL_ENV: &str = "SHORTLINK_REDIS_URL";
pub const ALPHABET_ENV: &str = "SHORTLINK_ALPHABET";
pub const TOKEN_LENGTH_ENV: &str = "SHORTLINK_TOKEN_LENGTH";
pub const HASH_ENV: &str = "SHORTLINK_HASH";
pub const LINK_TTL_SECS_ENV: &str = "SHORTLINK_LINK_TTL_SECS";
pub const SWEEP_INTERVAL_SECS_ENV: &str = "SHORTLINK_SWEEP_INTERVAL_SECS";
pub const REQUEST_TIMEOUT_MS_ENV: &str = "SHORTLINK_REQUEST_TIMEOUT_MS";
pub const LOG_FORMAT_ENV: &str = "SHORTLINK_LOG_FORMAT";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_PUBLIC_HOST: &str = "localhost";
pub const DEFAULT_PUBLIC_PORT: u16 = 8080;
pub const DEFAULT_POSTGRES_POOL_MAX: u32 = 10;
pub const DEFAULT_LINK_TTL_SECS: i64 = 24 * 60 * 60;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60 * 60;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "postgres")]
    Postgres,
    #[value(name = "redis")]
    Redis,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Postgres => write!(f, "postgres"),
            StorageBackendArg::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "shortlink-http-server")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Host used to build short links handed back to clients.
    #[arg(long, env = PUBLIC_HOST_ENV, default_value = DEFAULT_PUBLIC_HOST)]
    pub public_host: String,

    #[arg(long, env = PUBLIC_PORT_ENV, default_value_t = DEFAULT_PUBLIC_PORT)]
    pub public_port: u16,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = POSTGRES_DSN_ENV, required_if_eq("storage", "postgres"))]
    pub postgres_dsn: Option<String>,

    #[arg(long, env = POSTGRES_POOL_MAX_ENV, default_value_t = DEFAULT_POSTGRES_POOL_MAX)]
    pub postgres_pool_max: u32,

    #[arg(long, env = REDIS_URL_ENV, required_if_eq("storage", "redis"))]
    pub redis_url: Option<String>,

    #[arg(long, env = ALPHABET_ENV, default_value = DEFAULT_ALPHABET)]
    pub alphabet: String,

    #[arg(long, env = TOKEN_LENGTH_ENV, default_value_t = DEFAULT_LENGTH)]
    pub token_length: usize,

    #[arg(long, env = HASH_ENV, default_value_t = HashAlgorithm::Sha256)]
    pub hash: HashAlgorithm,

    #[arg(long, env = LINK_TTL_SECS_ENV, default_value_t = DEFAULT_LINK_TTL_SECS)]
    pub link_ttl_secs: i64,

    /// How often backends without native expiry sweep expired links.
    #[arg(long, env = SWEEP_INTERVAL_SECS_ENV, default_value_t = DEFAULT_SWEEP_INTERVAL_SECS)]
    pub sweep_interval_secs: u64,

    #[arg(long, env = REQUEST_TIMEOUT_MS_ENV, default_value_t = DEFAULT_REQUEST_TIMEOUT_MS)]
    pub request_timeout_ms: u64,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl CLI {
    /// `http://{public_host}:{public_port}/api/v1/url/`
    pub fn short_link_prefix(&self) -> String {
        format!(
            "http://{}:{}{}/",
            self.public_host,
            self.public_port,
            shortlink_gateway::app::LINK_PATH
        )
    }
}
