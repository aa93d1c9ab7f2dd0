//! Disposable containers for integration tests.

mod error;
mod postgres;
mod redis;

pub use error::{Result, TestInfraError};
pub use postgres::{PostgresConfig, PostgresServer};
pub use redis::RedisServer;
