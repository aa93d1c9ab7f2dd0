//! Storage backends for the shortlink service.
//!
//! | Backend | Reverse lookup | Expiry |
//! |---|---|---|
//! | [`PostgresLinkStore`] | yes | swept by the reconciler |
//! | [`RedisLinkStore`] | no | native key TTL |
//! | [`InMemoryLinkStore`] | yes | swept by the reconciler |

pub mod memory;
pub mod postgres;
pub mod redis;

pub use memory::InMemoryLinkStore;
pub use postgres::PostgresLinkStore;
pub use self::redis::RedisLinkStore;

pub use shortlink_core::error::{Result, StorageError};
pub use shortlink_core::{Capabilities, ExpiryLoop, LinkRepository, ReverseLookup, Sweeper};
