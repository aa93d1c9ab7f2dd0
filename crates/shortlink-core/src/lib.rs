//! Core types and traits for the shortlink service.
//!
//! This crate provides the data model, the storage contract shared by all
//! backends, and the expiry reconciler used by backends without native TTL.

pub mod clock;
pub mod error;
pub mod expiry;
pub mod link;
pub mod repository;
pub mod shortener;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{InvalidUrlReason, LinkError, StorageError};
pub use expiry::{
    validate_interval, ExpiryLoop, ExpiryReconciler, ReconcilerHandle, RemovedSink, StartOnce,
    Sweeper,
};
pub use link::{CreatedLink, Link};
pub use repository::{Capabilities, LinkRepository, ReverseLookup};
pub use shortener::Shortener;
pub use token::Token;
