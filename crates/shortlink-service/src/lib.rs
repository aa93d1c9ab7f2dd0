//! Link creation and resolution on top of a [`LinkRepository`](shortlink_core::LinkRepository).
//!
//! The service is independent of the backend that is wired in. Backends that
//! can look links up by original URL make creation idempotent; others get a
//! fresh write on every call.

pub mod error;
pub mod service;

pub use error::ServiceConfigError;
pub use service::{LinkService, LinkServiceSettings};
