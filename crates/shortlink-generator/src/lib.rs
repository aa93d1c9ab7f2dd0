pub mod error;
pub mod hash;

pub use error::GeneratorError;
pub use hash::{HashAlgorithm, HashTokenGenerator, HashTokenGeneratorSettings};

use shortlink_core::Token;

/// Trait for deriving tokens from original URLs.
///
/// Implementations are pure generators that don't interact with storage:
/// the same input always yields the same token. Distinct inputs may collide;
/// deciding what to do about that is up to the caller.
pub trait TokenGenerator: Send + Sync + 'static {
    fn generate(&self, input: &str) -> Token;
}

impl<G: TokenGenerator> TokenGenerator for std::sync::Arc<G> {
    fn generate(&self, input: &str) -> Token {
        (**self).generate(input)
    }
}
