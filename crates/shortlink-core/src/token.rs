use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// The identifier of a short link.
///
/// Tokens are produced by a token generator from the original URL, but a
/// token arriving from a caller is taken as-is: an unknown or malformed
/// token simply resolves to nothing.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Generates the full short link by appending the token to `prefix`.
    ///
    /// No separator is added, so a path prefix should end with `/`.
    pub fn to_url(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.0)
    }

    /// Returns the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}
