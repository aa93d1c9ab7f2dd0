use crate::error::GeneratorError;
use crate::TokenGenerator;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512, Sha512_256};
use shortlink_core::Token;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use typed_builder::TypedBuilder;

pub const DEFAULT_ALPHABET: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_";
pub const DEFAULT_LENGTH: usize = 10;

/// Fixed-output hash functions a [`HashTokenGenerator`] can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    Sha224,
    #[default]
    Sha256,
    Sha384,
    Sha512,
    Sha512_256,
}

impl HashAlgorithm {
    /// Size of the digest in bytes.
    pub const fn digest_len(self) -> usize {
        match self {
            HashAlgorithm::Sha224 => 28,
            HashAlgorithm::Sha256 | HashAlgorithm::Sha512_256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha224 => "sha224",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Sha512_256 => "sha512-256",
        }
    }

    fn digest(self, bytes: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha224 => Sha224::digest(bytes).to_vec(),
            HashAlgorithm::Sha256 => Sha256::digest(bytes).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(bytes).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(bytes).to_vec(),
            HashAlgorithm::Sha512_256 => Sha512_256::digest(bytes).to_vec(),
        }
    }
}

impl Display for HashAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha224" => Ok(HashAlgorithm::Sha224),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            "sha512-256" | "sha512_256" => Ok(HashAlgorithm::Sha512_256),
            other => Err(GeneratorError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Configures a [`HashTokenGenerator`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct HashTokenGeneratorSettings {
    /// Characters tokens are drawn from, in order. Duplicates are kept.
    #[builder(default = DEFAULT_ALPHABET.to_string(), setter(into))]
    pub alphabet: String,
    /// Number of characters in every token.
    #[builder(default = DEFAULT_LENGTH)]
    pub length: usize,
    #[builder(default)]
    pub algorithm: HashAlgorithm,
}

/// Derives tokens by truncating a hash of the input.
///
/// Byte `i` of the digest selects character `digest[i] % alphabet.len()` for
/// position `i` of the token. This is a pseudo-uniform mapping, not a
/// collision-free id scheme: two inputs share a token with probability about
/// `1 / alphabet_len^length`.
#[derive(Debug, Clone)]
pub struct HashTokenGenerator {
    alphabet: Vec<char>,
    length: usize,
    algorithm: HashAlgorithm,
}

impl HashTokenGenerator {
    /// Creates a generator, rejecting settings that could never produce a
    /// full-length token.
    pub fn new(settings: HashTokenGeneratorSettings) -> Result<Self, GeneratorError> {
        let alphabet: Vec<char> = settings.alphabet.chars().collect();
        if alphabet.is_empty() {
            return Err(GeneratorError::EmptyAlphabet);
        }
        if settings.length == 0 {
            return Err(GeneratorError::ZeroLength);
        }
        if settings.length > settings.algorithm.digest_len() {
            return Err(GeneratorError::DigestTooShort {
                length: settings.length,
                digest_len: settings.algorithm.digest_len(),
                algorithm: settings.algorithm.name(),
            });
        }

        Ok(Self {
            alphabet,
            length: settings.length,
            algorithm: settings.algorithm,
        })
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}

impl TokenGenerator for HashTokenGenerator {
    fn generate(&self, input: &str) -> Token {
        let digest = self.algorithm.digest(input.as_bytes());

        let token: String = digest
            .iter()
            .take(self.length)
            .map(|byte| self.alphabet[usize::from(*byte) % self.alphabet.len()])
            .collect();

        Token::new(token)
    }
}
