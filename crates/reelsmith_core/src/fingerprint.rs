//! Deterministic fingerprints and cache keys.
//!
//! Every key is a SHA-256 over length-prefixed, labelled fields, so two
//! different field sequences can never collide by concatenation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Compute the lowercase hex SHA-256 of raw bytes.
///
/// # Examples
///
/// ```
/// use reelsmith_core::sha256_hex;
///
/// assert_eq!(sha256_hex(b"").len(), 64);
/// assert_eq!(sha256_hex(b"abc"), sha256_hex(b"abc"));
/// ```
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Incremental builder for labelled fingerprints.
///
/// # Examples
///
/// ```
/// use reelsmith_core::Fingerprinter;
///
/// let a = Fingerprinter::new("clip").field("scene", "0").field("seed", "none").finish();
/// let b = Fingerprinter::new("clip").field("scene", "0").field("seed", "none").finish();
/// assert_eq!(a, b);
/// ```
#[derive(Clone)]
pub struct Fingerprinter {
    hasher: Sha256,
}

impl Fingerprinter {
    /// Start a fingerprint in the given domain.
    pub fn new(domain: &str) -> Self {
        let mut fp = Self {
            hasher: Sha256::new(),
        };
        fp.absorb(domain.as_bytes());
        fp
    }

    fn absorb(&mut self, bytes: &[u8]) {
        self.hasher.update((bytes.len() as u64).to_le_bytes());
        self.hasher.update(bytes);
    }

    /// Add a labelled string field.
    pub fn field(mut self, label: &str, value: impl AsRef<str>) -> Self {
        self.absorb(label.as_bytes());
        self.absorb(value.as_ref().as_bytes());
        self
    }

    /// Add a labelled binary field.
    pub fn bytes(mut self, label: &str, value: &[u8]) -> Self {
        self.absorb(label.as_bytes());
        self.absorb(value);
        self
    }

    /// Finish into a cache key.
    pub fn finish(self) -> CacheKey {
        CacheKey(format!("{:x}", self.hasher.finalize()))
    }
}

/// Deterministic fingerprint of a stage's inputs.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap an existing hex digest.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
