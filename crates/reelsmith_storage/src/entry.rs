//! Entry, manifest and payload types.

use chrono::{DateTime, Utc};
use reelsmith_core::{CacheKey, Stage};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File name of the completion marker inside each entry directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// A named binary blob to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// File name inside the entry
    pub name: String,
    /// Content
    pub bytes: Vec<u8>,
}

impl Blob {
    /// Create a blob.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Serialize a value as a pretty-printed JSON blob.
    pub fn json<T: Serialize>(
        name: impl Into<String>,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(name, serde_json::to_vec_pretty(value)?))
    }
}

/// Everything a producer hands to the store for one entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPayload {
    /// Blobs to persist
    pub blobs: Vec<Blob>,
    /// Free-form metadata recorded in the manifest
    pub metadata: serde_json::Value,
}

impl ArtifactPayload {
    /// Payload with no metadata.
    pub fn new(blobs: Vec<Blob>) -> Self {
        Self {
            blobs,
            metadata: serde_json::Value::Null,
        }
    }

    /// Attach manifest metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Hash and size of one stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRecord {
    /// File name inside the entry
    pub name: String,
    /// SHA-256 of the content
    pub sha256: String,
    /// Size in bytes
    pub size: u64,
}

/// Completion marker written last into each entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Stage the entry belongs to
    pub stage: Stage,
    /// Cache key of the entry
    pub key: CacheKey,
    /// When the entry was committed
    pub created_at: DateTime<Utc>,
    /// Stored blobs
    pub blobs: Vec<BlobRecord>,
    /// Producer metadata
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Manifest {
    /// Record for a named blob.
    pub fn blob(&self, name: &str) -> Option<&BlobRecord> {
        self.blobs.iter().find(|b| b.name == name)
    }
}

/// A completed, readable entry.
#[derive(Debug, Clone, PartialEq, derive_getters::Getters)]
pub struct CacheEntry {
    /// Directory holding the entry's blobs
    dir: PathBuf,
    /// Parsed manifest
    manifest: Manifest,
}

impl CacheEntry {
    /// Wrap a directory and its manifest.
    pub fn new(dir: impl Into<PathBuf>, manifest: Manifest) -> Self {
        Self {
            dir: dir.into(),
            manifest,
        }
    }

    /// Path a blob is stored at.
    pub fn blob_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// SHA-256 of a blob, as recorded when the entry was committed.
    pub fn blob_hash(&self, name: &str) -> Option<&str> {
        self.manifest.blob(name).map(|b| b.sha256.as_str())
    }

    /// Stage of the entry.
    pub fn stage(&self) -> Stage {
        self.manifest.stage
    }

    /// Cache key of the entry.
    pub fn key(&self) -> &CacheKey {
        &self.manifest.key
    }

    /// Producer metadata.
    pub fn metadata(&self) -> &serde_json::Value {
        &self.manifest.metadata
    }
}
