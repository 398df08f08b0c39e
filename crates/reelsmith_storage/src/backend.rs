//! Storage backend trait.

use crate::{ArtifactPayload, CacheEntry};
use reelsmith_core::{CacheKey, Stage};
use reelsmith_error::ReelsmithResult;

/// Trait for pluggable artifact backends.
///
/// Implementations must guarantee that an entry is either absent or complete:
/// a reader never observes an entry whose blobs are partially written.
#[async_trait::async_trait]
pub trait ArtifactBackend: Send + Sync {
    /// Look up a completed entry.
    async fn lookup(&self, stage: Stage, key: &CacheKey) -> ReelsmithResult<Option<CacheEntry>>;

    /// Persist an entry.
    ///
    /// Entries are write-once. If another writer already committed the same
    /// `(stage, key)`, the existing entry is returned and `payload` is
    /// discarded.
    async fn commit(
        &self,
        stage: Stage,
        key: &CacheKey,
        payload: ArtifactPayload,
    ) -> ReelsmithResult<CacheEntry>;

    /// Read one blob of an entry, verifying its recorded hash.
    async fn read_blob(&self, entry: &CacheEntry, name: &str) -> ReelsmithResult<Vec<u8>>;

    /// Keys of every completed entry in a stage.
    async fn keys(&self, stage: Stage) -> ReelsmithResult<Vec<CacheKey>>;
}
