//! Stage-addressed artifact store for Reelsmith.
//!
//! Every intermediate output of a run (analysis bundle, brief, script,
//! per-scene clips and frames, narration audio, final video) is persisted as
//! a write-once entry addressed by `(stage, cache key)`.
//!
//! # Features
//!
//! - **Write-once entries**: an entry becomes visible only after all of its
//!   blobs and its manifest are on disk
//! - **Verified reads**: every blob is checked against the SHA-256 recorded
//!   in the manifest
//! - **Single-flight compute**: [`ArtifactStore::compute_or_fetch`] runs the
//!   producer at most once per key, concurrent callers read the winner's entry
//!
//! # Example
//!
//! ```rust
//! use reelsmith_core::{CacheKey, Stage};
//! use reelsmith_storage::{ArtifactPayload, ArtifactStore, Blob};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = ArtifactStore::open("/tmp/reelsmith-cache")?;
//! let key = CacheKey::from_hex("0123abcd");
//!
//! let fetched = store
//!     .compute_or_fetch(Stage::Narration, &key, || async {
//!         Ok(ArtifactPayload::new(vec![Blob::new("audio.mp3", vec![0u8; 16])]))
//!     })
//!     .await?;
//!
//! let bytes = store.read_blob(&fetched.entry, "audio.mp3").await?;
//! assert_eq!(bytes.len(), 16);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod entry;
mod filesystem;
mod store;

pub use backend::ArtifactBackend;
pub use entry::{ArtifactPayload, Blob, BlobRecord, CacheEntry, MANIFEST_FILE, Manifest};
pub use filesystem::{FileSystemBackend, STALE_TEMP_AGE};
pub use reelsmith_error::{StorageError, StorageErrorKind};
pub use store::{ArtifactStore, Fetched, Provenance};
