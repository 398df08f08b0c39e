//! Filesystem artifact backend.
//!
//! Entries live in one directory per `(stage, key)`:
//!
//! ```text
//! .reelsmith-cache/
//! ├── script/
//! │   └── 9f2c.../
//! │       ├── script.json
//! │       └── manifest.json
//! ├── clip_raw/           (downloaded clips, before frame extraction)
//! ├── clip/
//! │   └── 41ab.../
//! │       ├── clip.mp4
//! │       ├── last_frame.png
//! │       └── manifest.json
//! └── narration/
//!     └── .tmp-6b0e...    (in-flight write, never read)
//! ```
//!
//! A write builds the entry in a `.tmp-<uuid>` sibling and renames the whole
//! directory into place once the manifest is written, so the final path
//! either does not exist or is complete. Opening a store removes temp
//! directories untouched for [`STALE_TEMP_AGE`]; younger ones may belong to
//! another process still writing.

use crate::{ArtifactBackend, ArtifactPayload, BlobRecord, CacheEntry, MANIFEST_FILE, Manifest};
use reelsmith_core::{CacheKey, Stage, sha256_hex};
use reelsmith_error::{ReelsmithResult, StorageError, StorageErrorKind};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

const TEMP_PREFIX: &str = ".tmp-";

/// Age after which an unfinished temp directory is considered abandoned.
pub const STALE_TEMP_AGE: Duration = Duration::from_secs(60 * 60);

/// Filesystem backend rooted at a cache directory.
#[derive(Debug, Clone)]
pub struct FileSystemBackend {
    root: PathBuf,
}

impl FileSystemBackend {
    /// Create a backend, creating the root directory if needed and
    /// discarding temp directories abandoned by interrupted writes.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created or accessed.
    pub fn new(root: impl Into<PathBuf>) -> ReelsmithResult<Self> {
        Self::with_stale_age(root, STALE_TEMP_AGE)
    }

    /// Like [`FileSystemBackend::new`], sweeping temp directories older than `stale_age`.
    #[tracing::instrument(skip(root))]
    pub fn with_stale_age(root: impl Into<PathBuf>, stale_age: Duration) -> ReelsmithResult<Self> {
        let root = root.into();

        std::fs::create_dir_all(&root).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                root.display(),
                e
            )))
        })?;

        let backend = Self { root };
        let swept = backend.sweep_incomplete(stale_age);
        tracing::info!(path = %backend.root.display(), swept, "Opened artifact store");
        Ok(backend)
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn stage_dir(&self, stage: Stage) -> PathBuf {
        self.root.join(stage.as_ref())
    }

    fn entry_dir(&self, stage: Stage, key: &CacheKey) -> PathBuf {
        self.stage_dir(stage).join(key.as_str())
    }

    fn sweep_incomplete(&self, stale_age: Duration) -> usize {
        let now = SystemTime::now();
        let mut swept = 0;
        let Ok(stages) = std::fs::read_dir(&self.root) else {
            return 0;
        };
        for stage in stages.flatten() {
            let Ok(entries) = std::fs::read_dir(stage.path()) else {
                continue;
            };
            for entry in entries.flatten() {
                if !entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX) {
                    continue;
                }
                let age = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .ok()
                    .and_then(|modified| now.duration_since(modified).ok())
                    .unwrap_or_default();
                if age < stale_age {
                    tracing::debug!(path = %entry.path().display(), "Keeping recent temp directory");
                    continue;
                }
                if std::fs::remove_dir_all(entry.path()).is_ok() {
                    swept += 1;
                }
            }
        }
        swept
    }

    async fn read_manifest(dir: &Path) -> ReelsmithResult<Option<Manifest>> {
        let path = dir.join(MANIFEST_FILE);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
                .into());
            }
        };
        let manifest = serde_json::from_slice(&data).map_err(|e| {
            StorageError::new(StorageErrorKind::Manifest(format!(
                "{}: {}",
                path.display(),
                e
            )))
        })?;
        Ok(Some(manifest))
    }

    async fn write_file(path: &Path, data: &[u8]) -> ReelsmithResult<()> {
        tokio::fs::write(path, data).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                path.display(),
                e
            )))
            .into()
        })
    }

    /// Write blobs, then the manifest, into `temp_dir`.
    async fn stage_entry(
        temp_dir: &Path,
        stage: Stage,
        key: &CacheKey,
        payload: ArtifactPayload,
    ) -> ReelsmithResult<Manifest> {
        let mut records = Vec::with_capacity(payload.blobs.len());
        for blob in &payload.blobs {
            if blob.name == MANIFEST_FILE || blob.name.contains(['/', '\\']) {
                return Err(StorageError::new(StorageErrorKind::FileWrite(format!(
                    "invalid blob name '{}'",
                    blob.name
                )))
                .into());
            }
            Self::write_file(&temp_dir.join(&blob.name), &blob.bytes).await?;
            records.push(BlobRecord {
                name: blob.name.clone(),
                sha256: sha256_hex(&blob.bytes),
                size: blob.bytes.len() as u64,
            });
        }

        let manifest = Manifest {
            stage,
            key: key.clone(),
            created_at: chrono::Utc::now(),
            blobs: records,
            metadata: payload.metadata,
        };
        let encoded = serde_json::to_vec_pretty(&manifest).map_err(|e| {
            StorageError::new(StorageErrorKind::Manifest(format!("encode: {}", e)))
        })?;
        // Manifest last: its presence marks the entry complete.
        Self::write_file(&temp_dir.join(MANIFEST_FILE), &encoded).await?;
        Ok(manifest)
    }
}

#[async_trait::async_trait]
impl ArtifactBackend for FileSystemBackend {
    #[tracing::instrument(skip(self), fields(stage = %stage, key = key.short()))]
    async fn lookup(&self, stage: Stage, key: &CacheKey) -> ReelsmithResult<Option<CacheEntry>> {
        let dir = self.entry_dir(stage, key);
        match Self::read_manifest(&dir).await? {
            Some(manifest) => {
                tracing::debug!(path = %dir.display(), "Cache probe hit");
                Ok(Some(CacheEntry::new(dir, manifest)))
            }
            None => {
                tracing::debug!("Cache probe miss");
                Ok(None)
            }
        }
    }

    #[tracing::instrument(
        skip(self, payload),
        fields(stage = %stage, key = key.short(), blobs = payload.blobs.len())
    )]
    async fn commit(
        &self,
        stage: Stage,
        key: &CacheKey,
        payload: ArtifactPayload,
    ) -> ReelsmithResult<CacheEntry> {
        let final_dir = self.entry_dir(stage, key);
        if let Some(manifest) = Self::read_manifest(&final_dir).await? {
            tracing::debug!("Entry already committed, keeping existing");
            return Ok(CacheEntry::new(final_dir, manifest));
        }
        if tokio::fs::try_exists(&final_dir).await.unwrap_or(false) {
            tracing::warn!(path = %final_dir.display(), "Discarding entry without manifest");
            let _ = tokio::fs::remove_dir_all(&final_dir).await;
        }

        let temp_dir = self
            .stage_dir(stage)
            .join(format!("{}{}", TEMP_PREFIX, Uuid::new_v4()));
        tokio::fs::create_dir_all(&temp_dir).await.map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                temp_dir.display(),
                e
            )))
        })?;

        let manifest = match Self::stage_entry(&temp_dir, stage, key, payload).await {
            Ok(manifest) => manifest,
            Err(e) => {
                let _ = tokio::fs::remove_dir_all(&temp_dir).await;
                return Err(e);
            }
        };

        match tokio::fs::rename(&temp_dir, &final_dir).await {
            Ok(()) => {
                tracing::info!(path = %final_dir.display(), "Committed artifact");
                Ok(CacheEntry::new(final_dir, manifest))
            }
            Err(e) => {
                let _ = tokio::fs::remove_dir_all(&temp_dir).await;
                // Lost a race against another writer: read back the winner.
                match Self::read_manifest(&final_dir).await? {
                    Some(existing) => {
                        tracing::debug!("Lost commit race, reading back winner");
                        Ok(CacheEntry::new(final_dir, existing))
                    }
                    None => Err(StorageError::new(StorageErrorKind::FileWrite(format!(
                        "rename {} to {}: {}",
                        temp_dir.display(),
                        final_dir.display(),
                        e
                    )))
                    .into()),
                }
            }
        }
    }

    #[tracing::instrument(skip(self, entry), fields(path = %entry.dir().display()))]
    async fn read_blob(&self, entry: &CacheEntry, name: &str) -> ReelsmithResult<Vec<u8>> {
        let record = entry.manifest().blob(name).ok_or_else(|| {
            StorageError::new(StorageErrorKind::NotFound(format!(
                "{}/{}",
                entry.dir().display(),
                name
            )))
        })?;

        let path = entry.blob_path(name);
        let data = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::new(StorageErrorKind::NotFound(path.display().to_string()))
            } else {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        })?;

        let actual = sha256_hex(&data);
        if actual != record.sha256 {
            return Err(StorageError::new(StorageErrorKind::Corrupt(format!(
                "{}: expected {}, got {}",
                path.display(),
                record.sha256,
                actual
            )))
            .into());
        }

        tracing::debug!(size = data.len(), "Read blob");
        Ok(data)
    }

    async fn keys(&self, stage: Stage) -> ReelsmithResult<Vec<CacheKey>> {
        let dir = self.stage_dir(stage);
        let mut reader = match tokio::fs::read_dir(&dir).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    dir.display(),
                    e
                )))
                .into());
            }
        };

        let mut keys = Vec::new();
        while let Ok(Some(item)) = reader.next_entry().await {
            let name = item.file_name().to_string_lossy().to_string();
            if name.starts_with(TEMP_PREFIX) {
                continue;
            }
            if tokio::fs::try_exists(item.path().join(MANIFEST_FILE))
                .await
                .unwrap_or(false)
            {
                keys.push(CacheKey::from_hex(name));
            }
        }
        keys.sort();
        Ok(keys)
    }
}
