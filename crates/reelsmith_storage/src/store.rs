//! Artifact store with single-flight compute-or-fetch.

use crate::{ArtifactBackend, ArtifactPayload, CacheEntry, FileSystemBackend};
use reelsmith_core::{CacheKey, Stage};
use reelsmith_error::{JsonError, ReelsmithResult, StorageError, StorageErrorKind};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Where a fetched entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum Provenance {
    /// Entry already existed, producer not run
    #[display("cache hit")]
    Hit,
    /// Producer ran and its output was committed
    #[display("computed")]
    Computed,
}

/// Result of [`ArtifactStore::compute_or_fetch`].
#[derive(Debug, Clone)]
pub struct Fetched {
    /// Completed entry
    pub entry: CacheEntry,
    /// Whether the producer ran
    pub provenance: Provenance,
}

impl Fetched {
    /// Whether the entry was served from the cache.
    pub fn is_hit(&self) -> bool {
        self.provenance == Provenance::Hit
    }
}

type FlightMap = HashMap<(Stage, CacheKey), Arc<tokio::sync::Mutex<()>>>;

/// Shared, append-only record of a run's artifacts.
///
/// Cloning is cheap; clones share the backend and the in-flight table.
#[derive(Clone)]
pub struct ArtifactStore {
    backend: Arc<dyn ArtifactBackend>,
    in_flight: Arc<Mutex<FlightMap>>,
    root: Option<PathBuf>,
}

impl std::fmt::Debug for ArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactStore")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl ArtifactStore {
    /// Open a filesystem store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns error if the root directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> ReelsmithResult<Self> {
        let backend = FileSystemBackend::new(root)?;
        let root = backend.root().to_path_buf();
        let mut store = Self::with_backend(Arc::new(backend));
        store.root = Some(root);
        Ok(store)
    }

    /// Wrap an arbitrary backend.
    pub fn with_backend(backend: Arc<dyn ArtifactBackend>) -> Self {
        Self {
            backend,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            root: None,
        }
    }

    /// Root directory for filesystem stores.
    pub fn root(&self) -> Option<&PathBuf> {
        self.root.as_ref()
    }

    /// Look up a completed entry.
    pub async fn get(&self, stage: Stage, key: &CacheKey) -> ReelsmithResult<Option<CacheEntry>> {
        self.backend.lookup(stage, key).await
    }

    /// Whether a completed entry exists.
    pub async fn contains(&self, stage: Stage, key: &CacheKey) -> ReelsmithResult<bool> {
        Ok(self.backend.lookup(stage, key).await?.is_some())
    }

    /// Persist an entry, returning the existing one if already committed.
    pub async fn put(
        &self,
        stage: Stage,
        key: &CacheKey,
        payload: ArtifactPayload,
    ) -> ReelsmithResult<CacheEntry> {
        self.backend.commit(stage, key, payload).await
    }

    /// Read a blob, verifying its hash.
    pub async fn read_blob(&self, entry: &CacheEntry, name: &str) -> ReelsmithResult<Vec<u8>> {
        self.backend.read_blob(entry, name).await
    }

    /// Read and decode a JSON blob.
    pub async fn read_json<T: DeserializeOwned>(
        &self,
        entry: &CacheEntry,
        name: &str,
    ) -> ReelsmithResult<T> {
        let data = self.read_blob(entry, name).await?;
        serde_json::from_slice(&data).map_err(|e| {
            JsonError::new(format!("{}/{}: {}", entry.dir().display(), name, e)).into()
        })
    }

    /// Verify every blob of an entry against its manifest.
    pub async fn verify(&self, entry: &CacheEntry) -> ReelsmithResult<()> {
        for record in &entry.manifest().blobs {
            self.read_blob(entry, &record.name).await?;
        }
        Ok(())
    }

    /// Keys of all completed entries in a stage.
    pub async fn keys(&self, stage: Stage) -> ReelsmithResult<Vec<CacheKey>> {
        self.backend.keys(stage).await
    }

    /// Look up an entry that must exist.
    pub async fn require(&self, stage: Stage, key: &CacheKey) -> ReelsmithResult<CacheEntry> {
        self.get(stage, key).await?.ok_or_else(|| {
            StorageError::new(StorageErrorKind::NotFound(format!("{}/{}", stage, key))).into()
        })
    }

    fn flight_lock(&self, stage: Stage, key: &CacheKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        map.entry((stage, key.clone()))
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn release_flight(&self, stage: Stage, key: &CacheKey) {
        let mut map = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        let flight = (stage, key.clone());
        let idle = map
            .get(&flight)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            map.remove(&flight);
        }
    }

    /// Return the entry for `(stage, key)`, running `producer` only if absent.
    ///
    /// Concurrent callers for the same key within this process are collapsed:
    /// exactly one runs the producer and the rest read back its entry. Across
    /// processes the backend's write-once commit makes the first writer win.
    /// A failing producer commits nothing, so the next caller retries.
    #[tracing::instrument(skip(self, producer), fields(stage = %stage, key = key.short()))]
    pub async fn compute_or_fetch<F, Fut>(
        &self,
        stage: Stage,
        key: &CacheKey,
        producer: F,
    ) -> ReelsmithResult<Fetched>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = ReelsmithResult<ArtifactPayload>> + Send,
    {
        if let Some(entry) = self.backend.lookup(stage, key).await? {
            tracing::info!("Cache hit");
            return Ok(Fetched {
                entry,
                provenance: Provenance::Hit,
            });
        }

        let lock = self.flight_lock(stage, key);
        let result = {
            let _guard = lock.lock().await;
            match self.backend.lookup(stage, key).await {
                Ok(Some(entry)) => {
                    tracing::info!("Cache hit after waiting on concurrent producer");
                    Ok(Fetched {
                        entry,
                        provenance: Provenance::Hit,
                    })
                }
                Ok(None) => match producer().await {
                    Ok(payload) => self
                        .backend
                        .commit(stage, key, payload)
                        .await
                        .map(|entry| Fetched {
                            entry,
                            provenance: Provenance::Computed,
                        }),
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            }
        };
        drop(lock);
        self.release_flight(stage, key);
        result
    }
}
