//! Clip chain: sequential, frame-seeded clip generation.
//!
//! Scene `i` is generated from its prompt plus the last frame of scene
//! `i - 1`. Each clip is cached under a key covering the scene content and
//! the seed frame hash, so a re-run reuses every clip whose inputs are
//! unchanged and resumes at the first missing one.
//!
//! The download is committed to [`Stage::ClipRaw`] before any local work.
//! Frame extraction then builds the [`Stage::Clip`] entry from it, so a
//! local failure never discards a paid clip.

use reelsmith_compose::MediaEncoder;
use reelsmith_core::{ClipArtifact, Resolution, Scene, Stage, sha256_hex};
use reelsmith_error::{
    ClipError, ClipErrorKind, JsonError, ReelsmithError, ReelsmithErrorKind, ReelsmithResult,
    StorageError, StorageErrorKind,
};
use reelsmith_models::{PollConfig, VideoRequest, VideoSynthesizer, poll_until_terminal};
use reelsmith_rate_limit::RetryPolicy;
use reelsmith_storage::{ArtifactPayload, ArtifactStore, Blob, CacheEntry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Blob name of the clip inside a clip entry.
pub const CLIP_BLOB: &str = "clip.mp4";
/// Blob name of the extracted last frame inside a clip entry.
pub const FRAME_BLOB: &str = "last_frame.png";

/// Manifest metadata recorded with each clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ClipMetadata {
    scene_index: usize,
    job_id: String,
    seed_frame_hash: Option<String>,
    duration_ms: Option<u64>,
}

/// Generates and caches the clip for each scene.
#[derive(Clone)]
pub struct ClipChain {
    video: Arc<dyn VideoSynthesizer>,
    encoder: Arc<dyn MediaEncoder>,
    store: ArtifactStore,
    poll: PollConfig,
    retry: RetryPolicy,
    resolution: Resolution,
    cancel: CancellationToken,
}

impl std::fmt::Debug for ClipChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipChain")
            .field("model", &self.video.model_name())
            .field("poll", &self.poll)
            .field("retry", &self.retry)
            .field("resolution", &self.resolution)
            .finish_non_exhaustive()
    }
}

impl ClipChain {
    /// Chain using the given services and store.
    pub fn new(
        video: Arc<dyn VideoSynthesizer>,
        encoder: Arc<dyn MediaEncoder>,
        store: ArtifactStore,
    ) -> Self {
        Self {
            video,
            encoder,
            store,
            poll: PollConfig::default(),
            retry: RetryPolicy::default(),
            resolution: Resolution::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Polling cadence and per-job timeout.
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Retry policy around submit-and-poll.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Requested clip resolution.
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Token that aborts polling.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Video model, part of every clip key.
    pub fn model_name(&self) -> &str {
        self.video.model_name()
    }

    /// Look up a cached clip without generating anything.
    pub async fn cached(
        &self,
        scene: &Scene,
        seed_frame_hash: Option<&str>,
    ) -> ReelsmithResult<Option<ClipArtifact>> {
        let key = ClipArtifact::key_for(scene, self.model_name(), seed_frame_hash);
        match self.store.get(Stage::Clip, &key).await? {
            Some(entry) => Ok(Some(artifact_from_entry(&entry)?)),
            None => Ok(None),
        }
    }

    /// Produce the clip for `scene`, seeded by `prior` for every scene after the first.
    ///
    /// # Errors
    ///
    /// - `ContinuityViolation` if the seed is missing, out of order, or its
    ///   stored frame does not match the recorded hash
    /// - `ClipGenerationFailed` once the retry budget is spent
    #[instrument(skip(self, scene, prior), fields(scene_index = scene.index))]
    pub async fn generate(
        &self,
        scene: &Scene,
        prior: Option<&ClipArtifact>,
    ) -> ReelsmithResult<ClipArtifact> {
        let seed = self.seed_frame(scene.index, prior).await?;
        let seed_hash = seed.as_ref().map(|(hash, _)| hash.as_str());
        let key = ClipArtifact::key_for(scene, self.model_name(), seed_hash);

        let fetched = self
            .store
            .compute_or_fetch(Stage::Clip, &key, || async {
                let downloaded = self
                    .store
                    .compute_or_fetch(Stage::ClipRaw, &key, || async {
                        self.download(
                            scene,
                            seed.as_ref().map(|(h, bytes)| (h.as_str(), bytes.as_slice())),
                        )
                        .await
                    })
                    .await?;
                if downloaded.is_hit() {
                    debug!("Reusing downloaded clip");
                }
                self.post_process(scene.index, &downloaded.entry).await
            })
            .await?;

        let artifact = artifact_from_entry(&fetched.entry)?;
        if artifact.seed_frame_hash().as_deref() != seed_hash {
            return Err(continuity(
                scene.index,
                format!(
                    "cached clip was seeded by {} but the prior frame is {}",
                    artifact.seed_label(),
                    seed_hash.unwrap_or(reelsmith_core::NO_SEED)
                ),
            ));
        }

        info!(
            key = fetched.entry.key().short(),
            provenance = %fetched.provenance,
            job_id = %artifact.job_id(),
            "Clip ready"
        );
        Ok(artifact)
    }

    /// Verified seed frame for a scene: `(hash, png bytes)`.
    async fn seed_frame(
        &self,
        scene_index: usize,
        prior: Option<&ClipArtifact>,
    ) -> ReelsmithResult<Option<(String, Vec<u8>)>> {
        if scene_index == 0 {
            return Ok(None);
        }
        let prior = prior.ok_or_else(|| {
            continuity(scene_index, "prior clip is missing".to_string())
        })?;
        if *prior.scene_index() + 1 != scene_index {
            return Err(continuity(
                scene_index,
                format!("seeded by clip of scene {}", prior.scene_index()),
            ));
        }

        let entry = self
            .store
            .get(Stage::Clip, prior.cache_key())
            .await?
            .ok_or_else(|| continuity(scene_index, "prior clip is not in the store".to_string()))?;
        let bytes = self.store.read_blob(&entry, FRAME_BLOB).await.map_err(|e| {
            continuity(scene_index, format!("prior frame unreadable: {}", e))
        })?;
        let hash = sha256_hex(&bytes);
        if &hash != prior.last_frame_hash() {
            return Err(continuity(
                scene_index,
                format!(
                    "prior frame hash {} does not match recorded {}",
                    hash,
                    prior.last_frame_hash()
                ),
            ));
        }
        Ok(Some((hash, bytes)))
    }

    /// Generate and download one clip. Runs only when no download is cached.
    async fn download(
        &self,
        scene: &Scene,
        seed: Option<(&str, &[u8])>,
    ) -> ReelsmithResult<ArtifactPayload> {
        let mut builder = VideoRequest::builder();
        builder
            .prompt(scene.video_prompt())
            .duration_secs(scene.duration_secs)
            .resolution(self.resolution);
        if let Some((_, bytes)) = seed {
            builder.seed_frame(Some(bytes.to_vec()));
        }
        let request = builder.build().map_err(|e| {
            ReelsmithError::from(ClipError::new(ClipErrorKind::ClipGenerationFailed {
                scene_index: scene.index,
                reason: format!("invalid request: {}", e),
            }))
        })?;

        let label = format!("clip scene {}", scene.index);
        let (job_id, clip_bytes) = self
            .retry
            .run(&label, |attempt| self.submit_and_poll(&request, scene.index, attempt))
            .await
            .map_err(|e| {
                if matches!(e.kind(), ReelsmithErrorKind::Cancelled(_)) {
                    e
                } else {
                    ClipError::new(ClipErrorKind::ClipGenerationFailed {
                        scene_index: scene.index,
                        reason: e.to_string(),
                    })
                    .into()
                }
            })?;

        let metadata = ClipMetadata {
            scene_index: scene.index,
            job_id,
            seed_frame_hash: seed.map(|(hash, _)| hash.to_string()),
            duration_ms: None,
        };
        let metadata = serde_json::to_value(&metadata).map_err(|e| JsonError::new(e.to_string()))?;
        Ok(ArtifactPayload::new(vec![Blob::new(CLIP_BLOB, clip_bytes)]).with_metadata(metadata))
    }

    /// Extract the last frame and measure a downloaded clip.
    async fn post_process(
        &self,
        scene_index: usize,
        downloaded: &CacheEntry,
    ) -> ReelsmithResult<ArtifactPayload> {
        let mut metadata: ClipMetadata = serde_json::from_value(downloaded.metadata().clone())
            .map_err(|e| {
                JsonError::new(format!(
                    "clip metadata in {}: {}",
                    downloaded.dir().display(),
                    e
                ))
            })?;
        let clip_bytes = self.store.read_blob(downloaded, CLIP_BLOB).await?;
        let clip_path = downloaded.blob_path(CLIP_BLOB);

        let scratch = tempfile::TempDir::with_prefix("reelsmith-frame-").map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(e.to_string()))
        })?;
        let frame_path = scratch.path().join(FRAME_BLOB);
        self.encoder.extract_last_frame(&clip_path, &frame_path).await?;
        let frame_bytes = tokio::fs::read(&frame_path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileRead(format!(
                "{}: {}",
                frame_path.display(),
                e
            )))
        })?;

        metadata.duration_ms = match self.encoder.probe_duration(&clip_path).await {
            Ok(ms) => Some(ms),
            Err(e) => {
                warn!(scene_index, error = %e, "Clip duration unknown, composing without it");
                None
            }
        };
        let metadata = serde_json::to_value(&metadata).map_err(|e| JsonError::new(e.to_string()))?;

        Ok(ArtifactPayload::new(vec![
            Blob::new(CLIP_BLOB, clip_bytes),
            Blob::new(FRAME_BLOB, frame_bytes),
        ])
        .with_metadata(metadata))
    }

    /// One attempt: submit, poll to a terminal state, download.
    async fn submit_and_poll(
        &self,
        request: &VideoRequest,
        scene_index: usize,
        attempt: usize,
    ) -> ReelsmithResult<(String, Vec<u8>)> {
        let handle = self.video.submit(request).await?;
        info!(
            scene_index,
            attempt,
            job_id = %handle.id(),
            seeded = request.seed_frame().is_some(),
            "Clip job submitted"
        );
        let output = poll_until_terminal(&handle, &self.poll, &self.cancel, || {
            self.video.status(&handle)
        })
        .await?;
        let bytes = self.video.download(&output).await?;
        Ok((handle.id().clone(), bytes))
    }
}

fn continuity(scene_index: usize, reason: String) -> ReelsmithError {
    ClipError::new(ClipErrorKind::ContinuityViolation {
        scene_index,
        reason,
    })
    .into()
}

/// Rebuild a clip artifact from its store entry.
pub(crate) fn artifact_from_entry(entry: &CacheEntry) -> ReelsmithResult<ClipArtifact> {
    let metadata: ClipMetadata = serde_json::from_value(entry.metadata().clone())
        .map_err(|e| JsonError::new(format!("clip metadata in {}: {}", entry.dir().display(), e)))?;
    let blob_hash = |name: &str| {
        entry.blob_hash(name).map(str::to_string).ok_or_else(|| {
            ReelsmithError::from(StorageError::new(StorageErrorKind::Corrupt(format!(
                "{} missing from {}",
                name,
                entry.dir().display()
            ))))
        })
    };

    ClipArtifact::builder()
        .scene_index(metadata.scene_index)
        .clip_path(entry.blob_path(CLIP_BLOB))
        .last_frame_path(entry.blob_path(FRAME_BLOB))
        .clip_hash(blob_hash(CLIP_BLOB)?)
        .last_frame_hash(blob_hash(FRAME_BLOB)?)
        .seed_frame_hash(metadata.seed_frame_hash)
        .job_id(metadata.job_id)
        .cache_key(entry.key().clone())
        .duration_ms(metadata.duration_ms)
        .build()
        .map_err(|e| JsonError::new(format!("clip artifact: {}", e)).into())
}
