//! Per-scene narration.

use reelsmith_core::{NarrationArtifact, Scene, Stage};
use reelsmith_error::{
    JsonError, NarrationError, ReelsmithError, ReelsmithResult, StorageError, StorageErrorKind,
};
use reelsmith_models::{SpeechRequest, SpeechSynthesizer};
use reelsmith_rate_limit::RetryPolicy;
use reelsmith_storage::{ArtifactPayload, ArtifactStore, Blob, CacheEntry};
use std::sync::Arc;
use tracing::{info, instrument};

/// Blob name of the audio inside a narration entry.
pub const AUDIO_BLOB: &str = "narration.mp3";

/// Synthesizes and caches narration audio, one scene at a time.
///
/// Scenes are independent of each other, so callers may run any number of
/// [`NarrationSynthesizer::narrate`] calls concurrently.
#[derive(Clone)]
pub struct NarrationSynthesizer {
    speech: Arc<dyn SpeechSynthesizer>,
    store: ArtifactStore,
    voice_id: String,
    retry: RetryPolicy,
}

impl std::fmt::Debug for NarrationSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrationSynthesizer")
            .field("model", &self.speech.model_name())
            .field("voice_id", &self.voice_id)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl NarrationSynthesizer {
    /// Synthesizer speaking with `voice_id`.
    pub fn new(
        speech: Arc<dyn SpeechSynthesizer>,
        store: ArtifactStore,
        voice_id: impl Into<String>,
    ) -> Self {
        Self {
            speech,
            store,
            voice_id: voice_id.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Retry policy per scene.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Voice identity, part of every narration key.
    pub fn voice_id(&self) -> &str {
        &self.voice_id
    }

    /// Whether narration for `scene` is already cached.
    pub async fn is_cached(&self, scene: &Scene) -> ReelsmithResult<bool> {
        let key = NarrationArtifact::key_for(&scene.narration, &self.voice_id);
        self.store.contains(Stage::Narration, &key).await
    }

    /// Narration audio for `scene`.
    ///
    /// # Errors
    ///
    /// Returns `NarrationFailed` for this scene once retries are exhausted.
    #[instrument(skip(self, scene), fields(scene_index = scene.index, voice = %self.voice_id))]
    pub async fn narrate(&self, scene: &Scene) -> ReelsmithResult<NarrationArtifact> {
        let key = NarrationArtifact::key_for(&scene.narration, &self.voice_id);
        let request = SpeechRequest::new(scene.narration.clone(), self.voice_id.clone());

        let fetched = self
            .store
            .compute_or_fetch(Stage::Narration, &key, || async {
                let label = format!("narration scene {}", scene.index);
                let audio = self
                    .retry
                    .run(&label, |_attempt| self.speech.synthesize(&request))
                    .await
                    .map_err(|e| NarrationError::new(scene.index, e.to_string()))?;
                Ok(ArtifactPayload::new(vec![Blob::new(AUDIO_BLOB, audio)])
                    .with_metadata(serde_json::json!({ "scene_index": scene.index })))
            })
            .await?;

        let artifact = artifact_from_entry(&fetched.entry, scene.index, &self.voice_id)?;
        info!(provenance = %fetched.provenance, "Narration ready");
        Ok(artifact)
    }
}

fn artifact_from_entry(
    entry: &CacheEntry,
    scene_index: usize,
    voice_id: &str,
) -> ReelsmithResult<NarrationArtifact> {
    let audio_hash = entry.blob_hash(AUDIO_BLOB).ok_or_else(|| {
        ReelsmithError::from(StorageError::new(StorageErrorKind::Corrupt(format!(
            "{} missing from {}",
            AUDIO_BLOB,
            entry.dir().display()
        ))))
    })?;
    NarrationArtifact::builder()
        .scene_index(scene_index)
        .audio_path(entry.blob_path(AUDIO_BLOB))
        .audio_hash(audio_hash)
        .voice_id(voice_id)
        .cache_key(entry.key().clone())
        .build()
        .map_err(|e| JsonError::new(format!("narration artifact: {}", e)).into())
}
