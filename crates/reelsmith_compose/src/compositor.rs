//! Composition of the final video.

use crate::MediaEncoder;
use reelsmith_core::{
    CompositionSpec, DURATION_TOLERANCE_MS, MusicTrack, SCENE_COUNT, within_duration_tolerance,
};
use reelsmith_error::{CompositionError, CompositionErrorKind, ReelsmithResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Outcome of a successful composition.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct CompositionReport {
    output: PathBuf,
    duration_ms: u64,
    size_bytes: u64,
    music_used: bool,
}

/// Validates composition inputs and drives the encoder.
///
/// Every failure here is a [`CompositionError`]: inputs reaching this point
/// have already been validated upstream, so a problem indicates a broken
/// contract and is never retried.
#[derive(Clone)]
pub struct Compositor {
    encoder: Arc<dyn MediaEncoder>,
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("encoder", &self.encoder.name())
            .finish()
    }
}

impl Compositor {
    /// Compositor driving the given encoder.
    pub fn new(encoder: Arc<dyn MediaEncoder>) -> Self {
        Self { encoder }
    }

    /// The underlying encoder.
    pub fn encoder(&self) -> &Arc<dyn MediaEncoder> {
        &self.encoder
    }

    /// Compose the video described by `spec`.
    ///
    /// # Errors
    ///
    /// - `MissingInput` when a clip or narration file is absent or the
    ///   scene counts are wrong
    /// - `DurationMismatch` when a clip is shorter than its slot, a
    ///   narration overruns its slot, or the encoded output is not 30s
    /// - `EncoderUnavailable` / `EncoderFailed` from the encoder itself
    #[tracing::instrument(skip(self, spec), fields(output = %spec.output().display()))]
    pub async fn compose(&self, spec: &CompositionSpec) -> ReelsmithResult<CompositionReport> {
        check_counts(spec)?;
        let slot_ms = *spec.scene_duration_ms();

        for (index, clip) in spec.clips().iter().enumerate() {
            require_file(clip, &format!("clip for scene {}", index)).await?;
            let actual_ms = self.encoder.probe_duration(clip).await?;
            // Longer clips are trimmed; slightly short ones are padded.
            if actual_ms + DURATION_TOLERANCE_MS < slot_ms {
                return Err(mismatch(format!("clip for scene {}", index), slot_ms, actual_ms));
            }
            tracing::debug!(scene_index = index, actual_ms, "Clip duration accepted");
        }

        for (index, narration) in spec.narrations().iter().enumerate() {
            require_file(narration, &format!("narration for scene {}", index)).await?;
            let actual_ms = self.encoder.probe_duration(narration).await?;
            if actual_ms > slot_ms + DURATION_TOLERANCE_MS {
                return Err(mismatch(
                    format!("narration for scene {}", index),
                    slot_ms,
                    actual_ms,
                ));
            }
            tracing::debug!(scene_index = index, actual_ms, "Narration duration accepted");
        }

        let music = resolve_music(spec.music()).await;
        let music_used = music.path.is_some();
        let resolved = CompositionSpec::new(
            spec.clips().clone(),
            spec.narrations().clone(),
            music,
            spec.encoding().clone(),
            spec.output().clone(),
        );

        if let Some(parent) = resolved
            .output()
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                CompositionError::new(CompositionErrorKind::EncoderFailed(format!(
                    "cannot create {}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        tracing::info!(
            encoder = self.encoder.name(),
            scenes = resolved.clips().len(),
            music_used,
            "Encoding final video"
        );
        self.encoder.encode(&resolved).await?;

        let output = resolved.output().clone();
        require_file(&output, "encoded output").await?;
        let expected_ms = resolved.total_duration_ms();
        let duration_ms = self.encoder.probe_duration(&output).await?;
        if !within_duration_tolerance(expected_ms, duration_ms) {
            return Err(mismatch("encoded output".to_string(), expected_ms, duration_ms));
        }

        let size_bytes = tokio::fs::metadata(&output)
            .await
            .map(|m| m.len())
            .unwrap_or_default();

        tracing::info!(duration_ms, size_bytes, "Composition complete");
        Ok(CompositionReport {
            output,
            duration_ms,
            size_bytes,
            music_used,
        })
    }
}

fn check_counts(spec: &CompositionSpec) -> ReelsmithResult<()> {
    if spec.clips().len() != SCENE_COUNT {
        return Err(CompositionError::new(CompositionErrorKind::MissingInput(format!(
            "expected {} clips, got {}",
            SCENE_COUNT,
            spec.clips().len()
        )))
        .into());
    }
    if spec.narrations().len() != SCENE_COUNT {
        return Err(CompositionError::new(CompositionErrorKind::MissingInput(format!(
            "expected {} narration tracks, got {}",
            SCENE_COUNT,
            spec.narrations().len()
        )))
        .into());
    }
    Ok(())
}

async fn require_file(path: &Path, what: &str) -> ReelsmithResult<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(CompositionError::new(CompositionErrorKind::MissingInput(format!(
            "{} at {}",
            what,
            path.display()
        )))
        .into()),
    }
}

fn mismatch(input: String, expected_ms: u64, actual_ms: u64) -> reelsmith_error::ReelsmithError {
    CompositionError::new(CompositionErrorKind::DurationMismatch {
        input,
        expected_ms,
        actual_ms,
    })
    .into()
}

/// Fall back to silence when the configured track is missing.
async fn resolve_music(music: &MusicTrack) -> MusicTrack {
    match &music.path {
        Some(path) if tokio::fs::try_exists(path).await.unwrap_or(false) => music.clone(),
        Some(path) => {
            tracing::warn!(
                path = %path.display(),
                "Background music not found, using silence"
            );
            MusicTrack {
                path: None,
                level: music.level,
            }
        }
        None => {
            tracing::warn!("No background music configured, using silence (set --music to add a track)");
            music.clone()
        }
    }
}
