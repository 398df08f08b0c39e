//! Per-scene media artifacts.

use crate::{CacheKey, Fingerprinter, Scene};
use reelsmith_error::ClipErrorKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Seed label recorded for the first scene, which has no prior clip.
pub const NO_SEED: &str = "none";

/// Generated video segment for one scene plus its extracted last frame.
///
/// Invariant: for scene `i > 0`, `seed_frame_hash` equals the
/// `last_frame_hash` of scene `i - 1`.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters, derive_builder::Builder,
)]
#[builder(setter(into))]
pub struct ClipArtifact {
    /// Scene index
    scene_index: usize,
    /// Location of the clip in the artifact store
    clip_path: PathBuf,
    /// Location of the extracted last frame (PNG)
    last_frame_path: PathBuf,
    /// SHA-256 of the clip bytes
    clip_hash: String,
    /// SHA-256 of the last-frame bytes
    last_frame_hash: String,
    /// Last-frame hash of the prior clip, `None` for scene 0
    #[builder(default)]
    seed_frame_hash: Option<String>,
    /// Identifier of the generation job that produced the clip
    job_id: String,
    /// Cache key the clip is stored under
    cache_key: CacheKey,
    /// Measured clip duration
    #[builder(default)]
    duration_ms: Option<u64>,
}

impl ClipArtifact {
    /// Builder for a clip artifact.
    pub fn builder() -> ClipArtifactBuilder {
        ClipArtifactBuilder::default()
    }

    /// Cache key for a scene's clip.
    ///
    /// Covers the scene's own content, the video model and the prior clip's
    /// last-frame hash (or [`NO_SEED`]), so edits to either the scene or any
    /// earlier scene invalidate it.
    pub fn key_for(scene: &Scene, model: &str, seed_frame_hash: Option<&str>) -> CacheKey {
        Fingerprinter::new("clip")
            .field("scene", scene.content_hash().as_str())
            .field("model", model)
            .field("seed", seed_frame_hash.unwrap_or(NO_SEED))
            .finish()
    }

    /// Seed label as recorded in keys and logs.
    pub fn seed_label(&self) -> &str {
        self.seed_frame_hash.as_deref().unwrap_or(NO_SEED)
    }
}

/// Check the continuity contract across an ordered clip list.
///
/// # Examples
///
/// ```
/// use reelsmith_core::verify_continuity;
///
/// assert!(verify_continuity(&[]).is_ok());
/// ```
pub fn verify_continuity(clips: &[ClipArtifact]) -> Result<(), ClipErrorKind> {
    for (position, clip) in clips.iter().enumerate() {
        if clip.scene_index != position {
            return Err(ClipErrorKind::ContinuityViolation {
                scene_index: position,
                reason: format!("clip for scene {} found at position {}", clip.scene_index, position),
            });
        }
        let expected = if position == 0 {
            None
        } else {
            Some(clips[position - 1].last_frame_hash.as_str())
        };
        if clip.seed_frame_hash.as_deref() != expected {
            return Err(ClipErrorKind::ContinuityViolation {
                scene_index: position,
                reason: format!(
                    "seed {} does not match prior last frame {}",
                    clip.seed_label(),
                    expected.unwrap_or(NO_SEED)
                ),
            });
        }
    }
    Ok(())
}

/// Voiceover audio for one scene.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters, derive_builder::Builder,
)]
#[builder(setter(into))]
pub struct NarrationArtifact {
    /// Scene index
    scene_index: usize,
    /// Location of the audio in the artifact store
    audio_path: PathBuf,
    /// SHA-256 of the audio bytes
    audio_hash: String,
    /// Voice used
    voice_id: String,
    /// Cache key the audio is stored under
    cache_key: CacheKey,
}

impl NarrationArtifact {
    /// Builder for a narration artifact.
    pub fn builder() -> NarrationArtifactBuilder {
        NarrationArtifactBuilder::default()
    }

    /// Cache key for narration: text hash and voice identity.
    pub fn key_for(narration: &str, voice_id: &str) -> CacheKey {
        Fingerprinter::new("narration")
            .field("text", narration)
            .field("voice", voice_id)
            .finish()
    }
}
