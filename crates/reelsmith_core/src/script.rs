//! Five-scene explainer script.

use crate::{CacheKey, Fingerprinter};
use reelsmith_error::ValidationErrorKind;
use serde::{Deserialize, Serialize};

/// Number of scenes in every script.
pub const SCENE_COUNT: usize = 5;

/// Duration of every scene in seconds.
pub const SCENE_DURATION_SECS: u32 = 6;

/// Nominal narrator speaking rate used to bound narration length.
pub const WORDS_PER_SECOND: f32 = 2.5;

/// Total video duration in seconds.
pub const TOTAL_DURATION_SECS: u32 = SCENE_COUNT as u32 * SCENE_DURATION_SECS;

/// Maximum narration words that fit within one scene.
///
/// ```
/// assert_eq!(reelsmith_core::max_narration_words(), 15);
/// ```
pub fn max_narration_words() -> usize {
    (SCENE_DURATION_SECS as f32 * WORDS_PER_SECOND).floor() as usize
}

/// Fixed narrative role of each scene position.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum SceneRole {
    /// Project name and tagline
    Hook,
    /// What problem the project solves
    Problem,
    /// How it solves it
    Solution,
    /// Standout features
    Features,
    /// Installation and call to action
    GetStarted,
}

impl SceneRole {
    /// All roles in scene order.
    pub const ORDER: [SceneRole; SCENE_COUNT] = [
        SceneRole::Hook,
        SceneRole::Problem,
        SceneRole::Solution,
        SceneRole::Features,
        SceneRole::GetStarted,
    ];

    /// Role for a scene index, if the index is in range.
    pub fn for_index(index: usize) -> Option<Self> {
        Self::ORDER.get(index).copied()
    }
}

/// One scene of the script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    /// Position in the script (0–4)
    pub index: usize,
    /// Narrative role, fixed by position
    pub role: SceneRole,
    /// Short human title
    pub title: String,
    /// Duration in seconds (always [`SCENE_DURATION_SECS`])
    pub duration_secs: u32,
    /// Prompt for the video-synthesis service
    pub visual_prompt: String,
    /// Voiceover text
    pub narration: String,
    /// Optional ambient sound / effect tags
    #[serde(default)]
    pub audio_cues: Vec<String>,
}

impl Scene {
    /// Hash of everything that influences this scene's clip.
    pub fn content_hash(&self) -> CacheKey {
        Fingerprinter::new("scene")
            .field("index", self.index.to_string())
            .field("role", self.role.as_ref())
            .field("duration", self.duration_secs.to_string())
            .field("visual_prompt", &self.visual_prompt)
            .field("audio_cues", self.audio_cues.join("\u{1f}"))
            .finish()
    }

    /// Prompt actually sent to the video service, audio cues appended.
    pub fn video_prompt(&self) -> String {
        if self.audio_cues.is_empty() {
            self.visual_prompt.clone()
        } else {
            format!(
                "{}\n\nAudio: {}",
                self.visual_prompt,
                self.audio_cues.join(", ")
            )
        }
    }

    /// Number of whitespace-separated words in the narration.
    pub fn narration_words(&self) -> usize {
        self.narration.split_whitespace().count()
    }

    /// Start offset of this scene in the final video, in milliseconds.
    pub fn start_ms(&self) -> u64 {
        self.index as u64 * self.duration_secs as u64 * 1000
    }
}

/// Validated five-scene script.
///
/// Invariant (checked by [`Script::validate`]): exactly five scenes, indices
/// 0–4 in order, roles in [`SceneRole::ORDER`], non-empty prompt and
/// narration, narration within the spoken-word budget, 30 seconds total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    /// Video title
    pub video_title: String,
    /// Overall visual style
    pub overall_style: String,
    /// Scenes in order
    pub scenes: Vec<Scene>,
}

impl Script {
    /// Check every script invariant.
    pub fn validate(&self) -> Result<(), ValidationErrorKind> {
        if self.scenes.len() != SCENE_COUNT {
            return Err(ValidationErrorKind::SceneCount {
                expected: SCENE_COUNT,
                actual: self.scenes.len(),
            });
        }
        let max_words = max_narration_words();
        for (position, scene) in self.scenes.iter().enumerate() {
            if scene.index != position {
                return Err(ValidationErrorKind::Malformed(format!(
                    "scene at position {} has index {}",
                    position, scene.index
                )));
            }
            if Some(scene.role) != SceneRole::for_index(position) {
                return Err(ValidationErrorKind::Malformed(format!(
                    "scene {} has role {}",
                    position, scene.role
                )));
            }
            if scene.duration_secs != SCENE_DURATION_SECS {
                return Err(ValidationErrorKind::Malformed(format!(
                    "scene {} lasts {}s",
                    position, scene.duration_secs
                )));
            }
            if scene.visual_prompt.trim().is_empty() {
                return Err(ValidationErrorKind::EmptyField {
                    scene_index: position,
                    field: "visual_prompt".to_string(),
                });
            }
            if scene.narration.trim().is_empty() {
                return Err(ValidationErrorKind::EmptyField {
                    scene_index: position,
                    field: "narration".to_string(),
                });
            }
            let words = scene.narration_words();
            if words > max_words {
                return Err(ValidationErrorKind::NarrationTooLong {
                    scene_index: position,
                    words,
                    max_words,
                });
            }
        }
        Ok(())
    }

    /// Sum of scene durations in seconds.
    pub fn total_duration_secs(&self) -> u32 {
        self.scenes.iter().map(|s| s.duration_secs).sum()
    }

    /// Fingerprint of the whole script.
    pub fn fingerprint(&self) -> CacheKey {
        let mut fp = Fingerprinter::new("script")
            .field("title", &self.video_title)
            .field("style", &self.overall_style);
        for scene in &self.scenes {
            fp = fp
                .field("scene", scene.content_hash().as_str())
                .field("narration", &scene.narration);
        }
        fp.finish()
    }
}
