//! Composition inputs and timeline arithmetic.

use crate::{SCENE_DURATION_SECS, TOTAL_DURATION_SECS};
use reelsmith_error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Allowed deviation between the composed output and the nominal 30 seconds.
pub const DURATION_TOLERANCE_MS: u64 = 500;

/// Output resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Resolution {
    /// 1920×1080
    #[default]
    #[serde(rename = "1080p")]
    P1080,
    /// 1280×720
    #[serde(rename = "720p")]
    P720,
}

impl Resolution {
    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        match self {
            Resolution::P1080 => 1920,
            Resolution::P720 => 1280,
        }
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        match self {
            Resolution::P1080 => 1080,
            Resolution::P720 => 720,
        }
    }

    /// Label understood by the video service and the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::P1080 => "1080p",
            Resolution::P720 => "720p",
        }
    }
}

impl FromStr for Resolution {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1080p" | "1080" => Ok(Resolution::P1080),
            "720p" | "720" => Ok(Resolution::P720),
            other => Err(ConfigError::new(format!(
                "Unsupported resolution '{}', expected 1080p or 720p",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed target format of the final encode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct EncodingParams {
    resolution: Resolution,
    frame_rate: u32,
    video_codec: String,
    audio_codec: String,
    preset: String,
}

impl EncodingParams {
    /// H.264 + AAC at the given resolution and frame rate.
    pub fn new(resolution: Resolution, frame_rate: u32) -> Self {
        Self {
            resolution,
            frame_rate,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            preset: "medium".to_string(),
        }
    }
}

impl Default for EncodingParams {
    fn default() -> Self {
        Self::new(Resolution::P1080, 24)
    }
}

/// Background music: a file, or generated silence when none is available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicTrack {
    /// Music file, `None` for silence
    pub path: Option<PathBuf>,
    /// Level relative to narration (narration is 1.0)
    pub level: f32,
}

impl MusicTrack {
    /// Default music level relative to narration.
    pub const DEFAULT_LEVEL: f32 = 0.3;

    /// Silent track at the default level.
    pub fn silence() -> Self {
        Self {
            path: None,
            level: Self::DEFAULT_LEVEL,
        }
    }
}

/// Placement of one scene on the output timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneSlot {
    /// Scene index
    pub index: usize,
    /// Start offset in milliseconds
    pub start_ms: u64,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

/// Everything the compositor needs for one encode. Not persisted.
#[derive(Debug, Clone, PartialEq, derive_getters::Getters)]
pub struct CompositionSpec {
    clips: Vec<PathBuf>,
    narrations: Vec<PathBuf>,
    music: MusicTrack,
    scene_duration_ms: u64,
    encoding: EncodingParams,
    output: PathBuf,
}

impl CompositionSpec {
    /// Assemble a spec from ordered clip and narration paths.
    pub fn new(
        clips: Vec<PathBuf>,
        narrations: Vec<PathBuf>,
        music: MusicTrack,
        encoding: EncodingParams,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            clips,
            narrations,
            music,
            scene_duration_ms: SCENE_DURATION_SECS as u64 * 1000,
            encoding,
            output: output.into(),
        }
    }

    /// Scene slots laid end to end with no gaps and no overlap.
    pub fn timeline(&self) -> Vec<SceneSlot> {
        (0..self.clips.len())
            .map(|index| SceneSlot {
                index,
                start_ms: index as u64 * self.scene_duration_ms,
                duration_ms: self.scene_duration_ms,
            })
            .collect()
    }

    /// Total output duration in milliseconds.
    pub fn total_duration_ms(&self) -> u64 {
        self.clips.len() as u64 * self.scene_duration_ms
    }

    /// Nominal output duration in milliseconds.
    pub fn nominal_duration_ms() -> u64 {
        TOTAL_DURATION_SECS as u64 * 1000
    }
}

/// Whether a measured output duration is within tolerance of the nominal one.
///
/// ```
/// use reelsmith_core::within_duration_tolerance;
///
/// assert!(within_duration_tolerance(30_000, 30_400));
/// assert!(!within_duration_tolerance(30_000, 31_000));
/// ```
pub fn within_duration_tolerance(expected_ms: u64, actual_ms: u64) -> bool {
    expected_ms.abs_diff(actual_ms) <= DURATION_TOLERANCE_MS
}
