//! Layered configuration.
//!
//! Sources in order of precedence (later sources override earlier):
//! 1. Bundled defaults (`reelsmith.toml` shipped with the library)
//! 2. User config in home directory (`~/.config/reelsmith/reelsmith.toml`)
//! 3. User config in current directory (`./reelsmith.toml`)
//! 4. Environment variables (`VIDEO_QUALITY`, `VEO_MODEL`,
//!    `REELSMITH_OUTPUT_DIR`, `REELSMITH_CACHE_DIR`)
//!
//! Credentials are never read from files; see [`Credentials`].

use config::{Config, File, FileFormat};
use reelsmith_analysis::AnalysisLimits;
use reelsmith_core::{EncodingParams, MusicTrack, Resolution};
use reelsmith_error::{ConfigError, ReelsmithError, ReelsmithResult, ServiceError, ServiceErrorKind};
use reelsmith_models::PollConfig;
use reelsmith_rate_limit::{RateLimitConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, instrument};

/// Bundled default configuration.
pub const DEFAULT_CONFIG: &str = include_str!("../../../reelsmith.toml");

const FAST_VEO_MODEL: &str = "veo-3.1-fast-generate-preview";
const STANDARD_VEO_MODEL: &str = "veo-3.1-generate-preview";

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".reelsmith-cache")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Top-level Reelsmith configuration.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters, derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct ReelsmithConfig {
    /// Artifact store root
    #[serde(default = "default_cache_dir")]
    cache_dir: PathBuf,
    /// Directory for final videos when no explicit output is given
    #[serde(default = "default_output_dir")]
    output_dir: PathBuf,
    /// Repository sampling budgets
    #[serde(default)]
    analysis: AnalysisLimits,
    /// Script writing
    #[serde(default)]
    language: LanguageConfig,
    /// Clip generation
    #[serde(default)]
    video: VideoConfig,
    /// Narration
    #[serde(default)]
    speech: SpeechConfig,
    /// Final encode
    #[serde(default)]
    composition: CompositionConfig,
    /// Per-service limits keyed by service name (`language`, `video`, `speech`)
    #[serde(default)]
    rate_limits: HashMap<String, RateLimitConfig>,
}

impl Default for ReelsmithConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            output_dir: default_output_dir(),
            analysis: AnalysisLimits::default(),
            language: LanguageConfig::default(),
            video: VideoConfig::default(),
            speech: SpeechConfig::default(),
            composition: CompositionConfig::default(),
            rate_limits: HashMap::new(),
        }
    }
}

/// Language-model settings.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters, derive_setters::Setters,
)]
#[setters(prefix = "with_")]
#[serde(default)]
pub struct LanguageConfig {
    /// Model name
    model: String,
    /// Sampling temperature
    temperature: f32,
    /// Response token cap
    max_output_tokens: u32,
    /// Corrective re-asks after an invalid script
    max_validation_retries: usize,
    /// Retries for transient service errors per call
    max_retries: usize,
    /// First backoff delay
    initial_backoff_ms: u64,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            temperature: 0.7,
            max_output_tokens: 4096,
            max_validation_retries: 2,
            max_retries: 2,
            initial_backoff_ms: 2000,
        }
    }
}

impl LanguageConfig {
    /// Retry policy for transient service errors.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.initial_backoff_ms)
    }
}

/// Veo quality tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VideoQuality {
    /// Faster, cheaper generation
    #[default]
    Fast,
    /// Full-quality generation
    Standard,
}

impl VideoQuality {
    /// `fast` selects the fast tier; anything else the standard one.
    pub fn from_env_value(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("fast") {
            VideoQuality::Fast
        } else {
            VideoQuality::Standard
        }
    }

    /// Veo model for this tier.
    pub fn model(&self) -> &'static str {
        match self {
            VideoQuality::Fast => FAST_VEO_MODEL,
            VideoQuality::Standard => STANDARD_VEO_MODEL,
        }
    }
}

/// Video-synthesis settings.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters, derive_setters::Setters,
)]
#[setters(prefix = "with_")]
#[serde(default)]
pub struct VideoConfig {
    /// Quality tier, selects the model
    quality: VideoQuality,
    /// Output resolution
    resolution: Resolution,
    /// Seconds between job polls (clamped to 5–15)
    poll_interval_secs: u64,
    /// Per-job timeout
    job_timeout_secs: u64,
    /// Resubmissions after a failed or timed-out job
    max_retries: usize,
    /// First backoff delay
    initial_backoff_ms: u64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            quality: VideoQuality::Fast,
            resolution: Resolution::P1080,
            poll_interval_secs: 10,
            job_timeout_secs: 360,
            max_retries: 2,
            initial_backoff_ms: 2000,
        }
    }
}

impl VideoConfig {
    /// Veo model selected by the quality tier.
    pub fn model(&self) -> &'static str {
        self.quality.model()
    }

    /// Polling cadence and per-job timeout.
    pub fn poll_config(&self) -> PollConfig {
        PollConfig::from_secs(self.poll_interval_secs, self.job_timeout_secs)
    }

    /// Retry policy wrapping submit-and-poll.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.initial_backoff_ms)
    }
}

/// Speech-synthesis settings.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters, derive_setters::Setters,
)]
#[setters(prefix = "with_")]
#[serde(default)]
pub struct SpeechConfig {
    /// Voice name or identifier
    voice_id: String,
    /// Synthesis model
    model: String,
    /// Retries per scene
    max_retries: usize,
    /// First backoff delay
    initial_backoff_ms: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            voice_id: "Adam".to_string(),
            model: "eleven_multilingual_v2".to_string(),
            max_retries: 2,
            initial_backoff_ms: 1000,
        }
    }
}

impl SpeechConfig {
    /// Retry policy per narration scene.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.initial_backoff_ms)
    }
}

/// Final encode settings.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters, derive_setters::Setters,
)]
#[setters(prefix = "with_")]
#[serde(default)]
pub struct CompositionConfig {
    /// Background music file; silence when unset
    music_path: Option<PathBuf>,
    /// Music level relative to narration
    music_level: f32,
    /// Output frame rate
    frame_rate: u32,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            music_path: None,
            music_level: MusicTrack::DEFAULT_LEVEL,
            frame_rate: 24,
        }
    }
}

impl CompositionConfig {
    /// Music track described by this config.
    pub fn music_track(&self) -> MusicTrack {
        MusicTrack {
            path: self.music_path.clone(),
            level: self.music_level,
        }
    }
}

impl ReelsmithConfig {
    /// Load configuration from all layers, then apply environment overrides.
    ///
    /// A `.env` file in the current directory is loaded first if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a file cannot be parsed or a value is invalid.
    #[instrument]
    pub fn load() -> ReelsmithResult<Self> {
        debug!("Loading configuration with precedence: env > current dir > home dir > bundled defaults");
        let _ = dotenvy::dotenv();

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/reelsmith/reelsmith.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("reelsmith").required(false));

        let mut config: Self = builder
            .build()
            .map_err(|e| {
                ReelsmithError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                ReelsmithError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a single TOML document layered over the bundled defaults.
    pub fn from_toml_str(toml: &str) -> ReelsmithResult<Self> {
        let config: Self = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .map_err(|e| {
                ReelsmithError::from(ConfigError::new(format!(
                    "Failed to read configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                ReelsmithError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> ReelsmithResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(quality) = lookup("VIDEO_QUALITY") {
            self.video.resolution = quality.parse()?;
            debug!(resolution = %self.video.resolution, "VIDEO_QUALITY override");
        }
        if let Some(model) = lookup("VEO_MODEL") {
            self.video.quality = VideoQuality::from_env_value(&model);
            debug!(quality = %self.video.quality, "VEO_MODEL override");
        }
        if let Some(dir) = lookup("REELSMITH_OUTPUT_DIR").filter(|d| !d.is_empty()) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("REELSMITH_CACHE_DIR").filter(|d| !d.is_empty()) {
            self.cache_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Check value ranges.
    pub fn validate(&self) -> ReelsmithResult<()> {
        if !(0.0..=1.0).contains(&self.composition.music_level) {
            return Err(ConfigError::new(format!(
                "composition.music_level must be in [0, 1], got {}",
                self.composition.music_level
            ))
            .into());
        }
        if self.composition.frame_rate == 0 {
            return Err(ConfigError::new("composition.frame_rate must be positive").into());
        }
        if self.video.job_timeout_secs == 0 {
            return Err(ConfigError::new("video.job_timeout_secs must be positive").into());
        }
        if self.language.model.trim().is_empty() {
            return Err(ConfigError::new("language.model must not be empty").into());
        }
        Ok(())
    }

    /// Limits for a service; unlimited when not configured.
    pub fn rate_limit(&self, service: &str) -> RateLimitConfig {
        self.rate_limits.get(service).copied().unwrap_or_default()
    }

    /// Target format of the final encode.
    pub fn encoding(&self) -> EncodingParams {
        EncodingParams::new(self.video.resolution, self.composition.frame_rate)
    }
}

/// API keys for the external services.
///
/// Validated lazily: preview runs only need the Gemini key.
#[derive(Clone, Default)]
pub struct Credentials {
    gemini_api_key: Option<String>,
    elevenlabs_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "<redacted>"))
            .field(
                "elevenlabs_api_key",
                &self.elevenlabs_api_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl Credentials {
    /// Explicit keys.
    pub fn new(gemini_api_key: Option<String>, elevenlabs_api_key: Option<String>) -> Self {
        Self {
            gemini_api_key,
            elevenlabs_api_key,
        }
    }

    /// Read `GEMINI_API_KEY` and `ELEVENLABS_API_KEY`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read keys through `lookup`; blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            elevenlabs_api_key: non_empty("ELEVENLABS_API_KEY"),
        }
    }

    /// The Gemini key, required for script writing and video.
    pub fn gemini(&self) -> ReelsmithResult<&str> {
        self.gemini_api_key.as_deref().ok_or_else(|| {
            ServiceError::new(
                "language",
                ServiceErrorKind::MissingCredentials("GEMINI_API_KEY".to_string()),
            )
            .into()
        })
    }

    /// The ElevenLabs key, required for narration.
    pub fn elevenlabs(&self) -> ReelsmithResult<&str> {
        self.elevenlabs_api_key.as_deref().ok_or_else(|| {
            ServiceError::new(
                "speech",
                ServiceErrorKind::MissingCredentials("ELEVENLABS_API_KEY".to_string()),
            )
            .into()
        })
    }
}
