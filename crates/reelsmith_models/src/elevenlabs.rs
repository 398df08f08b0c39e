//! ElevenLabs text-to-speech client.

use crate::http::{check_status, transport};
use crate::{SpeechRequest, SpeechSynthesizer};
use async_trait::async_trait;
use reelsmith_error::{ReelsmithResult, ServiceError, ServiceErrorKind};
use reelsmith_rate_limit::RateLimiter;
use reqwest::Client;
use serde::Serialize;
use tracing::instrument;

const SERVICE: &str = "speech";
const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io/v1";

/// Premade voices addressable by name.
const PREMADE_VOICES: &[(&str, &str)] = &[
    ("Adam", "pNInz6obpgDQGcFmaJgB"),
    ("Antoni", "ErXwobaYiN019PkySvjV"),
    ("Bella", "EXAVITQu4vr4xnSDxMaL"),
    ("Josh", "TxGEqnHWrfWFTfGW9XjX"),
    ("Rachel", "21m00Tcm4TlvDq8ikWAM"),
];

/// Map a premade voice name to its identifier; anything else is taken to
/// already be an identifier.
///
/// ```
/// use reelsmith_models::resolve_voice_id;
///
/// assert_eq!(resolve_voice_id("Adam"), "pNInz6obpgDQGcFmaJgB");
/// assert_eq!(resolve_voice_id("custom-id"), "custom-id");
/// ```
pub fn resolve_voice_id(voice: &str) -> &str {
    PREMADE_VOICES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(voice))
        .map(|(_, id)| *id)
        .unwrap_or(voice)
}

#[derive(Debug, Serialize)]
struct TextToSpeech<'a> {
    text: &'a str,
    model_id: &'a str,
}

/// ElevenLabs client.
#[derive(Debug, Clone)]
pub struct ElevenLabsClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    limiter: RateLimiter,
}

impl ElevenLabsClient {
    /// Create a client for a synthesis model (e.g. `eleven_multilingual_v2`).
    ///
    /// # Errors
    ///
    /// Returns `MissingCredentials` for an empty key.
    #[instrument(skip(api_key, limiter))]
    pub fn new(api_key: &str, model: &str, limiter: RateLimiter) -> ReelsmithResult<Self> {
        if api_key.trim().is_empty() {
            return Err(ServiceError::new(
                SERVICE,
                ServiceErrorKind::MissingCredentials("ELEVENLABS_API_KEY".to_string()),
            )
            .into());
        }
        Ok(Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.to_string(),
            limiter,
        })
    }

    /// Point the client at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    #[instrument(skip(self, request), fields(voice = %request.voice, chars = request.text.len()))]
    async fn synthesize(&self, request: &SpeechRequest) -> ReelsmithResult<Vec<u8>> {
        let _guard = self.limiter.acquire().await?;
        let url = format!(
            "{}/text-to-speech/{}",
            self.base_url,
            resolve_voice_id(&request.voice)
        );

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("accept", "audio/mpeg")
            .json(&TextToSpeech {
                text: &request.text,
                model_id: &self.model,
            })
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;
        let audio = check_status(SERVICE, response)
            .await?
            .bytes()
            .await
            .map_err(|e| transport(SERVICE, e))?;

        if audio.is_empty() {
            return Err(ServiceError::new(
                SERVICE,
                ServiceErrorKind::InvalidResponse("empty audio".to_string()),
            )
            .into());
        }
        tracing::debug!(size = audio.len(), "Synthesized narration");
        Ok(audio.to_vec())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
