//! Speech-synthesis contract.

use async_trait::async_trait;
use reelsmith_error::ReelsmithResult;

/// Narration for one scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    /// Text to speak
    pub text: String,
    /// Voice name or identifier
    pub voice: String,
}

impl SpeechRequest {
    /// Create a request.
    pub fn new(text: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: voice.into(),
        }
    }
}

/// Text-to-speech service. Returns encoded audio (MP3).
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize narration audio.
    async fn synthesize(&self, request: &SpeechRequest) -> ReelsmithResult<Vec<u8>>;

    /// Synthesis model, recorded alongside artifacts.
    fn model_name(&self) -> &str;
}
