//! Language-model contract.

use async_trait::async_trait;
use reelsmith_error::ReelsmithResult;

/// A single-turn text generation request.
#[derive(Debug, Clone, PartialEq, derive_getters::Getters, derive_builder::Builder)]
#[builder(setter(into))]
pub struct TextRequest {
    /// Role instruction
    system: String,
    /// Request body (analysis text plus task)
    user: String,
    /// Sampling temperature
    #[builder(default)]
    temperature: Option<f32>,
    /// Output token cap
    #[builder(default)]
    max_output_tokens: Option<u32>,
}

impl TextRequest {
    /// Builder for a text request.
    pub fn builder() -> TextRequestBuilder {
        TextRequestBuilder::default()
    }
}

/// Text-generation service.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a text completion.
    async fn generate(&self, request: &TextRequest) -> ReelsmithResult<String>;

    /// Model identity, part of cache keys.
    fn model_name(&self) -> &str;
}
