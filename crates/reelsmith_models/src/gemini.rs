//! Gemini language model.

use crate::http::extract_status_code;
use crate::{LanguageModel, TextRequest};
use async_trait::async_trait;
use gemini_rust::{Gemini, client::Model};
use reelsmith_error::{ReelsmithResult, ServiceError, ServiceErrorKind};
use reelsmith_rate_limit::RateLimiter;
use tracing::instrument;

const SERVICE: &str = "language";

/// Gemini text generation through `gemini-rust`, gated by a rate limiter.
#[derive(Clone)]
pub struct GeminiLanguageModel {
    client: Gemini,
    model_name: String,
    limiter: RateLimiter,
}

impl std::fmt::Debug for GeminiLanguageModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiLanguageModel")
            .field("model_name", &self.model_name)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

impl GeminiLanguageModel {
    /// Create a client for `model_name` (e.g. `gemini-2.0-flash`).
    ///
    /// # Errors
    ///
    /// Returns `MissingCredentials` for an empty key, or an error if the
    /// underlying client cannot be created.
    #[instrument(skip(api_key, limiter))]
    pub fn new(
        api_key: &str,
        model_name: &str,
        limiter: RateLimiter,
    ) -> ReelsmithResult<Self> {
        if api_key.trim().is_empty() {
            return Err(ServiceError::new(
                SERVICE,
                ServiceErrorKind::MissingCredentials("GEMINI_API_KEY".to_string()),
            )
            .into());
        }
        let client = Gemini::with_model(api_key, Self::model_name_to_enum(model_name))
            .map_err(|e| {
                ServiceError::new(SERVICE, ServiceErrorKind::Transport(e.to_string()))
            })?;
        Ok(Self {
            client,
            model_name: model_name.to_string(),
            limiter,
        })
    }

    fn model_name_to_enum(name: &str) -> Model {
        if name.starts_with("models/") {
            Model::Custom(name.to_string())
        } else {
            Model::Custom(format!("models/{}", name))
        }
    }

    fn parse_gemini_error(err: impl std::fmt::Display) -> ServiceError {
        let message = err.to_string();
        match extract_status_code(&message) {
            Some(status_code) => ServiceError::new(
                SERVICE,
                ServiceErrorKind::Http {
                    status_code,
                    message,
                },
            ),
            None => ServiceError::new(SERVICE, ServiceErrorKind::Transport(message)),
        }
    }
}

#[async_trait]
impl LanguageModel for GeminiLanguageModel {
    #[instrument(skip(self, request), fields(model = %self.model_name, prompt_len = request.user().len()))]
    async fn generate(&self, request: &TextRequest) -> ReelsmithResult<String> {
        let _guard = self.limiter.acquire().await?;

        let mut builder = self
            .client
            .generate_content()
            .with_system_prompt(request.system())
            .with_user_message(request.user());
        if let Some(temperature) = request.temperature() {
            builder = builder.with_temperature(*temperature);
        }
        if let Some(max_tokens) = request.max_output_tokens() {
            builder = builder.with_max_output_tokens(*max_tokens as i32);
        }

        let response = builder.execute().await.map_err(Self::parse_gemini_error)?;
        let text = response.text();
        if text.trim().is_empty() {
            return Err(ServiceError::new(
                SERVICE,
                ServiceErrorKind::InvalidResponse("empty completion".to_string()),
            )
            .into());
        }
        tracing::debug!(response_len = text.len(), "Language model responded");
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
