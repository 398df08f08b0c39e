//! Veo video generation over the Gemini REST API.
//!
//! Generation is a long-running operation: `predictLongRunning` returns an
//! operation name, the operation resource is polled until `done`, and the
//! finished operation carries a download URI for the clip.

use crate::http::{check_status, transport};
use crate::{JobHandle, JobStatus, VideoOutput, VideoRequest, VideoSynthesizer};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reelsmith_error::{ReelsmithResult, ServiceError, ServiceErrorKind};
use reelsmith_rate_limit::RateLimiter;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;

const SERVICE: &str = "video";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictRequest<'a> {
    instances: Vec<Instance<'a>>,
    parameters: Parameters<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Instance<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<InlineImage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineImage {
    bytes_base64_encoded: String,
    mime_type: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Parameters<'a> {
    aspect_ratio: &'a str,
    resolution: &'a str,
    duration_seconds: u32,
}

#[derive(Debug, Deserialize)]
struct OperationName {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Operation {
    #[serde(default)]
    done: bool,
    #[serde(default)]
    metadata: Option<OperationMetadata>,
    #[serde(default)]
    error: Option<OperationError>,
    #[serde(default)]
    response: Option<OperationResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationMetadata {
    #[serde(default)]
    progress_percentage: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OperationError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    #[serde(default)]
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
    #[serde(default)]
    rai_media_filtered_reasons: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    video: SampleVideo,
}

#[derive(Debug, Deserialize)]
struct SampleVideo {
    uri: String,
}

impl Operation {
    fn into_status(self) -> JobStatus<VideoOutput> {
        if !self.done {
            let progress = self
                .metadata
                .and_then(|m| m.progress_percentage)
                .map(|p| p.clamp(0.0, 100.0) as u8);
            return match progress {
                None => JobStatus::Pending,
                Some(_) => JobStatus::Running { progress },
            };
        }
        if let Some(error) = self.error {
            return JobStatus::Failed {
                reason: error.message,
            };
        }
        let response = self
            .response
            .and_then(|r| r.generate_video_response)
            .unwrap_or_default();
        match response.generated_samples.into_iter().next() {
            Some(sample) => JobStatus::Succeeded(VideoOutput {
                uri: sample.video.uri,
            }),
            None if !response.rai_media_filtered_reasons.is_empty() => JobStatus::Failed {
                reason: response.rai_media_filtered_reasons.join("; "),
            },
            None => JobStatus::Failed {
                reason: "operation finished without a video".to_string(),
            },
        }
    }
}

/// Veo client.
#[derive(Debug, Clone)]
pub struct VeoClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    limiter: RateLimiter,
}

impl VeoClient {
    /// Create a client for a Veo model (e.g. `veo-3.1-fast-generate-preview`).
    ///
    /// # Errors
    ///
    /// Returns `MissingCredentials` for an empty key.
    #[instrument(skip(api_key, limiter))]
    pub fn new(api_key: &str, model: &str, limiter: RateLimiter) -> ReelsmithResult<Self> {
        if api_key.trim().is_empty() {
            return Err(ServiceError::new(
                SERVICE,
                ServiceErrorKind::MissingCredentials("GEMINI_API_KEY".to_string()),
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

    fn predict_body<'a>(request: &'a VideoRequest) -> PredictRequest<'a> {
        PredictRequest {
            instances: vec![Instance {
                prompt: request.prompt(),
                image: request.seed_frame().as_ref().map(|png| InlineImage {
                    bytes_base64_encoded: STANDARD.encode(png),
                    mime_type: "image/png",
                }),
            }],
            parameters: Parameters {
                aspect_ratio: request.aspect_ratio(),
                resolution: request.resolution().as_str(),
                duration_seconds: *request.duration_secs(),
            },
        }
    }
}

#[async_trait]
impl VideoSynthesizer for VeoClient {
    #[instrument(
        skip(self, request),
        fields(model = %self.model, seeded = request.seed_frame().is_some())
    )]
    async fn submit(&self, request: &VideoRequest) -> ReelsmithResult<JobHandle> {
        let _guard = self.limiter.acquire().await?;
        let url = format!("{}/models/{}:predictLongRunning", self.base_url, self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::predict_body(request))
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;
        let operation: OperationName = check_status(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| {
                ServiceError::new(SERVICE, ServiceErrorKind::InvalidResponse(e.to_string()))
            })?;

        tracing::info!(job_id = %operation.name, "Submitted video job");
        Ok(JobHandle::new(SERVICE, operation.name))
    }

    #[instrument(skip(self, handle), fields(job_id = %handle.id()))]
    async fn status(&self, handle: &JobHandle) -> ReelsmithResult<JobStatus<VideoOutput>> {
        let _guard = self.limiter.acquire().await?;
        let url = format!("{}/{}", self.base_url, handle.id());

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;
        let operation: Operation = check_status(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| {
                ServiceError::new(SERVICE, ServiceErrorKind::InvalidResponse(e.to_string()))
            })?;
        Ok(operation.into_status())
    }

    #[instrument(skip(self, output))]
    async fn download(&self, output: &VideoOutput) -> ReelsmithResult<Vec<u8>> {
        let _guard = self.limiter.acquire().await?;
        let response = self
            .client
            .get(&output.uri)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;
        let bytes = check_status(SERVICE, response)
            .await?
            .bytes()
            .await
            .map_err(|e| transport(SERVICE, e))?;
        if bytes.is_empty() {
            return Err(ServiceError::new(
                SERVICE,
                ServiceErrorKind::InvalidResponse("empty clip download".to_string()),
            )
            .into());
        }
        tracing::debug!(size = bytes.len(), "Downloaded clip");
        Ok(bytes.to_vec())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
