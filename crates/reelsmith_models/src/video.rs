//! Video-synthesis contract.

use crate::{JobHandle, JobStatus};
use async_trait::async_trait;
use reelsmith_core::Resolution;
use reelsmith_error::ReelsmithResult;

/// One clip generation request.
#[derive(Debug, Clone, PartialEq, derive_getters::Getters, derive_builder::Builder)]
#[builder(setter(into))]
pub struct VideoRequest {
    /// Visual prompt, audio cues already appended
    prompt: String,
    /// PNG bytes of the prior clip's last frame
    #[builder(default)]
    seed_frame: Option<Vec<u8>>,
    /// Clip length in seconds
    duration_secs: u32,
    /// Output resolution
    #[builder(default)]
    resolution: Resolution,
    /// Aspect ratio label
    #[builder(default = "\"16:9\".to_string()")]
    aspect_ratio: String,
}

impl VideoRequest {
    /// Builder for a video request.
    pub fn builder() -> VideoRequestBuilder {
        VideoRequestBuilder::default()
    }
}

/// Location of a finished clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoOutput {
    /// Download location
    pub uri: String,
}

/// Asynchronous video generation service.
#[async_trait]
pub trait VideoSynthesizer: Send + Sync {
    /// Submit a generation job.
    async fn submit(&self, request: &VideoRequest) -> ReelsmithResult<JobHandle>;

    /// Query a job's state.
    async fn status(&self, handle: &JobHandle) -> ReelsmithResult<JobStatus<VideoOutput>>;

    /// Fetch the bytes of a finished clip.
    async fn download(&self, output: &VideoOutput) -> ReelsmithResult<Vec<u8>>;

    /// Model identity, part of clip cache keys.
    fn model_name(&self) -> &str;
}
