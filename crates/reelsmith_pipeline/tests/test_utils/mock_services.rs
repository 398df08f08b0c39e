//! Mock services for testing without API calls or ffmpeg.

#![allow(dead_code)]

use async_trait::async_trait;
use reelsmith_compose::MediaEncoder;
use reelsmith_core::{CompositionSpec, sha256_hex};
use reelsmith_error::{
    CompositionError, CompositionErrorKind, ReelsmithResult, ServiceError, ServiceErrorKind,
};
use reelsmith_models::{
    JobHandle, JobStatus, LanguageModel, SpeechRequest, SpeechSynthesizer, TextRequest,
    VideoOutput, VideoRequest, VideoSynthesizer,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One scripted language-model answer.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return this text
    Text(String),
    /// Fail with this HTTP status
    Http(u16),
}

impl MockResponse {
    fn resolve(&self, service: &str) -> ReelsmithResult<String> {
        match self {
            MockResponse::Text(text) => Ok(text.clone()),
            MockResponse::Http(status_code) => Err(ServiceError::new(
                service,
                ServiceErrorKind::Http {
                    status_code: *status_code,
                    message: "mock failure".to_string(),
                },
            )
            .into()),
        }
    }
}

/// How a mock answers successive calls.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Always return this text
    Success(String),
    /// Fail `fail_count` times with `status_code`, then return `success_text`
    FailThenSucceed {
        fail_count: usize,
        status_code: u16,
        success_text: String,
    },
    /// Answer in order; the last answer repeats
    Sequence(Vec<MockResponse>),
}

impl MockBehavior {
    fn respond(&self, call: usize, service: &str) -> ReelsmithResult<String> {
        match self {
            MockBehavior::Success(text) => Ok(text.clone()),
            MockBehavior::FailThenSucceed {
                fail_count,
                status_code,
                success_text,
            } => {
                if call < *fail_count {
                    MockResponse::Http(*status_code).resolve(service)
                } else {
                    Ok(success_text.clone())
                }
            }
            MockBehavior::Sequence(responses) => match responses.get(call).or(responses.last()) {
                Some(response) => response.resolve(service),
                None => MockResponse::Http(500).resolve(service),
            },
        }
    }
}

/// Language model answering brief and script prompts separately.
pub struct MockLanguageModel {
    brief: MockBehavior,
    script: MockBehavior,
    brief_calls: AtomicUsize,
    script_calls: AtomicUsize,
    script_prompts: Mutex<Vec<String>>,
}

impl MockLanguageModel {
    /// Always answers with these documents.
    pub fn new_success(brief: String, script: String) -> Self {
        Self::new_with_behavior(MockBehavior::Success(brief), MockBehavior::Success(script))
    }

    /// Custom behavior per prompt kind.
    pub fn new_with_behavior(brief: MockBehavior, script: MockBehavior) -> Self {
        Self {
            brief,
            script,
            brief_calls: AtomicUsize::new(0),
            script_calls: AtomicUsize::new(0),
            script_prompts: Mutex::new(Vec::new()),
        }
    }

    /// Brief requests received.
    pub fn brief_calls(&self) -> usize {
        self.brief_calls.load(Ordering::SeqCst)
    }

    /// Script requests received.
    pub fn script_calls(&self) -> usize {
        self.script_calls.load(Ordering::SeqCst)
    }

    /// All requests received.
    pub fn call_count(&self) -> usize {
        self.brief_calls() + self.script_calls()
    }

    /// User prompts of script requests, in order.
    pub fn script_prompts(&self) -> Vec<String> {
        self.script_prompts.lock().expect("lock").clone()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn generate(&self, request: &TextRequest) -> ReelsmithResult<String> {
        if request.user().starts_with("Analyze this software repository") {
            let call = self.brief_calls.fetch_add(1, Ordering::SeqCst);
            self.brief.respond(call, "language")
        } else {
            let call = self.script_calls.fetch_add(1, Ordering::SeqCst);
            self.script_prompts
                .lock()
                .expect("lock")
                .push(request.user().clone());
            self.script.respond(call, "language")
        }
    }

    fn model_name(&self) -> &str {
        "mock-language"
    }
}

#[derive(Debug, Clone)]
struct SubmittedJob {
    prompt: String,
    seed_frame: Option<Vec<u8>>,
    fail: bool,
}

/// Video service whose jobs finish on the first poll.
///
/// Failures are scripted per prompt marker: the first `n` jobs whose prompt
/// contains the marker end in `Failed`.
#[derive(Default)]
pub struct MockVideo {
    failures: Mutex<HashMap<String, usize>>,
    jobs: Mutex<Vec<SubmittedJob>>,
    downloads: AtomicUsize,
}

impl MockVideo {
    /// Video service that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` jobs whose prompt contains `marker`.
    pub fn fail_times(self, marker: &str, times: usize) -> Self {
        self.failures
            .lock()
            .expect("lock")
            .insert(marker.to_string(), times);
        self
    }

    /// Total jobs submitted.
    pub fn submit_count(&self) -> usize {
        self.jobs.lock().expect("lock").len()
    }

    /// Jobs submitted with a prompt containing `marker`.
    pub fn submits_for(&self, marker: &str) -> usize {
        self.jobs
            .lock()
            .expect("lock")
            .iter()
            .filter(|job| job.prompt.contains(marker))
            .count()
    }

    /// Seed frames sent with prompts containing `marker`, in submit order.
    pub fn seeds_for(&self, marker: &str) -> Vec<Option<Vec<u8>>> {
        self.jobs
            .lock()
            .expect("lock")
            .iter()
            .filter(|job| job.prompt.contains(marker))
            .map(|job| job.seed_frame.clone())
            .collect()
    }

    /// Completed downloads.
    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoSynthesizer for MockVideo {
    async fn submit(&self, request: &VideoRequest) -> ReelsmithResult<JobHandle> {
        let fail = {
            let mut failures = self.failures.lock().expect("lock");
            match failures
                .iter_mut()
                .find(|(marker, remaining)| request.prompt().contains(marker.as_str()) && **remaining > 0)
            {
                Some((_, remaining)) => {
                    *remaining -= 1;
                    true
                }
                None => false,
            }
        };
        let mut jobs = self.jobs.lock().expect("lock");
        jobs.push(SubmittedJob {
            prompt: request.prompt().clone(),
            seed_frame: request.seed_frame().clone(),
            fail,
        });
        Ok(JobHandle::new("video", format!("job-{}", jobs.len() - 1)))
    }

    async fn status(&self, handle: &JobHandle) -> ReelsmithResult<JobStatus<VideoOutput>> {
        let index: usize = handle
            .id()
            .trim_start_matches("job-")
            .parse()
            .expect("mock job id");
        let job = self.jobs.lock().expect("lock")[index].clone();
        if job.fail {
            return Ok(JobStatus::Failed {
                reason: "mock generation failure".to_string(),
            });
        }
        Ok(JobStatus::Succeeded(VideoOutput {
            uri: handle.id().clone(),
        }))
    }

    async fn download(&self, output: &VideoOutput) -> ReelsmithResult<Vec<u8>> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let index: usize = output
            .uri
            .trim_start_matches("job-")
            .parse()
            .expect("mock job id");
        let job = self.jobs.lock().expect("lock")[index].clone();
        // Content depends only on the request, like a deterministic model.
        let seed = job.seed_frame.as_deref().map(sha256_hex).unwrap_or_default();
        Ok(format!("mp4|{}|{}", job.prompt, seed).into_bytes())
    }

    fn model_name(&self) -> &str {
        "mock-video"
    }
}

/// Speech service returning the text as bytes.
#[derive(Default)]
pub struct MockSpeech {
    failures: Mutex<HashMap<String, usize>>,
    calls: AtomicUsize,
    texts: Mutex<Vec<String>>,
}

impl MockSpeech {
    /// Speech service that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` requests whose text contains `marker` with HTTP 503.
    pub fn fail_times(self, marker: &str, times: usize) -> Self {
        self.failures
            .lock()
            .expect("lock")
            .insert(marker.to_string(), times);
        self
    }

    /// Requests received.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Texts of every request, in order.
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().expect("lock").clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSpeech {
    async fn synthesize(&self, request: &SpeechRequest) -> ReelsmithResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().expect("lock").push(request.text.clone());
        let fail = {
            let mut failures = self.failures.lock().expect("lock");
            match failures
                .iter_mut()
                .find(|(marker, remaining)| request.text.contains(marker.as_str()) && **remaining > 0)
            {
                Some((_, remaining)) => {
                    *remaining -= 1;
                    true
                }
                None => false,
            }
        };
        if fail {
            return Err(ServiceError::new(
                "speech",
                ServiceErrorKind::Http {
                    status_code: 503,
                    message: "mock outage".to_string(),
                },
            )
            .into());
        }
        Ok(format!("mp3|{}|{}", request.voice, request.text).into_bytes())
    }

    fn model_name(&self) -> &str {
        "mock-speech"
    }
}

/// Encoder that derives frames from clip bytes and reports nominal durations.
///
/// Every input probes at one scene slot; `final.mp4` probes at the full
/// video length.
pub struct MockEncoder {
    scene_ms: u64,
    output_ms: u64,
    available: bool,
    frame_failures: AtomicUsize,
    frame_extractions: AtomicUsize,
    encode_calls: AtomicUsize,
}

impl Default for MockEncoder {
    fn default() -> Self {
        Self {
            scene_ms: 6_000,
            output_ms: 30_000,
            available: true,
            frame_failures: AtomicUsize::new(0),
            frame_extractions: AtomicUsize::new(0),
            encode_calls: AtomicUsize::new(0),
        }
    }
}

impl MockEncoder {
    /// Encoder with nominal durations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report this duration for the final video.
    pub fn with_output_ms(mut self, ms: u64) -> Self {
        self.output_ms = ms;
        self
    }

    /// Report the encoder as missing.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Fail the next `times` frame extractions.
    pub fn fail_frames(self, times: usize) -> Self {
        self.frame_failures.store(times, Ordering::SeqCst);
        self
    }

    /// Last frames extracted.
    pub fn frame_extractions(&self) -> usize {
        self.frame_extractions.load(Ordering::SeqCst)
    }

    /// Final encodes performed.
    pub fn encode_calls(&self) -> usize {
        self.encode_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaEncoder for MockEncoder {
    async fn check_available(&self) -> ReelsmithResult<()> {
        if self.available {
            Ok(())
        } else {
            Err(CompositionError::new(CompositionErrorKind::EncoderUnavailable(
                "mock encoder missing".to_string(),
            ))
            .into())
        }
    }

    async fn probe_duration(&self, path: &Path) -> ReelsmithResult<u64> {
        if path.file_name().is_some_and(|name| name == "final.mp4") {
            Ok(self.output_ms)
        } else {
            Ok(self.scene_ms)
        }
    }

    async fn extract_last_frame(&self, clip: &Path, destination: &Path) -> ReelsmithResult<()> {
        let failing = self
            .frame_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(CompositionError::new(CompositionErrorKind::EncoderFailed(
                "mock frame extraction failure".to_string(),
            ))
            .into());
        }
        self.frame_extractions.fetch_add(1, Ordering::SeqCst);
        let bytes = std::fs::read(clip).expect("read clip");
        std::fs::write(destination, format!("png|{}", sha256_hex(&bytes))).expect("write frame");
        Ok(())
    }

    async fn encode(&self, spec: &CompositionSpec) -> ReelsmithResult<()> {
        self.encode_calls.fetch_add(1, Ordering::SeqCst);
        let mut body = String::from("final|");
        for clip in spec.clips() {
            body.push_str(&clip.display().to_string());
        }
        std::fs::write(spec.output(), body).expect("write output");
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
