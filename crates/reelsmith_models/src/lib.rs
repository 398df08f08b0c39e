//! External service contracts and clients for Reelsmith.
//!
//! Three services feed the pipeline:
//!
//! - [`LanguageModel`]: analysis brief and script generation (Gemini)
//! - [`VideoSynthesizer`]: asynchronous clip generation with an optional
//!   seed frame (Veo, long-running operations)
//! - [`SpeechSynthesizer`]: narration audio (ElevenLabs)
//!
//! Long-running jobs are driven by [`poll_until_terminal`], which knows
//! nothing about retries: callers wrap submit-and-poll as one unit in a
//! [`reelsmith_rate_limit::RetryPolicy`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod elevenlabs;
mod gemini;
mod http;
mod job;
mod language;
mod speech;
mod veo;
mod video;

pub use elevenlabs::{ElevenLabsClient, resolve_voice_id};
pub use gemini::GeminiLanguageModel;
pub use job::{JobHandle, JobStatus, PollConfig, poll_until_terminal};
pub use language::{LanguageModel, TextRequest, TextRequestBuilder};
pub use speech::{SpeechRequest, SpeechSynthesizer};
pub use veo::VeoClient;
pub use video::{VideoOutput, VideoRequest, VideoRequestBuilder, VideoSynthesizer};
