//! Stage orchestration for Reelsmith.
//!
//! A run turns a repository into a 30-second explainer video:
//!
//! 1. **Analysis**: sample the repository into an [`AnalysisBundle`](reelsmith_core::AnalysisBundle)
//! 2. **Script writing**: brief, then a validated five-scene script ([`ScriptSynthesizer`])
//! 3. **Clip chain**: one clip per scene, each seeded by the previous clip's last frame ([`ClipChain`])
//! 4. **Narration**: one audio track per scene, concurrent with the clip chain ([`NarrationSynthesizer`])
//! 5. **Composition**: encode the final video ([`reelsmith_compose::Compositor`])
//!
//! Every stage output goes through the artifact store, so an interrupted
//! run resumes from the last completed artifact and an unchanged re-run
//! makes no external calls.
//!
//! # Example
//!
//! ```rust,no_run
//! use reelsmith_analysis::RepositoryLocation;
//! use reelsmith_pipeline::{Credentials, Pipeline, PipelineServices, ReelsmithConfig, RunMode};
//! use reelsmith_storage::ArtifactStore;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ReelsmithConfig::load()?;
//! let credentials = Credentials::from_env();
//! let services = PipelineServices::from_config(&config, &credentials)?;
//! let store = ArtifactStore::open(config.cache_dir())?;
//! let pipeline = Pipeline::new(&config, services, store, CancellationToken::new());
//!
//! let location = RepositoryLocation::parse("https://github.com/owner/project");
//! let report = pipeline
//!     .run(&location, RunMode::Full, "explainer.mp4".as_ref())
//!     .await?;
//! println!("{}", report.script().video_title);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod clips;
mod config;
mod controller;
mod graph;
mod narration;
mod prompts;
mod script;

pub use clips::{CLIP_BLOB, ClipChain, FRAME_BLOB};
pub use config::{
    CompositionConfig, Credentials, DEFAULT_CONFIG, LanguageConfig, ReelsmithConfig,
    SpeechConfig, VideoConfig, VideoQuality,
};
pub use controller::{
    CachedProgress, Pipeline, PipelineServices, RunFailure, RunMode, RunReport, RunState,
    VideoReport,
};
pub use graph::{TaskGraph, TaskId, TaskOutputs};
pub use narration::{AUDIO_BLOB, NarrationSynthesizer};
pub use prompts::{
    SYSTEM_PROMPT, brief_prompt, corrective_instruction, parse_brief, parse_script,
    script_prompt, strip_code_fence,
};
pub use script::{ScriptOutcome, ScriptSynthesizer};
