//! Reelsmith - repository to explainer video
//!
//! Reelsmith reads a source repository, asks a language model for a
//! five-scene script, generates one visually continuous clip per scene,
//! narrates each scene and encodes a 30-second explainer video.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use reelsmith::{
//!     ArtifactStore, Credentials, Pipeline, PipelineServices, ReelsmithConfig,
//!     RepositoryLocation, RunMode,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ReelsmithConfig::load()?;
//!     let services = PipelineServices::from_config(&config, &Credentials::from_env())?;
//!     let store = ArtifactStore::open(config.cache_dir())?;
//!     let pipeline = Pipeline::new(&config, services, store, CancellationToken::new());
//!
//!     let location = RepositoryLocation::parse(".");
//!     let report = pipeline.run(&location, RunMode::Preview, "out.mp4".as_ref()).await?;
//!     println!("{}", report.script().video_title);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! Reelsmith is organized as a workspace with focused crates:
//!
//! - `reelsmith_error` - Error types
//! - `reelsmith_core` - Analysis bundle, script, artifacts and cache keys
//! - `reelsmith_storage` - Content-addressed artifact store
//! - `reelsmith_rate_limit` - Per-service rate limiting and retry
//! - `reelsmith_models` - Language, video and speech service clients
//! - `reelsmith_analysis` - Repository sampling
//! - `reelsmith_compose` - ffmpeg encoder and compositor
//! - `reelsmith_pipeline` - Stage orchestration and configuration
//!
//! This crate (`reelsmith`) re-exports everything for convenience and
//! hosts the command-line interface.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
mod logging;

pub use logging::{LoggingConfig, init_logging};

pub use reelsmith_analysis::*;
pub use reelsmith_compose::*;
pub use reelsmith_core::*;
pub use reelsmith_error::*;
pub use reelsmith_models::*;
pub use reelsmith_pipeline::*;
pub use reelsmith_rate_limit::{RateLimitConfig, RateLimiter, RateLimiterGuard, RetryPolicy};
pub use reelsmith_storage::{
    ArtifactBackend, ArtifactPayload, ArtifactStore, Blob, BlobRecord, CacheEntry,
    FileSystemBackend, Fetched, MANIFEST_FILE, Manifest, Provenance,
};
