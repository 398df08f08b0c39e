//! Core data types for Reelsmith.
//!
//! The data model of an explainer run: the analysis bundle gathered from the
//! repository, the five-scene script, per-scene clip and narration artifacts,
//! and the composition spec handed to the encoder. Cache keys for every stage
//! are derived here so that every crate agrees on them.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod analysis;
mod artifact;
mod brief;
mod composition;
mod fingerprint;
mod script;
mod stage;

pub use analysis::{AnalysisBundle, RepositoryMetadata, SampleKind, SourceSample};
pub use artifact::{
    ClipArtifact, ClipArtifactBuilder, NO_SEED, NarrationArtifact, NarrationArtifactBuilder,
    verify_continuity,
};
pub use brief::ProjectBrief;
pub use composition::{
    CompositionSpec, DURATION_TOLERANCE_MS, EncodingParams, MusicTrack, Resolution, SceneSlot,
    within_duration_tolerance,
};
pub use fingerprint::{CacheKey, Fingerprinter, sha256_hex};
pub use script::{
    SCENE_COUNT, SCENE_DURATION_SECS, Scene, SceneRole, Script, TOTAL_DURATION_SECS,
    WORDS_PER_SECOND, max_narration_words,
};
pub use stage::Stage;
