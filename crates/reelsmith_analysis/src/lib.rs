//! Repository analysis for Reelsmith.
//!
//! Turns a local path or remote URL into an [`AnalysisBundle`]: the README,
//! recognised package manifests, markdown under `docs/`, and a deterministic
//! sample of source files, each truncated to a byte budget.
//!
//! [`AnalysisBundle`]: reelsmith_core::AnalysisBundle

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod analyzer;
mod limits;
mod location;
mod sampling;

pub use analyzer::RepositoryAnalyzer;
pub use limits::AnalysisLimits;
pub use location::{Checkout, RepositoryLocation};
pub use sampling::{CODE_EXTENSIONS, MANIFESTS, SKIPPED_DIRS, language_for_extension, truncate_utf8};
