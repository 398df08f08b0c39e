//! Byte and file-count budgets for sampling.

use serde::{Deserialize, Serialize};

/// Bounds on what goes into an analysis bundle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_")]
#[serde(default)]
pub struct AnalysisLimits {
    /// Maximum sampled source files
    max_sampled_files: usize,
    /// Maximum sampled files per extension
    max_files_per_extension: usize,
    /// Byte budget per source file
    max_file_bytes: usize,
    /// Byte budget for the README
    max_readme_bytes: usize,
    /// Byte budget per docs/ file
    max_doc_bytes: usize,
    /// Maximum docs/ files included
    max_doc_files: usize,
    /// Byte budget per manifest
    max_manifest_bytes: usize,
}

impl Default for AnalysisLimits {
    fn default() -> Self {
        Self {
            max_sampled_files: 10,
            max_files_per_extension: 3,
            max_file_bytes: 2000,
            max_readme_bytes: 10_000,
            max_doc_bytes: 5000,
            max_doc_files: 5,
            max_manifest_bytes: 5000,
        }
    }
}
