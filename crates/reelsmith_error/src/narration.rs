//! Narration errors.

/// Narration synthesis exhausted its retries for one scene.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Narration Error: scene {} failed: {} at line {} in {}", scene_index, reason, line, file)]
pub struct NarrationError {
    /// Scene that failed
    pub scene_index: usize,
    /// Last underlying failure
    pub reason: String,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl NarrationError {
    /// Create a new narration error with automatic location tracking.
    #[track_caller]
    pub fn new(scene_index: usize, reason: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            scene_index,
            reason: reason.into(),
            line: location.line(),
            file: location.file(),
        }
    }
}
