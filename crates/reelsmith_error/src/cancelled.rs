//! Run cancellation.

/// A run was aborted between stages or while waiting on an external job.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Run cancelled during {} at line {} in {}", stage, line, file)]
pub struct CancelledError {
    /// Stage that observed the cancellation
    pub stage: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl CancelledError {
    /// Create a new CancelledError for the given stage.
    #[track_caller]
    pub fn new(stage: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            stage: stage.into(),
            line: location.line(),
            file: location.file(),
        }
    }
}
