//! Composition errors. All of these are terminal.

/// Specific error conditions for composition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum CompositionErrorKind {
    /// An input artifact is missing
    #[display("Missing input: {}", _0)]
    MissingInput(String),
    /// An input has the wrong duration
    #[display("Duration mismatch for {}: expected {}ms, got {}ms", input, expected_ms, actual_ms)]
    DurationMismatch {
        /// Input description
        input: String,
        /// Expected duration in milliseconds
        expected_ms: u64,
        /// Measured duration in milliseconds
        actual_ms: u64,
    },
    /// Encoder process could not be started
    #[display("Encoder unavailable: {}", _0)]
    EncoderUnavailable(String),
    /// Encoder exited unsuccessfully
    #[display("Encoder failed: {}", _0)]
    EncoderFailed(String),
}

/// Composition error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Composition Error: {} at line {} in {}", kind, line, file)]
pub struct CompositionError {
    /// The kind of error that occurred
    pub kind: CompositionErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl CompositionError {
    /// Create a new composition error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: CompositionErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
