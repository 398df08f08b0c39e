//! Script validation errors.

/// A single rule a generated script broke.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ValidationErrorKind {
    /// Wrong number of scenes
    #[display("expected {} scenes, got {}", expected, actual)]
    SceneCount {
        /// Required scene count
        expected: usize,
        /// Scene count in the response
        actual: usize,
    },
    /// A required string field was empty
    #[display("scene {} has an empty {}", scene_index, field)]
    EmptyField {
        /// Offending scene
        scene_index: usize,
        /// Field name
        field: String,
    },
    /// Narration cannot be spoken within the scene duration
    #[display("scene {} narration has {} words, at most {} fit", scene_index, words, max_words)]
    NarrationTooLong {
        /// Offending scene
        scene_index: usize,
        /// Words in the narration
        words: usize,
        /// Word budget for the scene
        max_words: usize,
    },
    /// Response was not the expected JSON shape
    #[display("malformed script response: {}", _0)]
    Malformed(String),
    /// All attempts produced invalid scripts
    #[display("script generation failed after {} attempts: {}", attempts, last_violation)]
    ScriptGenerationFailed {
        /// Number of language-model calls made
        attempts: usize,
        /// Violation reported by the final attempt
        last_violation: String,
    },
}

/// Validation error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Validation Error: {} at line {} in {}", kind, line, file)]
pub struct ValidationError {
    /// The kind of error that occurred
    pub kind: ValidationErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ValidationError {
    /// Create a new validation error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ValidationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
