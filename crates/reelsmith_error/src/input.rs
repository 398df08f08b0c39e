//! Repository input errors.
//!
//! These fail fast: they are raised before any paid service call is made.

/// Specific error conditions for repository input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum InputErrorKind {
    /// Location cannot be read
    #[display("Repository unavailable: {}", _0)]
    RepositoryUnavailable(String),
    /// Remote location could not be cloned
    #[display("Failed to clone repository: {}", _0)]
    CloneFailed(String),
    /// No readable text content was found
    #[display("Repository has no readable text content: {}", _0)]
    EmptyRepository(String),
}

/// Input error with location tracking.
///
/// # Examples
///
/// ```
/// use reelsmith_error::{InputError, InputErrorKind};
///
/// let err = InputError::new(InputErrorKind::EmptyRepository("/tmp/empty".to_string()));
/// assert!(format!("{}", err).contains("no readable text"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Input Error: {} at line {} in {}", kind, line, file)]
pub struct InputError {
    /// The kind of error that occurred
    pub kind: InputErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl InputError {
    /// Create a new input error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: InputErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
