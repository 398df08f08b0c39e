//! Top-level error wrapper types.

use crate::{
    CancelledError, ClipError, CompositionError, ConfigError, InputError, JsonError,
    NarrationError, RetryableError, ServiceError, StorageError, ValidationError,
};

/// Every error family a Reelsmith run can produce.
///
/// # Examples
///
/// ```
/// use reelsmith_error::{ReelsmithError, ConfigError};
///
/// let err: ReelsmithError = ConfigError::new("bad quality").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum ReelsmithErrorKind {
    /// Bad repository location or empty content
    #[from(InputError)]
    Input(InputError),
    /// Malformed script
    #[from(ValidationError)]
    Validation(ValidationError),
    /// External service failure
    #[from(ServiceError)]
    Service(ServiceError),
    /// Clip chain failure
    #[from(ClipError)]
    Clip(ClipError),
    /// Narration failure
    #[from(NarrationError)]
    Narration(NarrationError),
    /// Composition failure
    #[from(CompositionError)]
    Composition(CompositionError),
    /// Artifact store failure
    #[from(StorageError)]
    Storage(StorageError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Run aborted
    #[from(CancelledError)]
    Cancelled(CancelledError),
}

/// Reelsmith error with kind discrimination.
///
/// # Examples
///
/// ```
/// use reelsmith_error::{ReelsmithResult, InputError, InputErrorKind};
///
/// fn analyze() -> ReelsmithResult<()> {
///     Err(InputError::new(InputErrorKind::RepositoryUnavailable("nope".into())))?
/// }
///
/// assert!(analyze().is_err());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Reelsmith Error: {}", _0)]
pub struct ReelsmithError(Box<ReelsmithErrorKind>);

impl ReelsmithError {
    /// Create a new error from a kind.
    pub fn new(kind: ReelsmithErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ReelsmithErrorKind {
        &self.0
    }

    /// Whether the failure may succeed when attempted again.
    ///
    /// Only transient service failures qualify. Continuity violations,
    /// validation and composition errors never do.
    pub fn is_retryable(&self) -> bool {
        match self.kind() {
            ReelsmithErrorKind::Service(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Scene index the failure is attributed to, if any.
    pub fn scene_index(&self) -> Option<usize> {
        match self.kind() {
            ReelsmithErrorKind::Clip(e) => Some(e.kind.scene_index()),
            ReelsmithErrorKind::Narration(e) => Some(e.scene_index),
            _ => None,
        }
    }
}

impl RetryableError for ReelsmithError {
    fn is_retryable(&self) -> bool {
        ReelsmithError::is_retryable(self)
    }

    fn retry_strategy_params(&self) -> (u64, usize, u64) {
        match self.kind() {
            ReelsmithErrorKind::Service(e) => e.retry_strategy_params(),
            _ => (2000, 2, 60),
        }
    }
}

// Generic From implementation for any type that converts to ReelsmithErrorKind
impl<T> From<T> for ReelsmithError
where
    T: Into<ReelsmithErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Reelsmith operations.
pub type ReelsmithResult<T> = std::result::Result<T, ReelsmithError>;
