//! External service errors and retry classification.

/// Error conditions reported by (or while talking to) an external service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ServiceErrorKind {
    /// Required API key not present in the environment
    #[display("{} environment variable not set", _0)]
    MissingCredentials(String),
    /// HTTP error with status code and message
    #[display("HTTP {} error: {}", status_code, message)]
    Http {
        /// HTTP status code
        status_code: u16,
        /// Error message
        message: String,
    },
    /// Request never reached the service or the connection dropped
    #[display("Transport error: {}", _0)]
    Transport(String),
    /// Service throttled the request
    #[display("Rate limited: {}", _0)]
    RateLimited(String),
    /// Polled job did not reach a terminal state in time
    #[display("Job {} timed out after {}s", job_id, seconds)]
    Timeout {
        /// Job identifier
        job_id: String,
        /// Timeout budget in seconds
        seconds: u64,
    },
    /// Polled job reached the failed state
    #[display("Job {} failed: {}", job_id, reason)]
    JobFailed {
        /// Job identifier
        job_id: String,
        /// Failure reason from the service
        reason: String,
    },
    /// Response did not have the expected shape
    #[display("Invalid response: {}", _0)]
    InvalidResponse(String),
}

impl ServiceErrorKind {
    /// Check if this error type should be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceErrorKind::Http { status_code, .. } => {
                matches!(*status_code, 408 | 429 | 500 | 502 | 503 | 504)
            }
            ServiceErrorKind::Transport(_) => true,
            ServiceErrorKind::RateLimited(_) => true,
            ServiceErrorKind::Timeout { .. } => true,
            ServiceErrorKind::JobFailed { .. } => true,
            _ => false,
        }
    }

    /// Get retry strategy parameters for this error type.
    ///
    /// Returns `(initial_backoff_ms, max_retries, max_delay_secs)`.
    pub fn retry_strategy_params(&self) -> (u64, usize, u64) {
        match self {
            ServiceErrorKind::Http { status_code, .. } => match *status_code {
                429 => (5000, 3, 40),
                503 => (2000, 5, 60),
                500 | 502 | 504 => (1000, 3, 8),
                408 => (2000, 4, 30),
                _ => (2000, 5, 60),
            },
            ServiceErrorKind::RateLimited(_) => (5000, 3, 40),
            ServiceErrorKind::Transport(_) => (1000, 3, 10),
            _ => (2000, 2, 60),
        }
    }
}

/// Error from an external AI service, tagged with the service name.
///
/// # Examples
///
/// ```
/// use reelsmith_error::{ServiceError, ServiceErrorKind};
///
/// let err = ServiceError::new("video", ServiceErrorKind::MissingCredentials("GEMINI_API_KEY".into()));
/// assert!(format!("{}", err).contains("GEMINI_API_KEY"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Service Error ({}): {} at line {} in {}", service, kind, line, file)]
pub struct ServiceError {
    /// Service that failed (e.g. "language", "video", "speech")
    pub service: String,
    /// The kind of error that occurred
    pub kind: ServiceErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ServiceError {
    /// Create a new ServiceError with automatic location tracking.
    #[track_caller]
    pub fn new(service: impl Into<String>, kind: ServiceErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            service: service.into(),
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Trait for errors that support retry logic.
///
/// # Examples
///
/// ```
/// use reelsmith_error::{RetryableError, ServiceError, ServiceErrorKind};
///
/// let err = ServiceError::new("video", ServiceErrorKind::Http {
///     status_code: 503,
///     message: "Service unavailable".to_string(),
/// });
///
/// assert!(err.is_retryable());
/// let (backoff, retries, _max_delay) = err.retry_strategy_params();
/// assert_eq!(backoff, 2000);
/// assert_eq!(retries, 5);
/// ```
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    ///
    /// Transient errors like 503, 429, timeouts or failed jobs return true.
    /// Permanent errors like 401, 400 or a broken continuity chain return false.
    fn is_retryable(&self) -> bool;

    /// Get retry strategy parameters for this error.
    ///
    /// Returns `(initial_backoff_ms, max_retries, max_delay_secs)`.
    fn retry_strategy_params(&self) -> (u64, usize, u64) {
        (2000, 2, 60)
    }
}

impl RetryableError for ServiceError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    fn retry_strategy_params(&self) -> (u64, usize, u64) {
        self.kind.retry_strategy_params()
    }
}
