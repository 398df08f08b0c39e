//! Poll-until-terminal abstraction for long-running external jobs.

use reelsmith_error::{CancelledError, ReelsmithResult, ServiceError, ServiceErrorKind};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Opaque reference to an in-progress external job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_getters::Getters)]
pub struct JobHandle {
    /// Service-assigned job identifier
    id: String,
    /// Service that owns the job
    service: String,
}

impl JobHandle {
    /// Create a handle.
    pub fn new(service: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            service: service.into(),
        }
    }
}

/// Observed state of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus<T> {
    /// Accepted, not started
    Pending,
    /// In progress, with optional percentage
    Running {
        /// Completion percentage if reported
        progress: Option<u8>,
    },
    /// Finished with output
    Succeeded(T),
    /// Finished without output
    Failed {
        /// Reason reported by the service
        reason: String,
    },
}

impl<T> JobStatus<T> {
    /// Whether the job will not change state again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded(_) | JobStatus::Failed { .. })
    }

    fn label(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running { .. } => "running",
            JobStatus::Succeeded(_) => "succeeded",
            JobStatus::Failed { .. } => "failed",
        }
    }
}

/// Polling cadence and budget for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_getters::Getters)]
pub struct PollConfig {
    interval: Duration,
    timeout: Duration,
}

impl PollConfig {
    /// Shortest allowed polling interval.
    pub const MIN_INTERVAL: Duration = Duration::from_secs(5);
    /// Longest allowed polling interval.
    pub const MAX_INTERVAL: Duration = Duration::from_secs(15);

    /// Interval is clamped to [`Self::MIN_INTERVAL`]..=[`Self::MAX_INTERVAL`].
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval: interval.clamp(Self::MIN_INTERVAL, Self::MAX_INTERVAL),
            timeout,
        }
    }

    /// Same as [`PollConfig::new`] with whole seconds.
    pub fn from_secs(interval_secs: u64, timeout_secs: u64) -> Self {
        Self::new(
            Duration::from_secs(interval_secs),
            Duration::from_secs(timeout_secs),
        )
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::from_secs(10, 360)
    }
}

/// Poll `probe` until the job reaches a terminal state.
///
/// `probe` captures whatever it needs to query `handle`. Probes immediately, then once per interval. A failed job and an
/// exceeded timeout are both reported as retryable [`ServiceError`]s;
/// cancellation is reported as [`CancelledError`].
#[tracing::instrument(
    skip(config, cancel, probe),
    fields(service = %handle.service(), job_id = %handle.id())
)]
pub async fn poll_until_terminal<T, F, Fut>(
    handle: &JobHandle,
    config: &PollConfig,
    cancel: &CancellationToken,
    mut probe: F,
) -> ReelsmithResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ReelsmithResult<JobStatus<T>>>,
{
    let deadline = tokio::time::Instant::now() + config.timeout;
    let mut polls = 0u32;

    loop {
        let status = probe().await?;
        polls += 1;
        match status {
            JobStatus::Succeeded(output) => {
                tracing::info!(polls, "Job succeeded");
                return Ok(output);
            }
            JobStatus::Failed { reason } => {
                tracing::warn!(polls, reason = %reason, "Job failed");
                return Err(ServiceError::new(
                    handle.service(),
                    ServiceErrorKind::JobFailed {
                        job_id: handle.id().clone(),
                        reason,
                    },
                )
                .into());
            }
            JobStatus::Running { progress } => {
                tracing::debug!(polls, status = "running", progress, "Job poll");
            }
            ref other => {
                tracing::debug!(polls, status = other.label(), "Job poll");
            }
        }

        let now = tokio::time::Instant::now();
        if now >= deadline {
            return Err(ServiceError::new(
                handle.service(),
                ServiceErrorKind::Timeout {
                    job_id: handle.id().clone(),
                    seconds: config.timeout.as_secs(),
                },
            )
            .into());
        }

        let wait = config.interval.min(deadline - now);
        tokio::select! {
            _ = cancel.cancelled() => {
                return Err(CancelledError::new(format!("polling job {}", handle.id())).into());
            }
            _ = tokio::time::sleep(wait) => {}
        }
    }
}
