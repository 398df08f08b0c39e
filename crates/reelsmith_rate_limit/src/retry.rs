//! Bounded exponential backoff around a unit of work.

use reelsmith_error::RetryableError;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_retry2::strategy::{ExponentialBackoff, jitter};
use tokio_retry2::{Retry, RetryError};

/// Retry configuration for one kind of external call.
///
/// A policy with `max_retries = 2` makes at most three attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_getters::Getters)]
pub struct RetryPolicy {
    max_retries: usize,
    initial_backoff_ms: u64,
    max_delay_secs: u64,
    jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, 2000)
    }
}

impl RetryPolicy {
    /// Policy with jittered exponential backoff starting at `initial_backoff_ms`.
    pub fn new(max_retries: usize, initial_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff_ms,
            max_delay_secs: 60,
            jitter: true,
        }
    }

    /// Policy that retries without waiting. Used where timing is irrelevant.
    pub fn immediate(max_retries: usize) -> Self {
        Self {
            max_retries,
            initial_backoff_ms: 0,
            max_delay_secs: 0,
            jitter: false,
        }
    }

    /// Cap on a single backoff delay.
    pub fn with_max_delay_secs(mut self, secs: u64) -> Self {
        self.max_delay_secs = secs;
        self
    }

    fn delays(&self) -> Box<dyn Iterator<Item = Duration> + Send> {
        let backoff = ExponentialBackoff::from_millis(self.initial_backoff_ms.max(1))
            .factor(2)
            .max_delay(Duration::from_secs(self.max_delay_secs));
        if self.initial_backoff_ms == 0 {
            Box::new(std::iter::repeat_n(Duration::ZERO, self.max_retries))
        } else if self.jitter {
            Box::new(backoff.map(jitter).take(self.max_retries))
        } else {
            Box::new(backoff.take(self.max_retries))
        }
    }

    /// Run `operation` until it succeeds, fails permanently, or retries run out.
    ///
    /// The closure receives the zero-based attempt number. Only errors whose
    /// [`RetryableError::is_retryable`] returns true are retried; the last
    /// error is returned when the budget is exhausted.
    ///
    /// The error's [`RetryableError::retry_strategy_params`] tighten the
    /// budget to its own retry count and, for policies that wait, raise each
    /// delay to at least its own backoff (a 429 waits longer than a 500).
    pub async fn run<F, Fut, R, E>(&self, label: &str, mut operation: F) -> Result<R, E>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: RetryableError + std::fmt::Display,
    {
        let attempts = AtomicUsize::new(0);
        let max_retries = self.max_retries;
        let planned: Vec<Duration> = self.delays().collect();
        let waits = self.initial_backoff_ms > 0;

        Retry::spawn(planned.clone().into_iter(), || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            let scheduled = planned.get(attempt).copied().unwrap_or_default();
            let fut = operation(attempt);
            async move {
                match fut.await {
                    Ok(value) => {
                        if attempt > 0 {
                            tracing::info!(label, attempt, "Succeeded after retry");
                        }
                        Ok(value)
                    }
                    Err(e)
                        if e.is_retryable()
                            && attempt < max_retries.min(e.retry_strategy_params().1) =>
                    {
                        let floor = if waits { error_backoff(&e, attempt) } else { Duration::ZERO };
                        let extra = floor.saturating_sub(scheduled);
                        tracing::warn!(
                            label,
                            attempt,
                            error = %e,
                            wait_ms = (scheduled + extra).as_millis() as u64,
                            "Transient error, will retry"
                        );
                        if !extra.is_zero() {
                            tokio::time::sleep(extra).await;
                        }
                        Err(RetryError::Transient {
                            err: e,
                            retry_after: None,
                        })
                    }
                    Err(e) => {
                        tracing::warn!(label, attempt, error = %e, "Giving up");
                        Err(RetryError::Permanent(e))
                    }
                }
            }
        })
        .await
    }
}

/// Backoff the error asks for before retry `attempt`.
fn error_backoff<E: RetryableError>(err: &E, attempt: usize) -> Duration {
    let (initial_ms, _, max_delay_secs) = err.retry_strategy_params();
    let factor = 1u64 << attempt.min(16);
    Duration::from_millis(initial_ms.saturating_mul(factor)).min(Duration::from_secs(max_delay_secs))
}
