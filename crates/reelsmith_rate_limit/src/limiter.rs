//! Rate limiter implementation using governor and Tokio Semaphore.

use crate::RateLimitConfig;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use reelsmith_error::{ReelsmithResult, ServiceError, ServiceErrorKind};
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::Semaphore;

type DirectRateLimiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limiter for one external service.
///
/// Cloning shares the underlying quotas, so every clone of a client draws
/// from the same budget.
#[derive(Clone)]
pub struct RateLimiter {
    service: String,
    rpm_limiter: Option<Arc<DirectRateLimiter>>,
    concurrent_semaphore: Arc<Semaphore>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("service", &self.service)
            .field("rpm_limited", &self.rpm_limiter.is_some())
            .field("available", &self.concurrent_semaphore.available_permits())
            .finish()
    }
}

impl RateLimiter {
    /// Create a limiter enforcing every limit set in `config`.
    pub fn new(service: impl Into<String>, config: &RateLimitConfig) -> Self {
        let rpm_limiter = config.rpm().and_then(|rpm| {
            NonZeroU32::new(rpm).map(|n| Arc::new(GovernorRateLimiter::direct(Quota::per_minute(n))))
        });

        let max_concurrent = config
            .max_concurrent()
            .map(|n| n.max(1) as usize)
            .unwrap_or(Semaphore::MAX_PERMITS);

        Self {
            service: service.into(),
            rpm_limiter,
            concurrent_semaphore: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    /// A limiter that never waits.
    pub fn unlimited(service: impl Into<String>) -> Self {
        Self::new(service, &RateLimitConfig::default())
    }

    /// Service this limiter guards.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Wait until a request may be sent.
    ///
    /// Returns a guard that releases the concurrency slot when dropped.
    ///
    /// # Errors
    ///
    /// Returns `RateLimited` if the limiter has been shut down.
    pub async fn acquire(&self) -> ReelsmithResult<RateLimiterGuard> {
        if let Some(limiter) = &self.rpm_limiter {
            limiter.until_ready().await;
        }

        // Concurrency slot last, to avoid holding it while waiting on the quota
        let permit = self
            .concurrent_semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| {
                ServiceError::new(
                    &self.service,
                    ServiceErrorKind::RateLimited("limiter closed".to_string()),
                )
            })?;

        tracing::trace!(service = %self.service, "Rate limit permit acquired");
        Ok(RateLimiterGuard { _permit: permit })
    }

    /// Try to acquire without waiting.
    pub fn try_acquire(&self) -> Option<RateLimiterGuard> {
        if let Some(limiter) = &self.rpm_limiter {
            limiter.check().ok()?;
        }
        let permit = self.concurrent_semaphore.clone().try_acquire_owned().ok()?;
        Some(RateLimiterGuard { _permit: permit })
    }
}

/// RAII guard for rate limiter.
///
/// Releases the concurrency slot when dropped.
pub struct RateLimiterGuard {
    _permit: tokio::sync::OwnedSemaphorePermit,
}
