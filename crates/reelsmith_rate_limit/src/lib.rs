//! Rate limiting and retry for Reelsmith's external services.
//!
//! - [`RateLimiter`] gates every outbound request: requests-per-minute via
//!   governor's GCRA limiter, in-flight requests via a Tokio semaphore.
//! - [`RetryPolicy`] wraps a whole unit of work (for video, submit plus
//!   polling) in bounded exponential backoff, retrying only errors that
//!   report themselves as transient through [`RetryableError`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod limiter;
mod retry;

pub use config::RateLimitConfig;
pub use limiter::{RateLimiter, RateLimiterGuard};
pub use reelsmith_error::RetryableError;
pub use retry::RetryPolicy;
