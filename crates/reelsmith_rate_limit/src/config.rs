//! Per-service limit configuration.

use serde::{Deserialize, Serialize};

/// Limits for one external service.
///
/// `None` means unlimited.
///
/// ```toml
/// [rate_limits.video]
/// rpm = 10
/// max_concurrent = 1
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, derive_getters::Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_", strip_option)]
pub struct RateLimitConfig {
    /// Requests per minute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rpm: Option<u32>,
    /// Maximum requests in flight
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_concurrent: Option<u32>,
}
