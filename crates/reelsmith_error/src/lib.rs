//! Error types for Reelsmith.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! The families map onto how a run reacts to them:
//!
//! | Family | Reaction |
//! |---|---|
//! | [`InputError`] | fail fast, before any paid call |
//! | [`ValidationError`] | retried with a corrective instruction, then fatal |
//! | [`ServiceError`] | retried with backoff when [`RetryableError::is_retryable`], then fatal |
//! | [`ClipError`] continuity violation | always fatal |
//! | [`CompositionError`] | fatal, never retried |

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cancelled;
mod clip;
mod composition;
mod config;
mod error;
mod input;
mod json;
mod narration;
mod service;
mod storage;
mod validation;

pub use cancelled::CancelledError;
pub use clip::{ClipError, ClipErrorKind};
pub use composition::{CompositionError, CompositionErrorKind};
pub use config::ConfigError;
pub use error::{ReelsmithError, ReelsmithErrorKind, ReelsmithResult};
pub use input::{InputError, InputErrorKind};
pub use json::JsonError;
pub use narration::NarrationError;
pub use service::{RetryableError, ServiceError, ServiceErrorKind};
pub use storage::{StorageError, StorageErrorKind};
pub use validation::{ValidationError, ValidationErrorKind};
