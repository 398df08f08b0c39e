//! Command-line interface module.
//!
//! This module provides the argument parser and run handler for the
//! reelsmith binary.

mod commands;
mod report;
mod run;

pub use commands::Cli;
pub use report::{COST_ESTIMATE, default_output_path, format_failure, format_preview, format_size};
pub use run::run;
