//! Reelsmith CLI binary.
//!
//! Turns a local path or git URL into a 30-second explainer video, or with
//! `--preview` prints the script without generating any media.

use clap::Parser;
use reelsmith::cli::{Cli, run};
use reelsmith::{LoggingConfig, init_logging};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize tracing
    let logging = LoggingConfig::new("reelsmith")
        .with_log_level(cli.log_level())
        .with_json_logs(cli.json_logs);
    if let Err(e) = init_logging(&logging) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
