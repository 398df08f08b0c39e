//! CLI argument definitions.

use clap::Parser;
use reelsmith_pipeline::RunMode;
use std::path::PathBuf;

/// Reelsmith - turn a repository into a 30-second explainer video
#[derive(Parser, Debug)]
#[command(name = "reelsmith")]
#[command(about = "Turn a source repository into a 30-second explainer video", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Local path or git URL of the repository
    pub repo: String,

    /// Where to write the video (default: explainer_<timestamp>.mp4 in the output directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write and print the script without generating media
    #[arg(short, long)]
    pub preview: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Artifact store directory
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Background music track
    #[arg(long)]
    pub music: Option<PathBuf>,
}

impl Cli {
    /// Run mode selected by the flags.
    pub fn mode(&self) -> RunMode {
        if self.preview {
            RunMode::Preview
        } else {
            RunMode::Full
        }
    }

    /// Default log level for the verbosity flag.
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}
