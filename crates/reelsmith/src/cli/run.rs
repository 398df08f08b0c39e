//! Run command handler.

use super::commands::Cli;
use super::report::{default_output_path, format_failure, format_preview, format_size};
use chrono::Local;
use reelsmith_analysis::RepositoryLocation;
use reelsmith_pipeline::{Credentials, Pipeline, PipelineServices, ReelsmithConfig, RunReport};
use reelsmith_storage::ArtifactStore;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Configuration with the command-line overrides applied.
pub(crate) fn effective_config(cli: &Cli, mut config: ReelsmithConfig) -> ReelsmithConfig {
    if let Some(cache_dir) = &cli.cache_dir {
        config = config.with_cache_dir(cache_dir.clone());
    }
    if let Some(music) = &cli.music {
        let composition = config.composition().clone().with_music_path(Some(music.clone()));
        config = config.with_composition(composition);
    }
    config
}

/// Cancel `token` when the process receives Ctrl-C.
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling run");
            token.cancel();
        }
    });
}

/// Execute one run from parsed arguments.
///
/// Setup problems (configuration, unreadable cache directory, missing
/// Gemini key) are returned as errors. A pipeline failure is reported on
/// stderr and turned into a failing exit code.
pub async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = effective_config(&cli, ReelsmithConfig::load()?);
    let credentials = Credentials::from_env();
    let services = PipelineServices::from_config(&config, &credentials)?;
    let store = ArtifactStore::open(config.cache_dir())?;

    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());
    let pipeline = Pipeline::new(&config, services, store, cancel);

    let location = RepositoryLocation::parse(&cli.repo);
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(config.output_dir(), &Local::now()));
    info!(repo = %cli.repo, mode = %cli.mode(), output = %output.display(), "Starting run");

    match pipeline.run(&location, cli.mode(), &output).await {
        Ok(report) => {
            print_report(&report);
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            error!(stage = %failure.stage, scene = ?failure.scene_index, "Run failed");
            eprintln!("{}", format_failure(&failure));
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_report(report: &RunReport) {
    match report.video() {
        None => println!("{}", format_preview(report.script())),
        Some(video) => {
            println!(
                "Video written to {} ({})",
                video.output().display(),
                format_size(*video.size_bytes())
            );
            if *video.reused() {
                println!("Nothing changed since the last run; reused the cached encode.");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_overrides_apply_to_config() {
        let cli = Cli::parse_from([
            "reelsmith",
            "repo",
            "--cache-dir",
            "/tmp/cache",
            "--music",
            "track.mp3",
        ]);
        let config = effective_config(&cli, ReelsmithConfig::default());

        assert_eq!(config.cache_dir(), &PathBuf::from("/tmp/cache"));
        assert_eq!(
            config.composition().music_path(),
            &Some(PathBuf::from("track.mp3"))
        );
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let cli = Cli::parse_from(["reelsmith", "repo"]);
        let config = effective_config(&cli, ReelsmithConfig::default());
        assert_eq!(config, ReelsmithConfig::default());
    }
}
