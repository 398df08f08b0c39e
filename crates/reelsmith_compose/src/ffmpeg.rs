//! ffmpeg / ffprobe backed encoder.

use crate::{MediaEncoder, ffmpeg_args};
use async_trait::async_trait;
use reelsmith_core::CompositionSpec;
use reelsmith_error::{CompositionError, CompositionErrorKind, ReelsmithResult};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Encoder that shells out to the local `ffmpeg` and `ffprobe` executables.
#[derive(Debug, Clone, derive_getters::Getters)]
pub struct FfmpegEncoder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl FfmpegEncoder {
    /// Encoder using the given executables.
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Run a program to completion and return its stdout.
    async fn run(&self, program: &Path, args: &[String]) -> ReelsmithResult<Vec<u8>> {
        tracing::debug!(program = %program.display(), args = args.len(), "Spawning encoder process");
        let output = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                CompositionError::new(CompositionErrorKind::EncoderUnavailable(format!(
                    "{}: {}",
                    program.display(),
                    e
                )))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CompositionError::new(CompositionErrorKind::EncoderFailed(format!(
                "{} exited with {}: {}",
                program.display(),
                output.status,
                stderr.trim()
            )))
            .into());
        }
        Ok(output.stdout)
    }
}

/// Parse ffprobe's bare `format=duration` output into milliseconds.
pub(crate) fn parse_probe_seconds(stdout: &str) -> Option<u64> {
    let secs: f64 = stdout.trim().parse().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some((secs * 1000.0).round() as u64)
}

#[async_trait]
impl MediaEncoder for FfmpegEncoder {
    async fn check_available(&self) -> ReelsmithResult<()> {
        let version = vec!["-version".to_string()];
        self.run(&self.ffmpeg, &version).await?;
        self.run(&self.ffprobe, &version).await?;
        tracing::debug!("Encoder available");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(path = %path.display()))]
    async fn probe_duration(&self, path: &Path) -> ReelsmithResult<u64> {
        let args = [
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ]
        .iter()
        .map(|s| s.to_string())
        .chain(std::iter::once(path.display().to_string()))
        .collect::<Vec<_>>();

        let stdout = self.run(&self.ffprobe, &args).await?;
        let text = String::from_utf8_lossy(&stdout);
        parse_probe_seconds(&text).ok_or_else(|| {
            CompositionError::new(CompositionErrorKind::EncoderFailed(format!(
                "unreadable duration '{}' for {}",
                text.trim(),
                path.display()
            )))
            .into()
        })
    }

    #[tracing::instrument(skip(self), fields(clip = %clip.display()))]
    async fn extract_last_frame(&self, clip: &Path, destination: &Path) -> ReelsmithResult<()> {
        // Seek to the final second and keep overwriting one image; the
        // survivor is the last decoded frame.
        let args = vec![
            "-y".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-sseof".to_string(),
            "-1".to_string(),
            "-i".to_string(),
            clip.display().to_string(),
            "-update".to_string(),
            "1".to_string(),
            "-q:v".to_string(),
            "1".to_string(),
            destination.display().to_string(),
        ];
        self.run(&self.ffmpeg, &args).await?;

        if !tokio::fs::try_exists(destination).await.unwrap_or(false) {
            return Err(CompositionError::new(CompositionErrorKind::EncoderFailed(format!(
                "no frame extracted from {}",
                clip.display()
            )))
            .into());
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, spec), fields(output = %spec.output().display()))]
    async fn encode(&self, spec: &CompositionSpec) -> ReelsmithResult<()> {
        let args = ffmpeg_args(spec);
        self.run(&self.ffmpeg, &args).await?;
        tracing::info!("Encoder finished");
        Ok(())
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}
