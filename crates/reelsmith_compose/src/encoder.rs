//! Local media encoder contract.

use async_trait::async_trait;
use reelsmith_core::CompositionSpec;
use reelsmith_error::ReelsmithResult;
use std::path::Path;

/// A local process that measures, samples and encodes media files.
///
/// Implementations never touch the network. Failures are reported as
/// composition errors, which the pipeline treats as terminal.
#[async_trait]
pub trait MediaEncoder: Send + Sync {
    /// Confirm the encoder can run at all.
    async fn check_available(&self) -> ReelsmithResult<()> {
        Ok(())
    }

    /// Duration of a media file in milliseconds.
    async fn probe_duration(&self, path: &Path) -> ReelsmithResult<u64>;

    /// Write the final frame of `clip` as a PNG image to `destination`.
    async fn extract_last_frame(&self, clip: &Path, destination: &Path) -> ReelsmithResult<()>;

    /// Encode the composition described by `spec` into `spec.output()`.
    async fn encode(&self, spec: &CompositionSpec) -> ReelsmithResult<()>;

    /// Name used in logs.
    fn name(&self) -> &str;
}
