//! Text shown to the user at the end of a run.

use chrono::{DateTime, TimeZone};
use reelsmith_core::Script;
use reelsmith_pipeline::RunFailure;
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Rough per-run cost of a full generation.
pub const COST_ESTIMATE: &str =
    "Estimated cost: video ≈ $6.00 per run, language model ≈ $0.05, speech on free tier";

/// `explainer_<YYYYmmdd_HHMMSS>.mp4` inside `dir`.
pub fn default_output_path<Tz>(dir: &Path, now: &DateTime<Tz>) -> PathBuf
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    dir.join(format!("explainer_{}.mp4", now.format("%Y%m%d_%H%M%S")))
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Script listing printed by preview runs.
pub fn format_preview(script: &Script) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", script.video_title);
    let _ = writeln!(out, "Style: {}", script.overall_style);
    for scene in &script.scenes {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Scene {} [{}] {} ({}s)",
            scene.index + 1,
            scene.role,
            scene.title,
            scene.duration_secs
        );
        let _ = writeln!(out, "  Visual:    {}", scene.visual_prompt);
        let _ = writeln!(out, "  Narration: {}", scene.narration);
        if !scene.audio_cues.is_empty() {
            let _ = writeln!(out, "  Audio:     {}", scene.audio_cues.join(", "));
        }
    }
    let _ = writeln!(out);
    let _ = write!(out, "{}", COST_ESTIMATE);
    out
}

/// Failure summary: stage, scene and what a retry can reuse.
pub fn format_failure(failure: &RunFailure) -> String {
    let mut out = format!("Run failed during {}", failure.stage);
    if let Some(index) = failure.scene_index {
        let _ = write!(out, " (scene {})", index);
    }
    let _ = write!(out, ": {}", failure.error);
    if failure.cached_progress.is_empty() {
        out.push_str("\nNo partial progress was cached.");
    } else {
        let _ = write!(
            out,
            "\nPartial progress is cached ({}); re-running reuses it.",
            failure.cached_progress
        );
    }
    out
}
