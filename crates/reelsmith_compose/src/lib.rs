//! Final assembly of an explainer video.
//!
//! The [`Compositor`] validates the per-scene clips and narration tracks,
//! lays them on a gapless timeline and hands the result to a
//! [`MediaEncoder`]. [`FfmpegEncoder`] is the production encoder; it also
//! provides duration probing and last-frame extraction for the clip chain.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod args;
mod compositor;
mod encoder;
mod ffmpeg;

pub use args::{FilterGraph, ffmpeg_args, filter_graph, format_secs};
pub use compositor::{CompositionReport, Compositor};
pub use encoder::MediaEncoder;
pub use ffmpeg::FfmpegEncoder;
