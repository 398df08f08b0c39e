//! ffmpeg argument construction.
//!
//! Input order is fixed: clips first, then narration tracks, then the
//! music source. Every stream label in the filter graph refers back to
//! that order.

use reelsmith_core::{CompositionSpec, DURATION_TOLERANCE_MS};

const AUDIO_SAMPLE_RATE: u32 = 48_000;
const AUDIO_BITRATE: &str = "192k";
const VIDEO_LABEL: &str = "vout";
const AUDIO_LABEL: &str = "aout";

/// Milliseconds as an ffmpeg seconds literal.
///
/// ```
/// use reelsmith_compose::format_secs;
///
/// assert_eq!(format_secs(6_000), "6.000");
/// assert_eq!(format_secs(1_250), "1.250");
/// ```
pub fn format_secs(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

/// A `-filter_complex` graph and the labels of its two outputs.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct FilterGraph {
    chains: Vec<String>,
    video_label: String,
    audio_label: String,
}

impl FilterGraph {
    /// The graph as a single `-filter_complex` argument.
    pub fn render(&self) -> String {
        self.chains.join(";")
    }
}

/// Build the filter graph for a composition.
///
/// Each clip is normalised to the output format, padded by cloning its
/// last frame and cut to exactly one slot, so the concatenation has no
/// gaps and no overlap. Narration `i` is cut to its slot and delayed to
/// the slot start. Music is attenuated and mixed under the narration
/// without normalisation so narration stays at full level.
pub fn filter_graph(spec: &CompositionSpec) -> FilterGraph {
    let encoding = spec.encoding();
    let width = encoding.resolution().width();
    let height = encoding.resolution().height();
    let fps = encoding.frame_rate();
    let slot = format_secs(*spec.scene_duration_ms());
    let total = format_secs(spec.total_duration_ms());
    let pad = format_secs(DURATION_TOLERANCE_MS * 2);
    let clip_count = spec.clips().len();
    let narration_count = spec.narrations().len();

    let mut chains = Vec::with_capacity(clip_count + narration_count + 3);

    for index in 0..clip_count {
        chains.push(format!(
            "[{index}:v]fps={fps},scale={width}:{height}:force_original_aspect_ratio=decrease,\
             pad={width}:{height}:(ow-iw)/2:(oh-ih)/2,setsar=1,\
             tpad=stop_mode=clone:stop_duration={pad},\
             trim=duration={slot},setpts=PTS-STARTPTS[v{index}]"
        ));
    }

    let video_inputs: String = (0..clip_count).map(|i| format!("[v{i}]")).collect();
    chains.push(format!(
        "{video_inputs}concat=n={clip_count}:v=1:a=0[{VIDEO_LABEL}]"
    ));

    for (index, slot_info) in spec.timeline().iter().enumerate().take(narration_count) {
        let input = clip_count + index;
        chains.push(format!(
            "[{input}:a]aresample={AUDIO_SAMPLE_RATE},aformat=channel_layouts=stereo,\
             atrim=duration={slot},asetpts=PTS-STARTPTS,\
             adelay={delay}:all=1[a{index}]",
            delay = slot_info.start_ms,
        ));
    }

    let music_input = clip_count + narration_count;
    chains.push(format!(
        "[{music_input}:a]aresample={AUDIO_SAMPLE_RATE},aformat=channel_layouts=stereo,\
         atrim=duration={total},asetpts=PTS-STARTPTS,volume={level:.2}[bgm]",
        level = spec.music().level,
    ));

    let audio_inputs: String = (0..narration_count).map(|i| format!("[a{i}]")).collect();
    chains.push(format!(
        "{audio_inputs}[bgm]amix=inputs={inputs}:duration=longest:dropout_transition=0:normalize=0,\
         atrim=duration={total}[{AUDIO_LABEL}]",
        inputs = narration_count + 1,
    ));

    FilterGraph {
        chains,
        video_label: VIDEO_LABEL.to_string(),
        audio_label: AUDIO_LABEL.to_string(),
    }
}

/// Full ffmpeg argument list for a composition.
pub fn ffmpeg_args(spec: &CompositionSpec) -> Vec<String> {
    let encoding = spec.encoding();
    let total = format_secs(spec.total_duration_ms());
    let mut args: Vec<String> = ["-y", "-hide_banner", "-loglevel", "error"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    for path in spec.clips().iter().chain(spec.narrations().iter()) {
        args.push("-i".to_string());
        args.push(path.display().to_string());
    }

    match &spec.music().path {
        Some(path) => {
            args.extend(["-stream_loop", "-1", "-i"].map(String::from));
            args.push(path.display().to_string());
        }
        None => {
            args.extend(["-f", "lavfi", "-t"].map(String::from));
            args.push(total.clone());
            args.push("-i".to_string());
            args.push(format!("anullsrc=r={AUDIO_SAMPLE_RATE}:cl=stereo"));
        }
    }

    let graph = filter_graph(spec);
    args.push("-filter_complex".to_string());
    args.push(graph.render());
    args.push("-map".to_string());
    args.push(format!("[{}]", graph.video_label()));
    args.push("-map".to_string());
    args.push(format!("[{}]", graph.audio_label()));

    args.push("-c:v".to_string());
    args.push(encoding.video_codec().clone());
    args.push("-preset".to_string());
    args.push(encoding.preset().clone());
    args.extend(["-pix_fmt", "yuv420p", "-r"].map(String::from));
    args.push(encoding.frame_rate().to_string());
    args.push("-c:a".to_string());
    args.push(encoding.audio_codec().clone());
    args.push("-b:a".to_string());
    args.push(AUDIO_BITRATE.to_string());
    args.push("-t".to_string());
    args.push(total);
    args.extend(["-movflags", "+faststart"].map(String::from));
    args.push(spec.output().display().to_string());
    args
}
