//! Pipeline controller.
//!
//! Drives a run through
//! `Analyzing → ScriptWriting → {ClipGeneration ∥ Narration} → Composing → Done`,
//! stopping at `PreviewDone` after script writing in preview mode. A failure
//! ends the run in `Failed` with a [`RunFailure`]; whatever was cached up to
//! that point stays valid for the next run.

use crate::clips::ClipChain;
use crate::config::{Credentials, ReelsmithConfig};
use crate::graph::{TaskGraph, TaskId};
use crate::narration::NarrationSynthesizer;
use crate::script::ScriptSynthesizer;
use reelsmith_analysis::{RepositoryAnalyzer, RepositoryLocation};
use reelsmith_compose::{Compositor, FfmpegEncoder, MediaEncoder};
use reelsmith_core::{
    AnalysisBundle, ClipArtifact, CompositionSpec, EncodingParams, Fingerprinter, MusicTrack,
    NarrationArtifact, ProjectBrief, Script, Stage, sha256_hex, verify_continuity,
};
use reelsmith_error::{
    CancelledError, ClipError, JsonError, ReelsmithError, ReelsmithErrorKind, ReelsmithResult,
    ServiceError, ServiceErrorKind, StorageError, StorageErrorKind,
};
use reelsmith_models::{
    ElevenLabsClient, GeminiLanguageModel, LanguageModel, SpeechSynthesizer, VeoClient,
    VideoSynthesizer, resolve_voice_id,
};
use reelsmith_rate_limit::RateLimiter;
use reelsmith_storage::{ArtifactPayload, ArtifactStore, Blob};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

const VIDEO_BLOB: &str = "final.mp4";
const BUNDLE_BLOB: &str = "bundle.json";

/// Whether a run stops after the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum RunMode {
    /// Stop after script writing; no media is generated
    Preview,
    /// Produce the final video
    Full,
}

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum RunState {
    /// Sampling the repository
    Analyzing,
    /// Brief and script
    ScriptWriting,
    /// Clip chain (runs alongside narration)
    ClipGeneration,
    /// Narration (runs alongside the clip chain)
    Narration,
    /// Final encode
    Composing,
    /// Full run finished
    Done,
    /// Preview run finished
    PreviewDone,
    /// Run ended with an error
    Failed,
}

/// Stages and scenes already present in the artifact store.
#[derive(Debug, Clone, Default, PartialEq, Eq, derive_getters::Getters)]
pub struct CachedProgress {
    script: bool,
    clips: Vec<usize>,
    narrations: Vec<usize>,
}

impl CachedProgress {
    /// Whether nothing reusable was cached.
    pub fn is_empty(&self) -> bool {
        !self.script && self.clips.is_empty() && self.narrations.is_empty()
    }
}

impl std::fmt::Display for CachedProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return f.write_str("nothing cached");
        }
        let mut parts = Vec::new();
        if self.script {
            parts.push("script".to_string());
        }
        if !self.clips.is_empty() {
            parts.push(format!("clips for scenes {:?}", self.clips));
        }
        if !self.narrations.is_empty() {
            parts.push(format!("narration for scenes {:?}", self.narrations));
        }
        write!(f, "cached: {}", parts.join(", "))
    }
}

/// Terminal failure of a run.
#[derive(Debug)]
pub struct RunFailure {
    /// Stage that failed
    pub stage: RunState,
    /// Scene the failure is attributed to
    pub scene_index: Option<usize>,
    /// Originating error
    pub error: ReelsmithError,
    /// What a retry can reuse
    pub cached_progress: CachedProgress,
    /// States visited, ending in `Failed`
    pub history: Vec<RunState>,
}

impl std::fmt::Display for RunFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed", self.stage)?;
        if let Some(index) = self.scene_index {
            write!(f, " at scene {}", index)?;
        }
        write!(f, ": {}", self.error)
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// The final video of a full run.
#[derive(Debug, Clone, derive_getters::Getters)]
pub struct VideoReport {
    output: PathBuf,
    size_bytes: u64,
    duration_ms: Option<u64>,
    clips: Vec<ClipArtifact>,
    narrations: Vec<NarrationArtifact>,
    /// Whether the encode was served from the artifact store
    reused: bool,
}

/// Successful run.
#[derive(Debug, Clone, derive_getters::Getters)]
pub struct RunReport {
    mode: RunMode,
    bundle: AnalysisBundle,
    brief: ProjectBrief,
    script: Script,
    script_cached: bool,
    video: Option<VideoReport>,
    history: Vec<RunState>,
}

/// External collaborators of a pipeline.
///
/// Video and speech are optional so preview runs can be built with only a
/// language-model key; a full run without them fails before any paid call.
#[derive(Clone)]
pub struct PipelineServices {
    /// Script writing
    pub language: Arc<dyn LanguageModel>,
    /// Clip generation
    pub video: Option<Arc<dyn VideoSynthesizer>>,
    /// Narration
    pub speech: Option<Arc<dyn SpeechSynthesizer>>,
    /// Local encoder
    pub encoder: Arc<dyn MediaEncoder>,
}

impl PipelineServices {
    /// Production clients for the configured services.
    ///
    /// # Errors
    ///
    /// Returns `MissingCredentials` without a Gemini key. A missing
    /// ElevenLabs key only disables narration.
    pub fn from_config(config: &ReelsmithConfig, credentials: &Credentials) -> ReelsmithResult<Self> {
        let gemini_key = credentials.gemini()?;
        let language = GeminiLanguageModel::new(
            gemini_key,
            config.language().model(),
            RateLimiter::new("language", &config.rate_limit("language")),
        )?;
        let video = VeoClient::new(
            gemini_key,
            config.video().model(),
            RateLimiter::new("video", &config.rate_limit("video")),
        )?;
        let speech = match credentials.elevenlabs() {
            Ok(key) => Some(Arc::new(ElevenLabsClient::new(
                key,
                config.speech().model(),
                RateLimiter::new("speech", &config.rate_limit("speech")),
            )?) as Arc<dyn SpeechSynthesizer>),
            Err(_) => None,
        };
        Ok(Self {
            language: Arc::new(language),
            video: Some(Arc::new(video)),
            speech,
            encoder: Arc::new(FfmpegEncoder::default()),
        })
    }
}

#[derive(Debug, Clone)]
enum SceneArtifact {
    Clip(ClipArtifact),
    Narration(NarrationArtifact),
}

/// Per-run bookkeeping used to build a [`RunFailure`].
#[derive(Debug, Default)]
struct RunContext {
    history: Vec<RunState>,
    bundle: Option<AnalysisBundle>,
    script: Option<Script>,
}

impl RunContext {
    fn enter(&mut self, state: RunState) {
        info!(state = %state, "Entering state");
        self.history.push(state);
    }

    fn current(&self) -> RunState {
        self.history.last().copied().unwrap_or(RunState::Analyzing)
    }
}

/// Explainer-video pipeline.
#[derive(Clone)]
pub struct Pipeline {
    analyzer: RepositoryAnalyzer,
    store: ArtifactStore,
    scripts: ScriptSynthesizer,
    clips: Option<ClipChain>,
    narration: Option<NarrationSynthesizer>,
    compositor: Compositor,
    encoder: Arc<dyn MediaEncoder>,
    music: MusicTrack,
    encoding: EncodingParams,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("store", &self.store)
            .field("scripts", &self.scripts)
            .field("clips", &self.clips)
            .field("narration", &self.narration)
            .field("music", &self.music)
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Assemble a pipeline from configuration, services and a store.
    pub fn new(
        config: &ReelsmithConfig,
        services: PipelineServices,
        store: ArtifactStore,
        cancel: CancellationToken,
    ) -> Self {
        let scripts = ScriptSynthesizer::new(services.language, store.clone())
            .with_retry(config.language().retry_policy())
            .with_max_validation_retries(*config.language().max_validation_retries())
            .with_sampling(
                *config.language().temperature(),
                *config.language().max_output_tokens(),
            );

        let clips = services.video.map(|video| {
            ClipChain::new(video, services.encoder.clone(), store.clone())
                .with_poll(config.video().poll_config())
                .with_retry(config.video().retry_policy())
                .with_resolution(*config.video().resolution())
                .with_cancel(cancel.clone())
        });

        let voice_id = resolve_voice_id(config.speech().voice_id()).to_string();
        let narration = services.speech.map(|speech| {
            NarrationSynthesizer::new(speech, store.clone(), voice_id)
                .with_retry(config.speech().retry_policy())
        });

        Self {
            analyzer: RepositoryAnalyzer::new(*config.analysis()),
            store,
            scripts,
            clips,
            narration,
            compositor: Compositor::new(services.encoder.clone()),
            encoder: services.encoder,
            music: config.composition().music_track(),
            encoding: config.encoding(),
            cancel,
        }
    }

    /// The artifact store.
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Token that aborts the run.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run the pipeline for a repository.
    ///
    /// In preview mode `output` is ignored and no video or speech call is
    /// made. In full mode the final video is copied to `output`.
    #[instrument(skip(self, location, output))]
    pub async fn run(
        &self,
        location: &RepositoryLocation,
        mode: RunMode,
        output: &Path,
    ) -> Result<RunReport, RunFailure> {
        let mut ctx = RunContext::default();
        match self.execute(&mut ctx, location, mode, output).await {
            Ok(report) => Ok(report),
            Err(error) => Err(self.fail(ctx, error).await),
        }
    }

    async fn execute(
        &self,
        ctx: &mut RunContext,
        location: &RepositoryLocation,
        mode: RunMode,
        output: &Path,
    ) -> ReelsmithResult<RunReport> {
        ctx.enter(RunState::Analyzing);
        let media = match mode {
            RunMode::Full => Some(self.media_stages().await?),
            RunMode::Preview => None,
        };
        self.check_cancelled("analysis")?;

        let checkout = location.checkout().await?;
        let bundle = self.analyzer.analyze(&checkout).await?;
        drop(checkout);
        self.persist_bundle(&bundle).await?;
        ctx.bundle = Some(bundle.clone());

        ctx.enter(RunState::ScriptWriting);
        self.check_cancelled("script writing")?;
        let outcome = self.scripts.synthesize(&bundle).await?;
        ctx.script = Some(outcome.script().clone());

        let Some((clip_chain, narration)) = media else {
            ctx.enter(RunState::PreviewDone);
            return Ok(RunReport {
                mode,
                bundle,
                brief: outcome.brief().clone(),
                script: outcome.script().clone(),
                script_cached: *outcome.cached(),
                video: None,
                history: std::mem::take(&mut ctx.history),
            });
        };

        ctx.enter(RunState::ClipGeneration);
        ctx.enter(RunState::Narration);
        self.check_cancelled("media generation")?;
        let (clips, narrations) =
            generate_media(clip_chain, narration, outcome.script(), &self.cancel).await?;

        ctx.enter(RunState::Composing);
        self.check_cancelled("composition")?;
        let video = self.compose(clips, narrations, output).await?;

        ctx.enter(RunState::Done);
        Ok(RunReport {
            mode,
            bundle,
            brief: outcome.brief().clone(),
            script: outcome.script().clone(),
            script_cached: *outcome.cached(),
            video: Some(video),
            history: std::mem::take(&mut ctx.history),
        })
    }

    /// Services a full run needs, checked before any paid call.
    async fn media_stages(&self) -> ReelsmithResult<(&ClipChain, &NarrationSynthesizer)> {
        let clips = self.clips.as_ref().ok_or_else(|| {
            ReelsmithError::from(ServiceError::new(
                "video",
                ServiceErrorKind::MissingCredentials("GEMINI_API_KEY".to_string()),
            ))
        })?;
        let narration = self.narration.as_ref().ok_or_else(|| {
            ReelsmithError::from(ServiceError::new(
                "speech",
                ServiceErrorKind::MissingCredentials("ELEVENLABS_API_KEY".to_string()),
            ))
        })?;
        self.encoder.check_available().await?;
        Ok((clips, narration))
    }

    fn check_cancelled(&self, stage: &str) -> ReelsmithResult<()> {
        if self.cancel.is_cancelled() {
            return Err(CancelledError::new(stage).into());
        }
        Ok(())
    }

    async fn persist_bundle(&self, bundle: &AnalysisBundle) -> ReelsmithResult<()> {
        let blob = Blob::json(BUNDLE_BLOB, bundle).map_err(|e| JsonError::new(e.to_string()))?;
        self.store
            .put(Stage::Analysis, bundle.fingerprint(), ArtifactPayload::new(vec![blob]))
            .await?;
        Ok(())
    }

    /// Encode the final video, reusing a cached encode of identical inputs.
    #[instrument(skip_all)]
    async fn compose(
        &self,
        clips: Vec<ClipArtifact>,
        narrations: Vec<NarrationArtifact>,
        output: &Path,
    ) -> ReelsmithResult<VideoReport> {
        let music_fingerprint = music_fingerprint(&self.music).await;
        let mut fingerprint = Fingerprinter::new("composition")
            .field("music", &music_fingerprint)
            .field("music_level", format!("{:.3}", self.music.level))
            .field("resolution", self.encoding.resolution().as_str())
            .field("frame_rate", self.encoding.frame_rate().to_string())
            .field("video_codec", self.encoding.video_codec())
            .field("audio_codec", self.encoding.audio_codec());
        for clip in &clips {
            fingerprint = fingerprint.field("clip", clip.cache_key().as_str());
        }
        for narration in &narrations {
            fingerprint = fingerprint.field("narration", narration.cache_key().as_str());
        }
        let key = fingerprint.finish();

        let fetched = self
            .store
            .compute_or_fetch(Stage::Composition, &key, || async {
                let scratch = tempfile::TempDir::with_prefix("reelsmith-compose-").map_err(|e| {
                    StorageError::new(StorageErrorKind::DirectoryCreation(e.to_string()))
                })?;
                let spec = CompositionSpec::new(
                    clips.iter().map(|c| c.clip_path().clone()).collect(),
                    narrations.iter().map(|n| n.audio_path().clone()).collect(),
                    self.music.clone(),
                    self.encoding.clone(),
                    scratch.path().join(VIDEO_BLOB),
                );
                let report = self.compositor.compose(&spec).await?;
                let bytes = tokio::fs::read(report.output()).await.map_err(|e| {
                    StorageError::new(StorageErrorKind::FileRead(format!(
                        "{}: {}",
                        report.output().display(),
                        e
                    )))
                })?;
                Ok(ArtifactPayload::new(vec![Blob::new(VIDEO_BLOB, bytes)]).with_metadata(
                    serde_json::json!({
                        "duration_ms": report.duration_ms(),
                        "music_used": report.music_used(),
                    }),
                ))
            })
            .await?;

        // Verify before handing the file out.
        self.store.verify(&fetched.entry).await?;
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }
        let size_bytes = tokio::fs::copy(fetched.entry.blob_path(VIDEO_BLOB), output)
            .await
            .map_err(|e| {
                StorageError::new(StorageErrorKind::FileWrite(format!(
                    "{}: {}",
                    output.display(),
                    e
                )))
            })?;

        let duration_ms = fetched.entry.metadata()["duration_ms"].as_u64();
        info!(
            output = %output.display(),
            size_bytes,
            provenance = %fetched.provenance,
            "Final video written"
        );
        Ok(VideoReport {
            output: output.to_path_buf(),
            size_bytes,
            duration_ms,
            clips,
            narrations,
            reused: fetched.is_hit(),
        })
    }

    async fn fail(&self, ctx: RunContext, error: ReelsmithError) -> RunFailure {
        let stage = match (ctx.current(), error.kind()) {
            (RunState::ClipGeneration | RunState::Narration, ReelsmithErrorKind::Narration(_)) => {
                RunState::Narration
            }
            (RunState::ClipGeneration | RunState::Narration, _) => RunState::ClipGeneration,
            (state, _) => state,
        };
        let cached_progress = self.probe_progress(ctx.bundle.as_ref(), ctx.script.as_ref()).await;
        let mut history = ctx.history;
        history.push(RunState::Failed);

        error!(
            stage = %stage,
            scene_index = ?error.scene_index(),
            cached = %cached_progress,
            error = %error,
            "Run failed"
        );
        RunFailure {
            stage,
            scene_index: error.scene_index(),
            error,
            cached_progress,
            history,
        }
    }

    /// What the store already holds for this bundle. Best effort.
    async fn probe_progress(
        &self,
        bundle: Option<&AnalysisBundle>,
        script: Option<&Script>,
    ) -> CachedProgress {
        let mut progress = CachedProgress::default();
        let Some(bundle) = bundle else {
            return progress;
        };
        let cached_script = match script {
            Some(script) => Some(script.clone()),
            None => self.scripts.cached_script(bundle).await.ok().flatten(),
        };
        progress.script = self
            .store
            .contains(Stage::Script, &self.scripts.script_key(bundle))
            .await
            .unwrap_or(false);
        let Some(script) = cached_script else {
            return progress;
        };

        if let Some(chain) = &self.clips {
            let mut seed: Option<String> = None;
            for scene in &script.scenes {
                match chain.cached(scene, seed.as_deref()).await {
                    Ok(Some(clip)) => {
                        progress.clips.push(scene.index);
                        seed = Some(clip.last_frame_hash().clone());
                    }
                    _ => break,
                }
            }
        }
        if let Some(narration) = &self.narration {
            for scene in &script.scenes {
                if narration.is_cached(scene).await.unwrap_or(false) {
                    progress.narrations.push(scene.index);
                }
            }
        }
        progress
    }
}

/// Run the clip chain and narration as one dependency graph.
///
/// Clip `i` needs clip `i - 1`; narration tasks need nothing, so they run
/// alongside the whole chain.
async fn generate_media(
    clip_chain: &ClipChain,
    narration: &NarrationSynthesizer,
    script: &Script,
    cancel: &CancellationToken,
) -> ReelsmithResult<(Vec<ClipArtifact>, Vec<NarrationArtifact>)> {
    let mut graph: TaskGraph<SceneArtifact> = TaskGraph::new();
    let mut clip_ids: Vec<TaskId> = Vec::with_capacity(script.scenes.len());
    let mut narration_ids: Vec<TaskId> = Vec::with_capacity(script.scenes.len());

    for scene in &script.scenes {
        let needs: Vec<TaskId> = clip_ids.last().copied().into_iter().collect();
        let chain = clip_chain.clone();
        let scene = scene.clone();
        let id = graph.add(format!("clip-{}", scene.index), &needs, move |inputs| async move {
            let prior = match inputs.first() {
                Some(SceneArtifact::Clip(clip)) => Some(clip.clone()),
                _ => None,
            };
            chain
                .generate(&scene, prior.as_ref())
                .await
                .map(SceneArtifact::Clip)
        })?;
        clip_ids.push(id);
    }

    for scene in &script.scenes {
        let synthesizer = narration.clone();
        let scene = scene.clone();
        let id = graph.add(format!("narration-{}", scene.index), &[], move |_| async move {
            synthesizer.narrate(&scene).await.map(SceneArtifact::Narration)
        })?;
        narration_ids.push(id);
    }

    let outputs = graph.run(cancel).await?;

    let clips: Vec<ClipArtifact> = clip_ids
        .iter()
        .filter_map(|id| match outputs.get(*id) {
            Some(SceneArtifact::Clip(clip)) => Some(clip.clone()),
            _ => None,
        })
        .collect();
    let narrations: Vec<NarrationArtifact> = narration_ids
        .iter()
        .filter_map(|id| match outputs.get(*id) {
            Some(SceneArtifact::Narration(n)) => Some(n.clone()),
            _ => None,
        })
        .collect();

    verify_continuity(&clips).map_err(ClipError::new)?;
    Ok((clips, narrations))
}

async fn music_fingerprint(music: &MusicTrack) -> String {
    match &music.path {
        Some(path) => match tokio::fs::read(path).await {
            Ok(bytes) => sha256_hex(&bytes),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Background music unreadable");
                "silence".to_string()
            }
        },
        None => "silence".to_string(),
    }
}
