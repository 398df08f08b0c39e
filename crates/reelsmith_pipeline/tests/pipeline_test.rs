//! End-to-end pipeline tests with mock services.

mod test_utils;

use reelsmith_analysis::RepositoryLocation;
use reelsmith_error::{CompositionErrorKind, ReelsmithErrorKind, ServiceErrorKind};
use reelsmith_pipeline::{
    Pipeline, PipelineServices, ReelsmithConfig, RunFailure, RunMode, RunReport, RunState,
};
use reelsmith_storage::ArtifactStore;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use test_utils::{
    MockEncoder, MockLanguageModel, MockSpeech, MockVideo, brief_json, demo_repository,
    script_json, test_config,
};

/// Repository, store and output directory shared by consecutive runs.
struct Workspace {
    _repo: TempDir,
    _cache: TempDir,
    out: TempDir,
    location: RepositoryLocation,
    config: ReelsmithConfig,
}

impl Workspace {
    fn new() -> Self {
        let repo = TempDir::new().expect("repo dir");
        demo_repository(repo.path());
        let cache = TempDir::new().expect("cache dir");
        let config = test_config(cache.path());
        let location = RepositoryLocation::parse(repo.path().to_str().expect("utf-8 path"));
        Self {
            _repo: repo,
            _cache: cache,
            out: TempDir::new().expect("out dir"),
            location,
            config,
        }
    }

    fn output(&self, name: &str) -> PathBuf {
        self.out.path().join(name)
    }

    fn pipeline(&self, mocks: &Mocks) -> Pipeline {
        self.pipeline_with(mocks.services(), CancellationToken::new())
    }

    fn pipeline_with(&self, services: PipelineServices, cancel: CancellationToken) -> Pipeline {
        let store = ArtifactStore::open(self.config.cache_dir()).expect("open store");
        Pipeline::new(&self.config, services, store, cancel)
    }

    async fn run(&self, mocks: &Mocks, mode: RunMode, name: &str) -> Result<RunReport, RunFailure> {
        self.pipeline(mocks)
            .run(&self.location, mode, &self.output(name))
            .await
    }
}

/// One set of mock services with call counters.
struct Mocks {
    language: Arc<MockLanguageModel>,
    video: Arc<MockVideo>,
    speech: Arc<MockSpeech>,
    encoder: Arc<MockEncoder>,
}

impl Mocks {
    fn new() -> Self {
        Self::with(MockVideo::new(), MockSpeech::new(), MockEncoder::new())
    }

    fn with(video: MockVideo, speech: MockSpeech, encoder: MockEncoder) -> Self {
        Self {
            language: Arc::new(MockLanguageModel::new_success(
                brief_json("demo"),
                script_json("Demo in 30 seconds"),
            )),
            video: Arc::new(video),
            speech: Arc::new(speech),
            encoder: Arc::new(encoder),
        }
    }

    fn services(&self) -> PipelineServices {
        PipelineServices {
            language: self.language.clone(),
            video: Some(self.video.clone()),
            speech: Some(self.speech.clone()),
            encoder: self.encoder.clone(),
        }
    }

    fn external_calls(&self) -> usize {
        self.language.call_count() + self.video.submit_count() + self.speech.call_count()
    }
}

#[tokio::test]
async fn test_full_run_produces_video() {
    let workspace = Workspace::new();
    let mocks = Mocks::new();

    let report = workspace
        .run(&mocks, RunMode::Full, "explainer.mp4")
        .await
        .expect("run succeeds");

    assert_eq!(
        report.history(),
        &vec![
            RunState::Analyzing,
            RunState::ScriptWriting,
            RunState::ClipGeneration,
            RunState::Narration,
            RunState::Composing,
            RunState::Done,
        ]
    );
    assert_eq!(report.script().video_title, "Demo in 30 seconds");
    let video = report.video().as_ref().expect("full run has a video");
    assert_eq!(video.output(), &workspace.output("explainer.mp4"));
    assert!(video.output().exists());
    assert!(*video.size_bytes() > 0);
    assert_eq!(*video.duration_ms(), Some(30_000));
    assert_eq!(video.clips().len(), 5);
    assert_eq!(video.narrations().len(), 5);
    assert!(!*video.reused());

    assert_eq!(mocks.language.call_count(), 2);
    assert_eq!(mocks.video.submit_count(), 5);
    assert_eq!(mocks.speech.call_count(), 5);
    assert_eq!(mocks.encoder.encode_calls(), 1);
}

#[tokio::test]
async fn test_unchanged_rerun_makes_no_external_calls() {
    let workspace = Workspace::new();
    let first = Mocks::new();
    let first_report = workspace
        .run(&first, RunMode::Full, "first.mp4")
        .await
        .expect("first run");

    let second = Mocks::new();
    let report = workspace
        .run(&second, RunMode::Full, "second.mp4")
        .await
        .expect("second run");

    assert_eq!(second.external_calls(), 0);
    assert_eq!(second.encoder.encode_calls(), 0);
    assert_eq!(second.encoder.frame_extractions(), 0);
    assert!(*report.script_cached());
    let video = report.video().as_ref().expect("video");
    assert!(*video.reused());
    assert_eq!(
        std::fs::read(video.output()).expect("second output"),
        std::fs::read(workspace.output("first.mp4")).expect("first output")
    );
    assert_eq!(
        first_report.video().as_ref().map(|v| v.clips().clone()),
        Some(video.clips().clone())
    );
}

#[tokio::test]
async fn test_preview_makes_no_media_calls() {
    let workspace = Workspace::new();
    let mocks = Mocks::new();

    let report = workspace
        .run(&mocks, RunMode::Preview, "unused.mp4")
        .await
        .expect("preview succeeds");

    assert_eq!(report.history().last(), Some(&RunState::PreviewDone));
    assert!(report.video().is_none());
    assert_eq!(report.brief().name, "demo");
    assert_eq!(report.script().scenes.len(), 5);
    assert_eq!(mocks.video.submit_count(), 0);
    assert_eq!(mocks.speech.call_count(), 0);
    assert_eq!(mocks.encoder.encode_calls(), 0);
    assert!(!workspace.output("unused.mp4").exists());
}

#[tokio::test]
async fn test_preview_needs_only_language_model() {
    let workspace = Workspace::new();
    let mocks = Mocks::new();
    let services = PipelineServices {
        language: mocks.language.clone(),
        video: None,
        speech: None,
        encoder: mocks.encoder.clone(),
    };

    let report = workspace
        .pipeline_with(services, CancellationToken::new())
        .run(&workspace.location, RunMode::Preview, &workspace.output("x.mp4"))
        .await
        .expect("preview without media services");
    assert_eq!(report.script().video_title, "Demo in 30 seconds");
}

#[tokio::test]
async fn test_full_run_without_speech_fails_before_paid_calls() {
    let workspace = Workspace::new();
    let mocks = Mocks::new();
    let services = PipelineServices {
        speech: None,
        ..mocks.services()
    };

    let failure = workspace
        .pipeline_with(services, CancellationToken::new())
        .run(&workspace.location, RunMode::Full, &workspace.output("x.mp4"))
        .await
        .expect_err("speech is required");

    assert_eq!(failure.stage, RunState::Analyzing);
    match failure.error.kind() {
        ReelsmithErrorKind::Service(e) => {
            assert!(matches!(e.kind, ServiceErrorKind::MissingCredentials(_)))
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(mocks.external_calls(), 0);
    assert!(failure.cached_progress.is_empty());
}

#[tokio::test]
async fn test_missing_encoder_fails_before_paid_calls() {
    let workspace = Workspace::new();
    let mocks = Mocks::with(
        MockVideo::new(),
        MockSpeech::new(),
        MockEncoder::new().unavailable(),
    );

    let failure = workspace
        .run(&mocks, RunMode::Full, "x.mp4")
        .await
        .expect_err("encoder is required");

    assert_eq!(failure.stage, RunState::Analyzing);
    match failure.error.kind() {
        ReelsmithErrorKind::Composition(e) => {
            assert!(matches!(e.kind, CompositionErrorKind::EncoderUnavailable(_)))
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(mocks.external_calls(), 0);
}

#[tokio::test]
async fn test_clip_failure_reports_progress_and_resumes() {
    let workspace = Workspace::new();
    let failing = Mocks::with(
        MockVideo::new().fail_times("Shot 3:", 10),
        MockSpeech::new(),
        MockEncoder::new(),
    );

    let failure = workspace
        .run(&failing, RunMode::Full, "explainer.mp4")
        .await
        .expect_err("scene 2 fails");

    assert_eq!(failure.stage, RunState::ClipGeneration);
    assert_eq!(failure.scene_index, Some(2));
    assert_eq!(failure.history.last(), Some(&RunState::Failed));
    assert!(*failure.cached_progress.script());
    assert_eq!(failure.cached_progress.clips(), &vec![0, 1]);
    assert_eq!(failure.cached_progress.narrations(), &vec![0, 1, 2, 3, 4]);
    assert!(failure.to_string().contains("at scene 2"));
    assert!(!workspace.output("explainer.mp4").exists());

    let healthy = Mocks::new();
    workspace
        .run(&healthy, RunMode::Full, "explainer.mp4")
        .await
        .expect("resumed run succeeds");

    assert_eq!(healthy.language.call_count(), 0);
    assert_eq!(healthy.speech.call_count(), 0);
    assert_eq!(healthy.video.submits_for("Shot 1:"), 0);
    assert_eq!(healthy.video.submits_for("Shot 2:"), 0);
    assert_eq!(healthy.video.submit_count(), 3);
    assert!(workspace.output("explainer.mp4").exists());
}

#[tokio::test]
async fn test_narration_failure_reports_narration_stage() {
    let workspace = Workspace::new();
    let mocks = Mocks::with(
        MockVideo::new(),
        MockSpeech::new().fail_times("Part 4", 10),
        MockEncoder::new(),
    );

    let failure = workspace
        .run(&mocks, RunMode::Full, "explainer.mp4")
        .await
        .expect_err("scene 3 narration fails");

    assert_eq!(failure.stage, RunState::Narration);
    assert_eq!(failure.scene_index, Some(3));
    assert_eq!(failure.cached_progress.narrations(), &vec![0, 1, 2, 4]);
}

#[tokio::test]
async fn test_composition_duration_mismatch() {
    let workspace = Workspace::new();
    let mocks = Mocks::with(
        MockVideo::new(),
        MockSpeech::new(),
        MockEncoder::new().with_output_ms(20_000),
    );

    let failure = workspace
        .run(&mocks, RunMode::Full, "explainer.mp4")
        .await
        .expect_err("output too short");

    assert_eq!(failure.stage, RunState::Composing);
    match failure.error.kind() {
        ReelsmithErrorKind::Composition(e) => {
            assert!(matches!(e.kind, CompositionErrorKind::DurationMismatch { .. }))
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(failure.cached_progress.clips().len(), 5);
    assert!(!workspace.output("explainer.mp4").exists());
}

#[tokio::test]
async fn test_cancelled_run_stops_before_work() {
    let workspace = Workspace::new();
    let mocks = Mocks::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let failure = workspace
        .pipeline_with(mocks.services(), cancel)
        .run(&workspace.location, RunMode::Full, &workspace.output("x.mp4"))
        .await
        .expect_err("cancelled");

    assert!(matches!(failure.error.kind(), ReelsmithErrorKind::Cancelled(_)));
    assert_eq!(mocks.external_calls(), 0);
}

#[tokio::test]
async fn test_changed_script_regenerates_dependent_clips_only() {
    let workspace = Workspace::new();
    let first = Mocks::new();
    workspace
        .run(&first, RunMode::Full, "first.mp4")
        .await
        .expect("first run");

    // Editing the README changes the bundle, so the script is rewritten.
    // The language model returns the same scenes, so every clip and
    // narration is still reusable.
    std::fs::write(
        match &workspace.location {
            RepositoryLocation::Local(path) => path.join("README.md"),
            RepositoryLocation::Remote(_) => unreachable!("local fixture"),
        },
        "# demo\n\nNow with remote caching.\n",
    )
    .expect("edit readme");

    let second = Mocks::new();
    workspace
        .run(&second, RunMode::Full, "second.mp4")
        .await
        .expect("second run");

    assert_eq!(second.language.call_count(), 2);
    assert_eq!(second.video.submit_count(), 0);
    assert_eq!(second.speech.call_count(), 0);
}
