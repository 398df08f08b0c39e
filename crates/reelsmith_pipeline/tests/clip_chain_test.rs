//! Tests for frame-seeded clip generation and resumption.

mod test_utils;

use reelsmith_core::{ClipArtifact, Script, Stage, verify_continuity};
use reelsmith_error::{ClipErrorKind, ReelsmithErrorKind, ReelsmithResult};
use reelsmith_pipeline::ClipChain;
use reelsmith_rate_limit::RetryPolicy;
use reelsmith_storage::ArtifactStore;
use std::sync::Arc;
use tempfile::TempDir;
use test_utils::{MockEncoder, MockVideo, valid_script};

struct Harness {
    _dir: TempDir,
    store: ArtifactStore,
    encoder: Arc<MockEncoder>,
    script: Script,
}

impl Harness {
    fn new() -> Self {
        Self::with_encoder(MockEncoder::new())
    }

    fn with_encoder(encoder: MockEncoder) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let store = ArtifactStore::open(dir.path()).expect("open store");
        Self {
            _dir: dir,
            store,
            encoder: Arc::new(encoder),
            script: valid_script("Chain"),
        }
    }

    fn chain(&self, video: Arc<MockVideo>) -> ClipChain {
        ClipChain::new(video, self.encoder.clone(), self.store.clone())
            .with_retry(RetryPolicy::immediate(2))
    }
}

async fn generate_all(chain: &ClipChain, script: &Script) -> ReelsmithResult<Vec<ClipArtifact>> {
    let mut clips: Vec<ClipArtifact> = Vec::new();
    for scene in &script.scenes {
        let clip = chain.generate(scene, clips.last()).await?;
        clips.push(clip);
    }
    Ok(clips)
}

fn clip_kind(err: &reelsmith_error::ReelsmithError) -> ClipErrorKind {
    match err.kind() {
        ReelsmithErrorKind::Clip(e) => e.kind.clone(),
        other => panic!("expected clip error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_each_clip_is_seeded_by_prior_frame() {
    let harness = Harness::new();
    let video = Arc::new(MockVideo::new());

    let clips = generate_all(&harness.chain(video.clone()), &harness.script)
        .await
        .expect("chain succeeds");

    assert_eq!(clips.len(), 5);
    assert_eq!(video.seeds_for("Shot 1:"), vec![None]);
    for i in 1..5 {
        let prior_frame = std::fs::read(clips[i - 1].last_frame_path()).expect("read frame");
        assert_eq!(
            video.seeds_for(&format!("Shot {}:", i + 1)),
            vec![Some(prior_frame)],
            "scene {} seeded by scene {}",
            i,
            i - 1
        );
        assert_eq!(
            clips[i].seed_frame_hash().as_deref(),
            Some(clips[i - 1].last_frame_hash().as_str())
        );
    }
    assert!(verify_continuity(&clips).is_ok());
    assert!(clips.iter().all(|c| c.duration_ms() == &Some(6_000)));
}

#[tokio::test]
async fn test_failed_scene_resumes_from_cache() {
    let harness = Harness::new();
    let failing = Arc::new(MockVideo::new().fail_times("Shot 3:", 10));

    let err = generate_all(&harness.chain(failing.clone()), &harness.script)
        .await
        .expect_err("scene 2 never succeeds");
    assert!(matches!(
        clip_kind(&err),
        ClipErrorKind::ClipGenerationFailed { scene_index: 2, .. }
    ));
    assert_eq!(err.scene_index(), Some(2));
    assert_eq!(failing.submits_for("Shot 3:"), 3, "one attempt plus two retries");

    let healthy = Arc::new(MockVideo::new());
    let clips = generate_all(&harness.chain(healthy.clone()), &harness.script)
        .await
        .expect("resumed chain succeeds");

    assert_eq!(clips.len(), 5);
    assert_eq!(healthy.submits_for("Shot 1:"), 0);
    assert_eq!(healthy.submits_for("Shot 2:"), 0);
    assert_eq!(healthy.submits_for("Shot 3:"), 1);
    assert_eq!(healthy.submit_count(), 3);
    assert!(verify_continuity(&clips).is_ok());
}

#[tokio::test]
async fn test_transient_failure_does_not_resubmit_earlier_scenes() {
    let harness = Harness::new();
    let video = Arc::new(MockVideo::new().fail_times("Shot 3:", 2));

    let clips = generate_all(&harness.chain(video.clone()), &harness.script)
        .await
        .expect("third attempt succeeds");

    assert_eq!(clips.len(), 5);
    assert_eq!(video.submits_for("Shot 1:"), 1);
    assert_eq!(video.submits_for("Shot 2:"), 1);
    assert_eq!(video.submits_for("Shot 3:"), 3);
    assert_eq!(video.submit_count(), 7);
    assert_eq!(video.download_count(), 5);
}

#[tokio::test]
async fn test_rerun_is_fully_cached() {
    let harness = Harness::new();
    let first = generate_all(&harness.chain(Arc::new(MockVideo::new())), &harness.script)
        .await
        .expect("first run");

    let video = Arc::new(MockVideo::new());
    let second = generate_all(&harness.chain(video.clone()), &harness.script)
        .await
        .expect("second run");

    assert_eq!(video.submit_count(), 0);
    assert_eq!(harness.encoder.frame_extractions(), 5);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_tampered_frame_is_continuity_violation() {
    let harness = Harness::new();
    let video = Arc::new(MockVideo::new());
    let chain = harness.chain(video.clone());
    let scenes = &harness.script.scenes;

    let first = chain.generate(&scenes[0], None).await.expect("scene 0");
    std::fs::write(first.last_frame_path(), b"not the frame").expect("tamper");

    let err = chain
        .generate(&scenes[1], Some(&first))
        .await
        .expect_err("tampered seed");
    assert!(matches!(
        clip_kind(&err),
        ClipErrorKind::ContinuityViolation { scene_index: 1, .. }
    ));
    assert_eq!(video.submit_count(), 1, "no job submitted for scene 1");
}

#[tokio::test]
async fn test_out_of_order_seed_rejected() {
    let harness = Harness::new();
    let chain = harness.chain(Arc::new(MockVideo::new()));
    let scenes = &harness.script.scenes;

    let first = chain.generate(&scenes[0], None).await.expect("scene 0");
    let err = chain
        .generate(&scenes[2], Some(&first))
        .await
        .expect_err("scene 2 cannot follow scene 0");
    assert!(matches!(
        clip_kind(&err),
        ClipErrorKind::ContinuityViolation { scene_index: 2, .. }
    ));

    let err = chain
        .generate(&scenes[1], None)
        .await
        .expect_err("scene 1 needs a seed");
    assert!(matches!(
        clip_kind(&err),
        ClipErrorKind::ContinuityViolation { scene_index: 1, .. }
    ));
}

#[tokio::test]
async fn test_cached_lookup_follows_seed() {
    let harness = Harness::new();
    let chain = harness.chain(Arc::new(MockVideo::new()));
    let clips = generate_all(&chain, &harness.script).await.expect("chain");
    let scenes = &harness.script.scenes;

    let hit = chain
        .cached(&scenes[1], Some(clips[0].last_frame_hash().as_str()))
        .await
        .expect("lookup");
    assert_eq!(hit.as_ref(), Some(&clips[1]));

    let miss = chain
        .cached(&scenes[1], Some("0000"))
        .await
        .expect("lookup");
    assert!(miss.is_none(), "different seed means different clip");
}

#[tokio::test]
async fn test_frame_extraction_failure_keeps_download() {
    let harness = Harness::with_encoder(MockEncoder::new().fail_frames(1));
    let first = Arc::new(MockVideo::new());

    let err = generate_all(&harness.chain(first.clone()), &harness.script)
        .await
        .expect_err("frame extraction fails once");
    assert!(matches!(err.kind(), ReelsmithErrorKind::Composition(_)));
    assert_eq!(first.submit_count(), 1);
    assert_eq!(harness.store.keys(Stage::ClipRaw).await.unwrap().len(), 1);
    assert!(harness.store.keys(Stage::Clip).await.unwrap().is_empty());

    let second = Arc::new(MockVideo::new());
    let clips = generate_all(&harness.chain(second.clone()), &harness.script)
        .await
        .expect("second run finishes from the download");

    assert_eq!(second.submits_for("Shot 1:"), 0, "scene 0 is not paid for twice");
    assert_eq!(second.submit_count(), 4);
    assert_eq!(first.download_count() + second.download_count(), 5);
    assert!(verify_continuity(&clips).is_ok());
}
