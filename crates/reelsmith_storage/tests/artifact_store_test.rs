//! Tests for the filesystem artifact store.

use reelsmith_core::{CacheKey, Stage};
use reelsmith_error::{ConfigError, ReelsmithError, ReelsmithErrorKind, StorageErrorKind};
use reelsmith_storage::{
    ArtifactPayload, ArtifactStore, Blob, FileSystemBackend, MANIFEST_FILE, Provenance,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

fn key(label: &str) -> CacheKey {
    reelsmith_core::Fingerprinter::new("test").field("label", label).finish()
}

#[tokio::test]
async fn test_put_and_read_back() {
    let temp_dir = TempDir::new().unwrap();
    let store = ArtifactStore::open(temp_dir.path()).unwrap();
    let key = key("script");

    let payload = ArtifactPayload::new(vec![Blob::new("script.json", b"{}".to_vec())])
        .with_metadata(serde_json::json!({ "attempts": 1 }));
    let entry = store.put(Stage::Script, &key, payload).await.unwrap();

    assert_eq!(entry.stage(), Stage::Script);
    assert_eq!(entry.metadata()["attempts"], 1);
    assert!(entry.blob_path(MANIFEST_FILE).exists());
    assert_eq!(store.read_blob(&entry, "script.json").await.unwrap(), b"{}");
    assert_eq!(store.keys(Stage::Script).await.unwrap(), vec![key.clone()]);
    assert!(store.contains(Stage::Script, &key).await.unwrap());
    assert!(!store.contains(Stage::Clip, &key).await.unwrap());
}

#[tokio::test]
async fn test_entries_are_write_once() {
    let temp_dir = TempDir::new().unwrap();
    let store = ArtifactStore::open(temp_dir.path()).unwrap();
    let key = key("narration");

    store
        .put(
            Stage::Narration,
            &key,
            ArtifactPayload::new(vec![Blob::new("audio.mp3", b"first".to_vec())]),
        )
        .await
        .unwrap();
    let second = store
        .put(
            Stage::Narration,
            &key,
            ArtifactPayload::new(vec![Blob::new("audio.mp3", b"second".to_vec())]),
        )
        .await
        .unwrap();

    assert_eq!(store.read_blob(&second, "audio.mp3").await.unwrap(), b"first");
}

#[tokio::test]
async fn test_compute_or_fetch_runs_producer_once() {
    let temp_dir = TempDir::new().unwrap();
    let store = ArtifactStore::open(temp_dir.path()).unwrap();
    let key = key("brief");
    let calls = AtomicUsize::new(0);

    for expected in [Provenance::Computed, Provenance::Hit, Provenance::Hit] {
        let fetched = store
            .compute_or_fetch(Stage::Brief, &key, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(ArtifactPayload::new(vec![Blob::new("brief.json", b"[]".to_vec())]))
            })
            .await
            .unwrap();
        assert_eq!(fetched.provenance, expected);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_callers_collapse_to_single_winner() {
    let temp_dir = TempDir::new().unwrap();
    let store = ArtifactStore::open(temp_dir.path()).unwrap();
    let key = key("clip");
    let calls = Arc::new(AtomicUsize::new(0));

    let tasks = (0..8).map(|i| {
        let store = store.clone();
        let key = key.clone();
        let calls = calls.clone();
        tokio::spawn(async move {
            store
                .compute_or_fetch(Stage::Clip, &key, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(ArtifactPayload::new(vec![Blob::new(
                        "clip.mp4",
                        format!("clip from {}", i).into_bytes(),
                    )]))
                })
                .await
        })
    });

    let results = futures::future::join_all(tasks).await;
    let mut contents = Vec::new();
    for result in results {
        let fetched = result.unwrap().unwrap();
        contents.push(store.read_blob(&fetched.entry, "clip.mp4").await.unwrap());
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(contents.windows(2).all(|pair| pair[0] == pair[1]));
}

#[tokio::test]
async fn test_failed_producer_leaves_no_entry() {
    let temp_dir = TempDir::new().unwrap();
    let store = ArtifactStore::open(temp_dir.path()).unwrap();
    let key = key("failing");

    let result = store
        .compute_or_fetch(Stage::Clip, &key, || async {
            Err(ReelsmithError::from(ConfigError::new("producer failed")))
        })
        .await;
    assert!(result.is_err());
    assert!(store.get(Stage::Clip, &key).await.unwrap().is_none());

    let fetched = store
        .compute_or_fetch(Stage::Clip, &key, || async {
            Ok(ArtifactPayload::new(vec![Blob::new("clip.mp4", b"ok".to_vec())]))
        })
        .await
        .unwrap();
    assert_eq!(fetched.provenance, Provenance::Computed);
}

#[tokio::test]
async fn test_corrupt_blob_detected() {
    let temp_dir = TempDir::new().unwrap();
    let store = ArtifactStore::open(temp_dir.path()).unwrap();
    let key = key("frame");

    let entry = store
        .put(
            Stage::Clip,
            &key,
            ArtifactPayload::new(vec![Blob::new("last_frame.png", b"pixels".to_vec())]),
        )
        .await
        .unwrap();
    std::fs::write(entry.blob_path("last_frame.png"), b"tampered").unwrap();

    let err = store.read_blob(&entry, "last_frame.png").await.unwrap_err();
    match err.kind() {
        ReelsmithErrorKind::Storage(e) => {
            assert!(matches!(e.kind, StorageErrorKind::Corrupt(_)))
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(store.verify(&entry).await.is_err());
}

#[tokio::test]
async fn test_incomplete_entries_are_invisible_and_swept() {
    let temp_dir = TempDir::new().unwrap();
    let key = key("partial");

    // Entry directory without a manifest, as left by a crash mid-write.
    let partial = temp_dir.path().join("clip").join(key.as_str());
    std::fs::create_dir_all(&partial).unwrap();
    std::fs::write(partial.join("clip.mp4"), b"half").unwrap();
    let stale = temp_dir.path().join("clip").join(".tmp-stale");
    std::fs::create_dir_all(&stale).unwrap();

    let backend = FileSystemBackend::with_stale_age(temp_dir.path(), Duration::ZERO).unwrap();
    let store = ArtifactStore::with_backend(Arc::new(backend));
    assert!(!stale.exists());
    assert!(store.get(Stage::Clip, &key).await.unwrap().is_none());
    assert!(store.keys(Stage::Clip).await.unwrap().is_empty());

    let entry = store
        .put(
            Stage::Clip,
            &key,
            ArtifactPayload::new(vec![Blob::new("clip.mp4", b"whole".to_vec())]),
        )
        .await
        .unwrap();
    assert_eq!(store.read_blob(&entry, "clip.mp4").await.unwrap(), b"whole");
}

#[tokio::test]
async fn test_read_json_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let store = ArtifactStore::open(temp_dir.path()).unwrap();
    let key = key("json");

    let value = vec!["hook".to_string(), "problem".to_string()];
    let entry = store
        .put(
            Stage::Script,
            &key,
            ArtifactPayload::new(vec![Blob::json("roles.json", &value).unwrap()]),
        )
        .await
        .unwrap();

    let decoded: Vec<String> = store.read_json(&entry, "roles.json").await.unwrap();
    assert_eq!(decoded, value);
}

fn temp_dirs(stage_dir: &std::path::Path) -> Vec<String> {
    std::fs::read_dir(stage_dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|e| e.file_name().to_string_lossy().to_string())
                .filter(|name| name.starts_with(".tmp-"))
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn test_recent_temp_dirs_survive_open() {
    let temp_dir = TempDir::new().unwrap();
    let in_flight = temp_dir.path().join("clip").join(".tmp-in-flight");
    std::fs::create_dir_all(&in_flight).unwrap();
    std::fs::write(in_flight.join("clip.mp4"), b"being written").unwrap();

    ArtifactStore::open(temp_dir.path()).unwrap();

    assert!(in_flight.join("clip.mp4").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_second_store_on_same_root_does_not_break_commit() {
    let temp_dir = TempDir::new().unwrap();
    let writer = ArtifactStore::open(temp_dir.path()).unwrap();
    let key = key("many-blobs");
    let blobs: Vec<Blob> = (0..2000)
        .map(|i| Blob::new(format!("b{}", i), vec![i as u8; 64]))
        .collect();

    let root = temp_dir.path().to_path_buf();
    let opener = tokio::task::spawn_blocking(move || {
        for _ in 0..200 {
            ArtifactStore::open(&root).unwrap();
        }
    });

    let entry = writer
        .put(Stage::Clip, &key, ArtifactPayload::new(blobs))
        .await
        .expect("commit survives concurrent opens");
    opener.await.unwrap();

    assert_eq!(entry.manifest().blobs.len(), 2000);
    assert!(writer.verify(&entry).await.is_ok());
}

#[tokio::test]
async fn test_failed_commit_removes_its_temp_dir() {
    let temp_dir = TempDir::new().unwrap();
    let store = ArtifactStore::open(temp_dir.path()).unwrap();
    let key = key("unwritable");

    // "." resolves to the temp directory itself, so the blob write fails.
    let result = store
        .put(
            Stage::Narration,
            &key,
            ArtifactPayload::new(vec![
                Blob::new("audio.mp3", b"ok".to_vec()),
                Blob::new(".", b"not a file".to_vec()),
            ]),
        )
        .await;

    assert!(result.is_err());
    assert!(temp_dirs(&temp_dir.path().join("narration")).is_empty());
    assert!(!store.contains(Stage::Narration, &key).await.unwrap());
}
