//! Tests for the poll-until-terminal job abstraction.

use reelsmith_error::{ReelsmithError, ReelsmithErrorKind, ServiceError, ServiceErrorKind};
use reelsmith_models::{JobHandle, JobStatus, PollConfig, poll_until_terminal};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn handle() -> JobHandle {
    JobHandle::new("video", "operations/abc")
}

#[test]
fn test_poll_interval_is_clamped() {
    let fast = PollConfig::from_secs(1, 60);
    assert_eq!(*fast.interval(), Duration::from_secs(5));

    let slow = PollConfig::from_secs(60, 600);
    assert_eq!(*slow.interval(), Duration::from_secs(15));

    let default = PollConfig::default();
    assert_eq!(*default.interval(), Duration::from_secs(10));
    assert_eq!(*default.timeout(), Duration::from_secs(360));
}

#[tokio::test(start_paused = true)]
async fn test_polls_until_success() {
    let statuses = Mutex::new(vec![
        JobStatus::Succeeded("clip.mp4"),
        JobStatus::Running { progress: Some(50) },
        JobStatus::Pending,
    ]);
    let probes = AtomicUsize::new(0);

    let output = poll_until_terminal(
        &handle(),
        &PollConfig::from_secs(5, 300),
        &CancellationToken::new(),
        || {
            probes.fetch_add(1, Ordering::SeqCst);
            let next = statuses.lock().unwrap().pop().unwrap();
            async move { Ok(next) }
        },
    )
    .await
    .unwrap();

    assert_eq!(output, "clip.mp4");
    assert_eq!(probes.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_failed_job_is_retryable_error() {
    let err = poll_until_terminal::<(), _, _>(
        &handle(),
        &PollConfig::default(),
        &CancellationToken::new(),
        || async {
            Ok(JobStatus::Failed {
                reason: "safety filter".to_string(),
            })
        },
    )
    .await
    .unwrap_err();

    assert!(err.is_retryable());
    match err.kind() {
        ReelsmithErrorKind::Service(e) => {
            assert!(matches!(e.kind, ServiceErrorKind::JobFailed { .. }))
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_retryable_error() {
    let probes = AtomicUsize::new(0);
    let err = poll_until_terminal::<(), _, _>(
        &handle(),
        &PollConfig::from_secs(10, 35),
        &CancellationToken::new(),
        || {
            probes.fetch_add(1, Ordering::SeqCst);
            async { Ok(JobStatus::Running { progress: None }) }
        },
    )
    .await
    .unwrap_err();

    assert!(err.is_retryable());
    match err.kind() {
        ReelsmithErrorKind::Service(e) => {
            assert!(matches!(e.kind, ServiceErrorKind::Timeout { seconds: 35, .. }))
        }
        other => panic!("unexpected error: {other}"),
    }
    // t = 0, 10, 20, 30, 35
    assert_eq!(probes.load(Ordering::SeqCst), 5);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_stops_polling() {
    let cancel = CancellationToken::new();
    let probes = AtomicUsize::new(0);

    let err = poll_until_terminal::<(), _, _>(
        &handle(),
        &PollConfig::default(),
        &cancel,
        || {
            if probes.fetch_add(1, Ordering::SeqCst) == 1 {
                cancel.cancel();
            }
            async { Ok(JobStatus::Pending) }
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err.kind(), ReelsmithErrorKind::Cancelled(_)));
    assert!(!err.is_retryable());
    assert_eq!(probes.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_probe_error_propagates() {
    let handle = handle();
    let err = poll_until_terminal::<(), _, _>(
        &handle,
        &PollConfig::default(),
        &CancellationToken::new(),
        || {
            let service = handle.service().clone();
            async move {
                Err(ReelsmithError::from(ServiceError::new(
                    service,
                    ServiceErrorKind::Http {
                        status_code: 404,
                        message: "no such operation".to_string(),
                    },
                )))
            }
        },
    )
    .await
    .unwrap_err();

    assert!(!err.is_retryable());
}
