//! Tests for dependency-ordered task execution.

use reelsmith_error::{ReelsmithErrorKind, ServiceError, ServiceErrorKind};
use reelsmith_pipeline::{TaskGraph, TaskId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn failure() -> reelsmith_error::ReelsmithError {
    ServiceError::new(
        "video",
        ServiceErrorKind::Http {
            status_code: 400,
            message: "bad request".to_string(),
        },
    )
    .into()
}

#[tokio::test]
async fn test_chain_runs_in_dependency_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut graph: TaskGraph<usize> = TaskGraph::new();
    let mut previous: Option<TaskId> = None;

    for step in 0..4 {
        let needs: Vec<TaskId> = previous.into_iter().collect();
        let log = log.clone();
        let id = graph
            .add(format!("step-{}", step), &needs, move |inputs| async move {
                log.lock().expect("lock").push(step);
                Ok(inputs.first().copied().unwrap_or(0) + step)
            })
            .expect("add task");
        previous = Some(id);
    }

    let outputs = graph
        .run(&CancellationToken::new())
        .await
        .expect("graph succeeds");
    assert_eq!(*log.lock().expect("lock"), vec![0, 1, 2, 3]);
    assert_eq!(outputs.get(TaskId::from(3)), Some(&6));
    assert_eq!(outputs.completion_order().len(), 4);
}

#[tokio::test]
async fn test_independent_tasks_overlap() {
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let mut graph: TaskGraph<()> = TaskGraph::new();

    for i in 0..3 {
        let active = active.clone();
        let peak = peak.clone();
        graph
            .add(format!("independent-{}", i), &[], move |_| async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            })
            .expect("add task");
    }

    graph
        .run(&CancellationToken::new())
        .await
        .expect("graph succeeds");
    assert_eq!(peak.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_failure_stops_dependents_but_finishes_in_flight() {
    let finished = Arc::new(AtomicUsize::new(0));
    let dependent_ran = Arc::new(AtomicUsize::new(0));
    let mut graph: TaskGraph<u32> = TaskGraph::new();

    let failing = graph
        .add("failing", &[], |_| async { Err(failure()) })
        .expect("add task");
    {
        let dependent_ran = dependent_ran.clone();
        graph
            .add("dependent", &[failing], move |_| async move {
                dependent_ran.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            })
            .expect("add task");
    }
    {
        let finished = finished.clone();
        graph
            .add("slow sibling", &[], move |_| async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                Ok(2)
            })
            .expect("add task");
    }

    let err = graph
        .run(&CancellationToken::new())
        .await
        .expect_err("graph fails");
    assert!(matches!(err.kind(), ReelsmithErrorKind::Service(_)));
    assert_eq!(dependent_ran.load(Ordering::SeqCst), 0);
    assert_eq!(
        finished.load(Ordering::SeqCst),
        1,
        "in-flight sibling drained"
    );
}

#[tokio::test]
async fn test_cancellation_returns_cancelled() {
    let cancel = CancellationToken::new();
    let started_second = Arc::new(AtomicUsize::new(0));
    let mut graph: TaskGraph<()> = TaskGraph::new();

    let first = {
        let cancel = cancel.clone();
        graph
            .add("first", &[], move |_| async move {
                cancel.cancel();
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(())
            })
            .expect("add task")
    };
    {
        let started_second = started_second.clone();
        graph
            .add("second", &[first], move |_| async move {
                started_second.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .expect("add task");
    }

    let err = graph.run(&cancel).await.expect_err("cancelled");
    assert!(matches!(err.kind(), ReelsmithErrorKind::Cancelled(_)));
    assert_eq!(started_second.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unknown_dependency_is_rejected() {
    let mut graph: TaskGraph<()> = TaskGraph::new();
    let other: TaskGraph<()> = TaskGraph::new();
    assert!(other.is_empty());

    let err = graph
        .add("orphan", &[TaskId::from(7)], |_| async { Ok(()) })
        .expect_err("unknown dependency");
    assert!(matches!(err.kind(), ReelsmithErrorKind::Config(_)));
    assert!(graph.is_empty());
}

#[tokio::test]
async fn test_names_and_needs_are_recorded() {
    let mut graph: TaskGraph<()> = TaskGraph::new();
    let a = graph.add("a", &[], |_| async { Ok(()) }).expect("add a");
    let b = graph.add("b", &[a], |_| async { Ok(()) }).expect("add b");

    assert_eq!(graph.len(), 2);
    assert_eq!(graph.name(b), Some("b"));
    assert_eq!(graph.needs(b), Some(&[a][..]));
    assert_eq!(b.to_string(), "task#1");
}
