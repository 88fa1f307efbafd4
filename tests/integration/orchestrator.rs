//! End-to-end orchestrator behavior: priority ordering, cancellation,
//! failure isolation, and lifecycle.

use std::sync::Arc;
use std::time::Duration;

use taskforge::{Error, TaskKind, TaskSpec, TaskStatus};

use crate::fixtures::{
    manager_with_workers, wait_for_status, BlockerExecutor, FailingExecutor, RecordingExecutor,
};

#[tokio::test]
async fn test_priority_dispatch_order() {
    let manager = manager_with_workers(1);
    manager.start().await;

    // Park the single worker so the real submissions pile up in the queue.
    let blocker = BlockerExecutor::new();
    let gate = blocker.release_handle();
    let gate_id = manager
        .submit_task(TaskSpec::new("gate").with_priority(100), Arc::new(blocker))
        .await
        .unwrap();

    let recorder = RecordingExecutor::new();
    let log = recorder.log();
    let recorder = Arc::new(recorder);

    let mut ids = Vec::new();
    for (name, priority) in [("three", 3), ("nine", 9), ("five", 5)] {
        let id = manager
            .submit_task(
                TaskSpec::new(name).with_priority(priority),
                Arc::clone(&recorder) as Arc<dyn taskforge::Executor>,
            )
            .await
            .unwrap();
        ids.push(id);
    }

    gate.notify_one();
    wait_for_status(&manager, &gate_id, TaskStatus::Done).await;
    for id in &ids {
        wait_for_status(&manager, id, TaskStatus::Done).await;
    }

    let order = log.lock().unwrap().clone();
    assert_eq!(order, vec!["nine", "five", "three"]);

    manager.stop().await;
}

#[tokio::test]
async fn test_equal_priority_is_fifo() {
    let manager = manager_with_workers(1);
    manager.start().await;

    let blocker = BlockerExecutor::new();
    let gate = blocker.release_handle();
    let gate_id = manager
        .submit_task(TaskSpec::new("gate").with_priority(100), Arc::new(blocker))
        .await
        .unwrap();

    let recorder = RecordingExecutor::new();
    let log = recorder.log();
    let recorder = Arc::new(recorder);

    let mut ids = Vec::new();
    for name in ["first", "second", "third"] {
        let id = manager
            .submit_task(
                TaskSpec::new(name),
                Arc::clone(&recorder) as Arc<dyn taskforge::Executor>,
            )
            .await
            .unwrap();
        ids.push(id);
    }

    gate.notify_one();
    for id in &ids {
        wait_for_status(&manager, id, TaskStatus::Done).await;
    }
    wait_for_status(&manager, &gate_id, TaskStatus::Done).await;

    let order = log.lock().unwrap().clone();
    assert_eq!(order, vec!["first", "second", "third"]);

    manager.stop().await;
}

#[tokio::test]
async fn test_failure_does_not_poison_pool() {
    let manager = manager_with_workers(1);
    manager.start().await;

    let bad = manager
        .submit_task(TaskSpec::new("bad"), Arc::new(FailingExecutor))
        .await
        .unwrap();

    let recorder = RecordingExecutor::new();
    let good = manager
        .submit_task(TaskSpec::new("good"), Arc::new(recorder))
        .await
        .unwrap();

    wait_for_status(&manager, &bad, TaskStatus::Error).await;
    wait_for_status(&manager, &good, TaskStatus::Done).await;

    let snap = manager.get_task_status(&bad).await.unwrap();
    assert!(snap.error_message.as_deref().unwrap().contains("fixture failure"));

    manager.stop().await;
}

#[tokio::test]
async fn test_cancel_queued_never_runs() {
    let manager = manager_with_workers(1);
    manager.start().await;

    let blocker = BlockerExecutor::new();
    let gate = blocker.release_handle();
    manager
        .submit_task(TaskSpec::new("gate").with_priority(100), Arc::new(blocker))
        .await
        .unwrap();

    let recorder = RecordingExecutor::new();
    let log = recorder.log();
    let doomed = manager
        .submit_task(TaskSpec::new("doomed"), Arc::new(recorder))
        .await
        .unwrap();

    assert!(manager.cancel_task(&doomed).await);
    gate.notify_one();

    wait_for_status(&manager, &doomed, TaskStatus::Cancelled).await;
    // Give the worker a chance to (incorrectly) pick it up.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(log.lock().unwrap().is_empty());

    manager.stop().await;
}

#[tokio::test]
async fn test_cancel_unknown_and_running_refused() {
    let manager = manager_with_workers(1);
    manager.start().await;

    assert!(!manager.cancel_task(&taskforge::TaskId::new()).await);

    let blocker = BlockerExecutor::new();
    let gate = blocker.release_handle();
    let id = manager
        .submit_task(TaskSpec::new("busy"), Arc::new(blocker))
        .await
        .unwrap();
    wait_for_status(&manager, &id, TaskStatus::Running).await;

    // Running tasks cannot be cancelled through the queue.
    assert!(!manager.cancel_task(&id).await);
    let snap = manager.get_task_status(&id).await.unwrap();
    assert_eq!(snap.status, TaskStatus::Running);

    gate.notify_one();
    wait_for_status(&manager, &id, TaskStatus::Done).await;
    manager.stop().await;
}

#[tokio::test]
async fn test_submit_before_start_is_configuration_error() {
    let manager = manager_with_workers(1);
    let result = manager
        .submit_task(TaskSpec::new("early"), Arc::new(RecordingExecutor::new()))
        .await;
    assert!(matches!(result, Err(Error::Configuration(_))));
}

#[tokio::test]
async fn test_concurrent_workers_drain_queue() {
    let manager = manager_with_workers(4);
    manager.start().await;

    let recorder = RecordingExecutor::new();
    let log = recorder.log();
    let recorder = Arc::new(recorder);

    let mut ids = Vec::new();
    for i in 0..20 {
        let id = manager
            .submit_task(
                TaskSpec::new(&format!("job-{}", i)).with_kind(TaskKind::Compute),
                Arc::clone(&recorder) as Arc<dyn taskforge::Executor>,
            )
            .await
            .unwrap();
        ids.push(id);
    }
    for id in &ids {
        wait_for_status(&manager, id, TaskStatus::Done).await;
    }

    assert_eq!(log.lock().unwrap().len(), 20);
    let status = manager.get_system_status().await;
    assert_eq!(status.queue.by_status.get("done"), Some(&20));

    manager.stop().await;
}

#[tokio::test]
async fn test_stop_cancels_in_flight_task() {
    let manager = manager_with_workers(1);
    manager.start().await;

    let blocker = BlockerExecutor::new();
    let id = manager
        .submit_task(TaskSpec::new("stuck"), Arc::new(blocker))
        .await
        .unwrap();
    wait_for_status(&manager, &id, TaskStatus::Running).await;

    manager.stop().await;
    let snap = manager.get_task_status(&id).await.unwrap();
    assert_eq!(snap.status, TaskStatus::Cancelled);
    assert!(!manager.is_running());
}

#[tokio::test]
async fn test_restart_after_stop() {
    let manager = manager_with_workers(1);
    manager.start().await;
    manager.stop().await;
    manager.start().await;

    let recorder = RecordingExecutor::new();
    let id = manager
        .submit_task(TaskSpec::new("again"), Arc::new(recorder))
        .await
        .unwrap();
    wait_for_status(&manager, &id, TaskStatus::Done).await;

    manager.stop().await;
}
