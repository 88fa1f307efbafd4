//! Test fixtures for integration tests.
//!
//! Provides executors with observable behavior (recording, blocking,
//! failing) and helpers for building managers and waiting on task states.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use taskforge::config::OrchestratorConfig;
use taskforge::{Error, Executor, OrchestratorManager, Result, Task, TaskId, TaskStatus};

/// Records the name of every task it executes, in completion order.
pub struct RecordingExecutor {
    log: Arc<Mutex<Vec<String>>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.log)
    }
}

#[async_trait]
impl Executor for RecordingExecutor {
    async fn execute(&self, task: &Task) -> Result<Value> {
        self.log.lock().unwrap().push(task.name.clone());
        Ok(json!({"name": task.name}))
    }
}

/// Parks until released, holding its worker busy.
///
/// Used to let several submissions accumulate in the queue before a
/// single worker starts draining them.
pub struct BlockerExecutor {
    release: Arc<Notify>,
}

impl BlockerExecutor {
    pub fn new() -> Self {
        Self {
            release: Arc::new(Notify::new()),
        }
    }

    pub fn release_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.release)
    }
}

#[async_trait]
impl Executor for BlockerExecutor {
    async fn execute(&self, _task: &Task) -> Result<Value> {
        self.release.notified().await;
        Ok(Value::Null)
    }
}

/// Always fails with a fixed message.
pub struct FailingExecutor;

#[async_trait]
impl Executor for FailingExecutor {
    async fn execute(&self, _task: &Task) -> Result<Value> {
        Err(Error::TaskExecution("fixture failure".to_string()))
    }
}

/// Build a manager with `num_workers` workers and a short shutdown timeout.
pub fn manager_with_workers(num_workers: usize) -> OrchestratorManager {
    OrchestratorManager::new(OrchestratorConfig {
        num_workers,
        shutdown_timeout_secs: 2,
        ..OrchestratorConfig::default()
    })
}

/// Poll until the task reaches `status` or a timeout expires.
pub async fn wait_for_status(manager: &OrchestratorManager, id: &TaskId, status: TaskStatus) {
    for _ in 0..500 {
        if let Some(snap) = manager.get_task_status(id).await {
            if snap.status == status {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {} never reached {:?}", id, status);
}
