//! Workers and the fixed-size worker pool.
//!
//! Each worker runs an independent loop over the shared priority queue:
//! dequeue, mark Running, run the executor, record the outcome. A failing
//! executor never takes the worker down; cancellation is cooperative via
//! a `CancellationToken` hierarchy.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::queue::{PriorityTaskQueue, SharedTask};
use crate::core::task::{TaskId, TaskStatus};

/// Read-only view of a single worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub id: usize,
    pub busy: bool,
    pub current_task: Option<TaskId>,
}

/// A single consumer of the shared priority queue.
pub struct Worker {
    id: usize,
    queue: Arc<PriorityTaskQueue>,
    cancel: CancellationToken,
    current: Arc<RwLock<Option<TaskId>>>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn new(id: usize, queue: Arc<PriorityTaskQueue>, cancel: CancellationToken) -> Self {
        Self {
            id,
            queue,
            cancel,
            current: Arc::new(RwLock::new(None)),
            handle: None,
        }
    }

    /// Launch the worker loop. No-op if already running.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }
        let id = self.id;
        let queue = Arc::clone(&self.queue);
        let cancel = self.cancel.clone();
        let current = Arc::clone(&self.current);
        self.handle = Some(tokio::spawn(async move {
            run_loop(id, queue, cancel, current).await;
        }));
    }

    /// Request cancellation and wait (bounded) for the loop to exit.
    /// No-op if already stopped.
    pub async fn stop(&mut self, timeout: Duration) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.cancel.cancel();
        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(())) => debug!(worker = self.id, "worker stopped"),
            Ok(Err(e)) => warn!(worker = self.id, error = %e, "worker task panicked"),
            Err(_) => warn!(worker = self.id, ?timeout, "worker did not stop in time"),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub async fn status(&self) -> WorkerStatus {
        let current_task = *self.current.read().await;
        WorkerStatus {
            id: self.id,
            busy: current_task.is_some(),
            current_task,
        }
    }
}

/// The worker loop: dequeue, execute, record, repeat until cancelled.
async fn run_loop(
    id: usize,
    queue: Arc<PriorityTaskQueue>,
    cancel: CancellationToken,
    current: Arc<RwLock<Option<TaskId>>>,
) {
    debug!(worker = id, "worker loop started");
    loop {
        let task: SharedTask = tokio::select! {
            _ = cancel.cancelled() => break,
            task = queue.get() => task,
        };

        // A task cancelled after dequeue but before dispatch is discarded.
        let status = task.read().await.status;
        if status == TaskStatus::Cancelled {
            continue;
        }

        if !task.write().await.start() {
            continue;
        }

        let (task_id, executor, snapshot) = {
            let t = task.read().await;
            (t.id, Arc::clone(&t.executor), t.clone())
        };
        *current.write().await = Some(task_id);
        debug!(worker = id, task = %task_id.short(), "executing task");

        // The registry/queue locks are not held here; the executor runs
        // against a snapshot and only the outcome is written back.
        let outcome = tokio::select! {
            _ = cancel.cancelled() => None,
            res = executor.execute(&snapshot) => Some(res),
        };

        match outcome {
            Some(Ok(value)) => {
                task.write().await.complete(value);
                *current.write().await = None;
                debug!(worker = id, task = %task_id.short(), "task done");
            }
            Some(Err(e)) => {
                let message = format!("executor error: {}", e);
                task.write().await.fail(&message);
                *current.write().await = None;
                warn!(worker = id, task = %task_id.short(), error = %e, "task failed");
            }
            None => {
                task.write().await.cancel();
                *current.write().await = None;
                debug!(worker = id, task = %task_id.short(), "task cancelled mid-flight");
                break;
            }
        }
    }
    *current.write().await = None;
    debug!(worker = id, "worker loop exited");
}

/// A fixed-size collection of workers sharing one priority queue.
pub struct WorkerPool {
    queue: Arc<PriorityTaskQueue>,
    workers: Vec<Worker>,
    cancel: CancellationToken,
    size: usize,
    shutdown_timeout: Duration,
    running: bool,
}

impl WorkerPool {
    pub fn new(size: usize, queue: Arc<PriorityTaskQueue>, shutdown_timeout: Duration) -> Self {
        Self {
            queue,
            workers: Vec::new(),
            cancel: CancellationToken::new(),
            size,
            shutdown_timeout,
            running: false,
        }
    }

    /// Launch all workers. No-op if already started.
    ///
    /// Each start builds a fresh token hierarchy: a cancelled token cannot
    /// be reused across a stop/start cycle.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.cancel = CancellationToken::new();
        self.workers = (0..self.size)
            .map(|id| Worker::new(id, Arc::clone(&self.queue), self.cancel.child_token()))
            .collect();
        for worker in &mut self.workers {
            worker.start();
        }
        self.running = true;
        debug!(workers = self.size, "worker pool started");
    }

    /// Signal every worker to exit and wait (bounded) for each.
    /// No-op if already stopped.
    pub async fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.cancel.cancel();
        let timeout = self.shutdown_timeout;
        for worker in &mut self.workers {
            worker.stop(timeout).await;
        }
        self.running = false;
        debug!("worker pool stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub async fn worker_statuses(&self) -> Vec<WorkerStatus> {
        let mut statuses = Vec::with_capacity(self.workers.len());
        for worker in &self.workers {
            statuses.push(worker.status().await);
        }
        statuses
    }
}
