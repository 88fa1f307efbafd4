//! Top-level orchestration API.
//!
//! The `OrchestratorManager` composes the priority queue, the worker pool,
//! and the task registry. It owns every task it has accepted; the queue only
//! borrows them while they wait for dispatch.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::config::OrchestratorConfig;
use crate::core::queue::{PriorityTaskQueue, SharedTask};
use crate::core::task::{Executor, Task, TaskId, TaskKind, TaskSnapshot, TaskSpec, TaskStatus};
use crate::error::{Error, Result};
use crate::orchestration::worker::{WorkerPool, WorkerStatus};

/// Aggregate view of the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStatus {
    /// Tasks currently waiting for dispatch.
    pub size: usize,
    /// Tasks known to the registry, in any state.
    pub total: usize,
    /// Registry task counts keyed by status name.
    pub by_status: HashMap<String, usize>,
}

/// Aggregate view of the whole orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    pub is_running: bool,
    pub num_workers: usize,
    pub queue: QueueStatus,
    pub workers: Vec<WorkerStatus>,
}

/// Top-level task orchestrator.
///
/// Construct one per process root and pass it by reference to all callers;
/// there is no global accessor.
pub struct OrchestratorManager {
    config: OrchestratorConfig,
    queue: Arc<PriorityTaskQueue>,
    pool: Mutex<WorkerPool>,
    registry: RwLock<HashMap<TaskId, SharedTask>>,
    running: AtomicBool,
    // Serializes start/stop so concurrent lifecycle calls are safe.
    lifecycle: Mutex<()>,
}

impl OrchestratorManager {
    pub fn new(config: OrchestratorConfig) -> Self {
        let queue = Arc::new(PriorityTaskQueue::new());
        let pool = WorkerPool::new(
            config.num_workers,
            Arc::clone(&queue),
            config.shutdown_timeout(),
        );
        Self {
            config,
            queue,
            pool: Mutex::new(pool),
            registry: RwLock::new(HashMap::new()),
            running: AtomicBool::new(false),
            lifecycle: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Launch the worker pool. Idempotent.
    pub async fn start(&self) {
        let _guard = self.lifecycle.lock().await;
        if self.running.load(Ordering::SeqCst) {
            return;
        }
        self.pool.lock().await.start();
        self.running.store(true, Ordering::SeqCst);
        info!(workers = self.config.num_workers, "orchestrator started");
    }

    /// Signal workers to exit and wait (bounded) for them. Idempotent.
    ///
    /// A worker mid-execution may finish its current task before observing
    /// the stop signal.
    pub async fn stop(&self) {
        let _guard = self.lifecycle.lock().await;
        if !self.running.load(Ordering::SeqCst) {
            return;
        }
        self.pool.lock().await.stop().await;
        self.running.store(false, Ordering::SeqCst);
        info!("orchestrator stopped");
    }

    /// Create, register, and enqueue a task.
    ///
    /// # Errors
    /// Returns `Error::Configuration` if the orchestrator has not been started.
    pub async fn submit_task(
        &self,
        spec: TaskSpec,
        executor: Arc<dyn Executor>,
    ) -> Result<TaskId> {
        if !self.is_running() {
            return Err(Error::Configuration(
                "orchestrator is not running; call start() before submitting tasks".to_string(),
            ));
        }
        let task = Task::new(spec, executor);
        let id = task.id;
        debug!(task = %id.short(), name = %task.name, priority = task.priority, "submitting task");

        let shared: SharedTask = Arc::new(RwLock::new(task));
        self.registry.write().await.insert(id, Arc::clone(&shared));
        self.queue.put(shared).await;
        Ok(id)
    }

    /// Cancel a still-queued task.
    ///
    /// Returns false for unknown ids and for tasks that are no longer
    /// Queued — a Running task cannot be forcibly stopped.
    pub async fn cancel_task(&self, id: &TaskId) -> bool {
        let Some(task) = self.registry.read().await.get(id).cloned() else {
            return false;
        };
        if task.read().await.status != TaskStatus::Queued {
            return false;
        }
        // The queue removal re-checks presence, so a task dispatched between
        // the status read and this call is correctly refused.
        self.queue.remove_task(id).await
    }

    /// Snapshot a task by id. Total: unknown ids return None, never an error.
    pub async fn get_task_status(&self, id: &TaskId) -> Option<TaskSnapshot> {
        let task = self.registry.read().await.get(id).cloned()?;
        let snapshot = task.read().await.snapshot();
        Some(snapshot)
    }

    /// Snapshots of all known tasks, newest first, optionally filtered.
    pub async fn list_tasks(
        &self,
        status: Option<TaskStatus>,
        kind: Option<TaskKind>,
    ) -> Vec<TaskSnapshot> {
        let tasks: Vec<SharedTask> = self.registry.read().await.values().cloned().collect();
        let mut snapshots = Vec::with_capacity(tasks.len());
        for task in tasks {
            let snap = task.read().await.snapshot();
            if status.is_some_and(|s| s != snap.status) {
                continue;
            }
            if kind.is_some_and(|k| k != snap.kind) {
                continue;
            }
            snapshots.push(snap);
        }
        snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        snapshots
    }

    pub async fn get_queue_status(&self) -> QueueStatus {
        let tasks: Vec<SharedTask> = self.registry.read().await.values().cloned().collect();
        let mut by_status: HashMap<String, usize> = HashMap::new();
        for task in &tasks {
            let status = task.read().await.status;
            *by_status.entry(status.as_str().to_string()).or_insert(0) += 1;
        }
        QueueStatus {
            size: self.queue.len(),
            total: tasks.len(),
            by_status,
        }
    }

    pub async fn get_worker_status(&self) -> Vec<WorkerStatus> {
        self.pool.lock().await.worker_statuses().await
    }

    pub async fn get_system_status(&self) -> SystemStatus {
        SystemStatus {
            is_running: self.is_running(),
            num_workers: self.config.num_workers,
            queue: self.get_queue_status().await,
            workers: self.get_worker_status().await,
        }
    }

    /// Evict the oldest terminal tasks beyond `keep_recent`.
    ///
    /// Returns the number of registry entries removed. Queued and Running
    /// tasks are never evicted.
    pub async fn clear_completed_tasks(&self, keep_recent: usize) -> usize {
        let mut terminal: Vec<(TaskId, chrono::DateTime<chrono::Utc>)> = Vec::new();
        {
            let registry = self.registry.read().await;
            for (id, task) in registry.iter() {
                let t = task.read().await;
                if t.is_finished() {
                    terminal.push((*id, t.created_at));
                }
            }
        }
        // Newest first; everything past the retention window goes.
        terminal.sort_by(|a, b| b.1.cmp(&a.1));
        let evict: Vec<TaskId> = terminal
            .into_iter()
            .skip(keep_recent)
            .map(|(id, _)| id)
            .collect();

        let mut registry = self.registry.write().await;
        let mut removed = 0;
        for id in evict {
            if registry.remove(&id).is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, keep_recent, "trimmed completed tasks");
        }
        removed
    }
}
