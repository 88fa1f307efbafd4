//! Thread-safe max-priority queue over tasks.
//!
//! Ordering contract: strictly descending by priority; tasks with equal
//! priority are served in insertion order, using a monotonically increasing
//! counter as the tie-break key. The internal lock is held only for short,
//! await-free critical sections and never while a task executes.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::sync::Mutex;
use tokio::sync::{Notify, RwLock};
use tracing::debug;

use crate::core::task::{Task, TaskId, TaskStatus};

/// A task shared between the registry and the queue.
pub type SharedTask = Arc<RwLock<Task>>;

/// One queued task with its ordering keys captured at insertion time.
struct QueueEntry {
    priority: i64,
    seq: u64,
    id: TaskId,
    task: SharedTask,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority pops first; among equal priorities the
        // smaller (earlier) sequence number pops first.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct QueueInner {
    heap: BinaryHeap<QueueEntry>,
    next_seq: u64,
}

/// Thread-safe max-priority queue shared by the worker pool.
pub struct PriorityTaskQueue {
    inner: Mutex<QueueInner>,
    available: Notify,
}

impl PriorityTaskQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                heap: BinaryHeap::new(),
                next_seq: 0,
            }),
            available: Notify::new(),
        }
    }

    /// Insert a task. O(log n).
    pub async fn put(&self, task: SharedTask) {
        let (priority, id) = {
            let t = task.read().await;
            (t.priority, t.id)
        };
        {
            let mut inner = self.inner.lock().expect("queue lock poisoned");
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.heap.push(QueueEntry {
                priority,
                seq,
                id,
                task,
            });
        }
        debug!(task = %id.short(), priority, "queued task");
        self.available.notify_one();
    }

    /// Remove and return the highest-priority task, or None if empty.
    pub fn get_nowait(&self) -> Option<SharedTask> {
        let mut inner = self.inner.lock().expect("queue lock poisoned");
        inner.heap.pop().map(|entry| entry.task)
    }

    /// Wait until a task is available, then remove and return it.
    ///
    /// Suspends without spinning; cancel-safe, so it can be raced against a
    /// shutdown signal in a `select!` without losing queued tasks.
    pub async fn get(&self) -> SharedTask {
        loop {
            let notified = self.available.notified();
            if let Some(task) = self.get_nowait() {
                return task;
            }
            notified.await;
        }
    }

    /// Remove a still-queued task by id, marking it Cancelled.
    ///
    /// Returns false when the id is not in the queue — including the case
    /// where the task was already dispatched to a worker.
    pub async fn remove_task(&self, id: &TaskId) -> bool {
        let removed = {
            let mut inner = self.inner.lock().expect("queue lock poisoned");
            let before = inner.heap.len();
            let entries: Vec<QueueEntry> = std::mem::take(&mut inner.heap).into_vec();
            let (kept, removed): (Vec<_>, Vec<_>) =
                entries.into_iter().partition(|e| e.id != *id);
            inner.heap = kept.into();
            debug_assert!(inner.heap.len() + removed.len() == before);
            removed
        };
        if removed.is_empty() {
            return false;
        }
        for entry in removed {
            entry.task.write().await.cancel();
        }
        debug!(task = %id.short(), "removed queued task");
        true
    }

    /// Number of queued tasks.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("queue lock poisoned").heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every queued task, cancelling each. Returns the number cleared.
    pub async fn clear(&self) -> usize {
        let entries: Vec<QueueEntry> = {
            let mut inner = self.inner.lock().expect("queue lock poisoned");
            std::mem::take(&mut inner.heap).into_vec()
        };
        let cleared = entries.len();
        for entry in entries {
            let mut task = entry.task.write().await;
            if task.status == TaskStatus::Queued {
                task.cancel();
            }
        }
        cleared
    }
}

impl Default for PriorityTaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PriorityTaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriorityTaskQueue")
            .field("len", &self.len())
            .finish()
    }
}
