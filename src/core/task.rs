//! Task data model for the orchestrator.
//!
//! Tasks are the atomic units of schedulable work. Each task tracks its
//! priority, lifecycle status, timing, context, and result or error slots.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;

/// Default priority assigned to submitted tasks.
pub const DEFAULT_PRIORITY: i64 = 5;

/// Unique identifier for a task.
///
/// Uses UUID v4 for generation and provides a short form display
/// for human-readable output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Create a new unique task identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return first 8 characters of the UUID for display.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Category of work a task (or graph node) performs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Compute,
    Io,
    Network,
    Model,
    Data,
    #[default]
    Generic,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskKind::Compute => "compute",
            TaskKind::Io => "io",
            TaskKind::Network => "network",
            TaskKind::Model => "model",
            TaskKind::Data => "data",
            TaskKind::Generic => "generic",
        };
        write!(f, "{}", s)
    }
}

/// Task status in its lifecycle.
///
/// Transitions are monotonic and one-directional:
/// Queued -> {Running, Cancelled}; Running -> {Done, Error, Cancelled};
/// Done, Error, and Cancelled are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Queued,
    Running,
    Done,
    Error,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Done => "done",
            TaskStatus::Error => "error",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Done | TaskStatus::Error | TaskStatus::Cancelled
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The unit of work run by a worker.
///
/// Implementors carry whatever state the work needs; the orchestrator never
/// inspects the returned value, it only stores it on the task.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, task: &Task) -> Result<Value>;
}

/// Submission descriptor for a task.
///
/// Also the export format of the graph optimizer: exported specs carry the
/// originating node id under the `node_id` context key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub name: String,
    pub priority: i64,
    pub kind: TaskKind,
    #[serde(default)]
    pub context: HashMap<String, Value>,
}

impl TaskSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            priority: DEFAULT_PRIORITY,
            kind: TaskKind::Generic,
            context: HashMap::new(),
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_kind(mut self, kind: TaskKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_context(mut self, key: &str, value: Value) -> Self {
        self.context.insert(key.to_string(), value);
        self
    }

    /// The originating graph node id, when this spec was exported
    /// from an optimized graph.
    pub fn node_id(&self) -> Option<&str> {
        self.context.get("node_id").and_then(Value::as_str)
    }
}

/// A single schedulable task.
///
/// Owned by the orchestrator's registry; the priority queue holds the same
/// referenced object transiently while the task is queued.
#[derive(Clone)]
pub struct Task {
    /// Unique identifier for this task.
    pub id: TaskId,
    /// Human-readable name for the task.
    pub name: String,
    /// Scheduling priority; higher runs first. Intended range 0-10,
    /// not hard-enforced.
    pub priority: i64,
    /// Category of work.
    pub kind: TaskKind,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When the task started execution.
    pub started_at: Option<DateTime<Utc>>,
    /// When the task reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    /// The work to run when the task is dispatched.
    pub executor: Arc<dyn Executor>,
    /// Caller-supplied context values, passed through untouched.
    pub context: HashMap<String, Value>,
    /// Opaque result, present only when status is Done.
    pub result: Option<Value>,
    /// Error message, present only when status is Error.
    pub error_message: Option<String>,
}

impl Task {
    /// Create a new queued task from a submission spec.
    pub fn new(spec: TaskSpec, executor: Arc<dyn Executor>) -> Self {
        Self {
            id: TaskId::new(),
            name: spec.name,
            priority: spec.priority,
            kind: spec.kind,
            status: TaskStatus::Queued,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            executor,
            context: spec.context,
            result: None,
            error_message: None,
        }
    }

    /// Transition Queued -> Running, recording the start time.
    ///
    /// Returns false (and leaves the task unchanged) if the task is not Queued.
    pub fn start(&mut self) -> bool {
        if self.status != TaskStatus::Queued {
            return false;
        }
        self.status = TaskStatus::Running;
        self.started_at = Some(Utc::now());
        true
    }

    /// Transition Running -> Done, storing the executor's result.
    pub fn complete(&mut self, result: Value) -> bool {
        if self.status != TaskStatus::Running {
            return false;
        }
        self.status = TaskStatus::Done;
        self.result = Some(result);
        self.completed_at = Some(Utc::now());
        true
    }

    /// Transition Running -> Error, storing the failure message.
    pub fn fail(&mut self, message: &str) -> bool {
        if self.status != TaskStatus::Running {
            return false;
        }
        self.status = TaskStatus::Error;
        self.error_message = Some(message.to_string());
        self.completed_at = Some(Utc::now());
        true
    }

    /// Transition Queued or Running -> Cancelled.
    pub fn cancel(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Cancelled;
        self.completed_at = Some(Utc::now());
        true
    }

    /// Check if the task is in a terminal state.
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// Serializable read view of this task.
    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            id: self.id,
            name: self.name.clone(),
            status: self.status,
            priority: self.priority,
            kind: self.kind,
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            error_message: self.error_message.clone(),
            context: self.context.clone(),
            has_result: self.result.is_some(),
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("kind", &self.kind)
            .field("status", &self.status)
            .finish()
    }
}

/// Read-only snapshot of a task, returned by all status queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub name: String,
    pub status: TaskStatus,
    pub priority: i64,
    pub kind: TaskKind,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub context: HashMap<String, Value>,
    pub has_result: bool,
}
