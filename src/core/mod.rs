//! Core task model and scheduling primitives.

pub mod queue;
pub mod task;

pub use queue::{PriorityTaskQueue, SharedTask};
pub use task::{Executor, Task, TaskId, TaskKind, TaskSnapshot, TaskSpec, TaskStatus};
