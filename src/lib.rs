pub mod config;
pub mod core;
pub mod error;
pub mod graph;
pub mod optimizer;
pub mod orchestration;

pub use error::{Error, Result};

pub use crate::core::queue::{PriorityTaskQueue, SharedTask};
pub use crate::core::task::{
    Executor, Task, TaskId, TaskKind, TaskSnapshot, TaskSpec, TaskStatus, DEFAULT_PRIORITY,
};
pub use graph::{GraphValidator, Node, TaskGraph, ValidationReport};
pub use optimizer::{OptimizationPipeline, OptimizationReport, OptimizerManager};
pub use orchestration::{OrchestratorManager, SystemStatus, WorkerPool};
