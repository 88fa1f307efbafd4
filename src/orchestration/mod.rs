//! Orchestration layer: workers, the pool, and the top-level manager.
//!
//! N independent workers share one priority queue; the manager composes the
//! queue, the pool, and the task registry behind a single submission and
//! query API. Cancellation is cooperative throughout.

mod manager;
mod worker;

pub use manager::{OrchestratorManager, QueueStatus, SystemStatus};
pub use worker::{Worker, WorkerPool, WorkerStatus};
