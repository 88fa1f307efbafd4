//! Graph optimization: rewriting passes, the pipeline, and the manager
//! that ties validation, optimization, and export together.

mod manager;
pub mod passes;
mod pipeline;

pub use manager::{GraphStats, OptimizationReport, OptimizerManager};
pub use passes::{
    CostBasedSorting, DagReordering, OptimizationPass, RedundancyElimination, ShortCircuiting,
    TaskBatching, CRITICAL_PATH_BONUS,
};
pub use pipeline::{OptimizationPipeline, PassStats};
