//! Top-level optimization flow: validate, optimize, report, export.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::core::task::TaskSpec;
use crate::error::{Error, Result};
use crate::graph::{GraphValidator, TaskGraph, ValidationReport};
use crate::optimizer::pipeline::{OptimizationPipeline, PassStats};

/// Aggregate measurements of a graph, captured before and after
/// optimization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub total_estimated_duration: f64,
    pub total_estimated_cost: f64,
    /// Mean per-level width divided by total node count. Higher means more
    /// of the graph can run concurrently.
    pub parallelization_score: f64,
}

impl GraphStats {
    fn capture(graph: &TaskGraph) -> Result<Self> {
        let levels = graph.execution_order()?;
        let score = if graph.is_empty() {
            0.0
        } else {
            let mean_width = graph.node_count() as f64 / levels.len() as f64;
            mean_width / graph.node_count() as f64
        };
        Ok(Self {
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            total_estimated_duration: graph.total_estimated_duration(),
            total_estimated_cost: graph.total_estimated_cost(),
            parallelization_score: score,
        })
    }
}

/// Summary of one optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub before: GraphStats,
    pub after: GraphStats,
    pub passes: Vec<PassStats>,
    /// Validation warnings carried over from the pre-optimization check.
    pub warnings: Vec<String>,
}

impl OptimizationReport {
    pub fn total_changes(&self) -> usize {
        self.passes.iter().map(|p| p.changes).sum()
    }

    pub fn nodes_removed(&self) -> usize {
        self.before.node_count.saturating_sub(self.after.node_count)
    }
}

/// Coordinates validation, the pass pipeline, and export to the
/// orchestrator's submission format.
pub struct OptimizerManager {
    validator: GraphValidator,
    pipeline: OptimizationPipeline,
    skip_validation: bool,
}

impl OptimizerManager {
    pub fn new() -> Self {
        Self {
            validator: GraphValidator::new(),
            pipeline: OptimizationPipeline::new(),
            skip_validation: false,
        }
    }

    pub fn with_pipeline(mut self, pipeline: OptimizationPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Disable the validation gate in front of `optimize`.
    pub fn skip_validation(mut self) -> Self {
        self.skip_validation = true;
        self
    }

    /// Validate, run the pipeline on a clone, and report.
    ///
    /// # Errors
    /// Returns `Error::Validation` when the input graph fails validation
    /// and validation has not been skipped.
    pub fn optimize(&self, graph: &TaskGraph) -> Result<(TaskGraph, OptimizationReport)> {
        let mut warnings = Vec::new();
        if !self.skip_validation {
            let report = self.validator.validate(graph);
            if !report.is_valid() {
                return Err(Error::Validation(report.errors.join("; ")));
            }
            for warning in &report.warnings {
                warn!(%warning, "graph validation warning");
            }
            warnings = report.warnings;
        }

        let before = GraphStats::capture(graph)?;
        let (optimized, passes) = self.pipeline.apply_all(graph)?;
        let after = GraphStats::capture(&optimized)?;

        let report = OptimizationReport {
            before,
            after,
            passes,
            warnings,
        };
        info!(
            nodes_before = report.before.node_count,
            nodes_after = report.after.node_count,
            changes = report.total_changes(),
            "graph optimization complete"
        );
        Ok((optimized, report))
    }

    /// Run the validator without optimizing. Never fails; structural
    /// problems come back inside the report.
    pub fn validate_only(&self, graph: &TaskGraph) -> ValidationReport {
        self.validator.validate(graph)
    }

    /// Flatten a graph into submission specs in execution order.
    ///
    /// Each spec carries the originating node id under the `node_id`
    /// context key, plus the node's metadata, so results can be traced back
    /// to the plan. Level order is preserved: every spec from level N
    /// precedes every spec from level N+1.
    pub fn export(&self, graph: &TaskGraph) -> Result<Vec<TaskSpec>> {
        let levels = graph.execution_order()?;
        let mut specs = Vec::with_capacity(graph.node_count());

        for level in levels {
            for id in level {
                let node = graph.get_node(&id).expect("id came from the order");
                let mut spec = TaskSpec::new(&node.name)
                    .with_priority(node.priority)
                    .with_kind(node.kind)
                    .with_context("node_id", json!(node.id));
                for (key, value) in &node.metadata {
                    spec.context.insert(key.clone(), value.clone());
                }
                specs.push(spec);
            }
        }
        Ok(specs)
    }
}

impl Default for OptimizerManager {
    fn default() -> Self {
        Self::new()
    }
}
