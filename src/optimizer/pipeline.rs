//! Pass ordering and per-pass statistics.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::graph::TaskGraph;
use crate::optimizer::passes::{
    CostBasedSorting, DagReordering, OptimizationPass, RedundancyElimination, ShortCircuiting,
    TaskBatching,
};

/// Change count reported by one pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassStats {
    pub name: String,
    pub changes: usize,
}

/// Runs the optimization passes in a fixed order on a clone of the input.
///
/// The default pipeline applies, in order: DAG reordering, redundancy
/// elimination, task batching, short-circuiting, and cost-based sorting.
pub struct OptimizationPipeline {
    passes: Vec<Box<dyn OptimizationPass>>,
}

impl OptimizationPipeline {
    pub fn new() -> Self {
        Self {
            passes: vec![
                Box::new(DagReordering),
                Box::new(RedundancyElimination),
                Box::new(TaskBatching),
                Box::new(ShortCircuiting),
                Box::new(CostBasedSorting),
            ],
        }
    }

    /// Build a pipeline with a custom pass list.
    pub fn with_passes(passes: Vec<Box<dyn OptimizationPass>>) -> Self {
        Self { passes }
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Apply every pass in sequence to one clone of `graph`.
    ///
    /// The caller's graph is never modified.
    pub fn apply_all(&self, graph: &TaskGraph) -> Result<(TaskGraph, Vec<PassStats>)> {
        let mut optimized = graph.clone();
        let mut stats = Vec::with_capacity(self.passes.len());

        for pass in &self.passes {
            let changes = pass.apply(&mut optimized)?;
            debug!(pass = pass.name(), changes, "optimization pass applied");
            stats.push(PassStats {
                name: pass.name().to_string(),
                changes,
            });
        }
        Ok((optimized, stats))
    }
}

impl Default for OptimizationPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Node;

    fn sample() -> TaskGraph {
        let mut graph = TaskGraph::new();
        graph.add_node(Node::new("a", "load").with_duration(2.0));
        graph.add_node(Node::new("b", "transform").with_duration(5.0));
        graph.add_node(Node::new("c", "transform").with_duration(5.0));
        graph.add_edge("a", "b").unwrap();
        graph.add_edge("a", "c").unwrap();
        graph
    }

    #[test]
    fn test_default_pipeline_order() {
        let pipeline = OptimizationPipeline::new();
        assert_eq!(
            pipeline.pass_names(),
            vec![
                "dag_reordering",
                "redundancy_elimination",
                "task_batching",
                "short_circuiting",
                "cost_based_sorting",
            ]
        );
    }

    #[test]
    fn test_apply_all_leaves_input_untouched() {
        let graph = sample();
        let pipeline = OptimizationPipeline::new();
        let (optimized, stats) = pipeline.apply_all(&graph).unwrap();

        assert_eq!(stats.len(), 5);
        assert_eq!(graph.get_node("a").unwrap().priority, 5);
        // The duplicate transform nodes get merged in the optimized copy.
        assert_eq!(graph.node_count(), 3);
        assert_eq!(optimized.node_count(), 2);
    }

    #[test]
    fn test_custom_pass_list() {
        let pipeline = OptimizationPipeline::with_passes(vec![Box::new(
            crate::optimizer::passes::DagReordering,
        )]);
        let (optimized, stats) = pipeline.apply_all(&sample()).unwrap();

        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].name, "dag_reordering");
        assert!(stats[0].changes > 0);
        assert_eq!(optimized.node_count(), 3);
    }
}
