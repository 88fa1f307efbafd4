//! Structural validation for planning graphs.
//!
//! Errors block optimization and execution; warnings are advisory and
//! surfaced in optimization reports.

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::graph::TaskGraph;

/// Aggregate counts attached to a [`ValidationReport`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub root_count: usize,
    pub leaf_count: usize,
    pub orphan_count: usize,
}

/// Outcome of a full validation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub stats: ValidationStats,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

// DFS colors for cycle detection.
#[derive(Clone, Copy, PartialEq)]
enum Mark {
    White,
    Gray,
    Black,
}

/// Validates graph structure: dangling references, cycles, and schema
/// range checks on node estimates.
#[derive(Debug, Default)]
pub struct GraphValidator;

impl GraphValidator {
    pub fn new() -> Self {
        Self
    }

    /// Run every check and collect errors and warnings.
    ///
    /// Dangling dependency references and cycles are errors. Orphan nodes
    /// and out-of-range estimates only warn.
    pub fn validate(&self, graph: &TaskGraph) -> ValidationReport {
        let mut report = ValidationReport {
            stats: ValidationStats {
                node_count: graph.node_count(),
                edge_count: graph.edge_count(),
                root_count: graph.roots().len(),
                leaf_count: graph.leaves().len(),
                orphan_count: graph.nodes().filter(|n| n.is_orphan()).count(),
            },
            ..Default::default()
        };

        self.check_references(graph, &mut report);
        // Cycle detection assumes every referenced id exists.
        if report.errors.is_empty() {
            self.check_cycles(graph, &mut report);
        }
        self.check_orphans(graph, &mut report);
        self.check_schema(graph, &mut report);
        report
    }

    /// Cheap acyclicity probe that skips the full report.
    pub fn quick_check(&self, graph: &TaskGraph) -> bool {
        let mut dg: DiGraph<&str, ()> = DiGraph::new();
        let mut indices = HashMap::new();
        for node in graph.nodes() {
            indices.insert(node.id.as_str(), dg.add_node(node.id.as_str()));
        }
        for node in graph.nodes() {
            for dep in &node.dependencies {
                if let (Some(&from), Some(&to)) =
                    (indices.get(dep.as_str()), indices.get(node.id.as_str()))
                {
                    dg.add_edge(from, to, ());
                }
            }
        }
        !is_cyclic_directed(&dg)
    }

    fn check_references(&self, graph: &TaskGraph, report: &mut ValidationReport) {
        for id in &graph.node_ids() {
            let node = graph.get_node(id).expect("id came from the graph");
            for dep in &node.dependencies {
                if !graph.contains_node(dep) {
                    report.errors.push(format!(
                        "node {} depends on {} which does not exist",
                        id, dep
                    ));
                }
            }
            for dependent in &node.dependents {
                if !graph.contains_node(dependent) {
                    report.errors.push(format!(
                        "node {} lists dependent {} which does not exist",
                        id, dependent
                    ));
                }
            }
        }
    }

    /// Three-color DFS along dependent edges; reports the first cycle found
    /// as an ordered path.
    fn check_cycles(&self, graph: &TaskGraph, report: &mut ValidationReport) {
        let ids = graph.node_ids();
        let mut marks: HashMap<&str, Mark> =
            ids.iter().map(|id| (id.as_str(), Mark::White)).collect();
        let mut stack: Vec<&str> = Vec::new();

        for id in &ids {
            if marks[id.as_str()] == Mark::White {
                if let Some(cycle) = Self::dfs(graph, id, &mut marks, &mut stack) {
                    report
                        .errors
                        .push(format!("dependency cycle detected: {}", cycle.join(" -> ")));
                    return;
                }
            }
        }
    }

    fn dfs<'a>(
        graph: &'a TaskGraph,
        id: &'a str,
        marks: &mut HashMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        marks.insert(id, Mark::Gray);
        stack.push(id);

        let node = graph.get_node(id).expect("validated references");
        for next in &node.dependents {
            match marks[next.as_str()] {
                Mark::Gray => {
                    // Found a back edge; slice the stack from the first
                    // occurrence and close the loop.
                    let start = stack
                        .iter()
                        .position(|&s| s == next.as_str())
                        .expect("gray nodes are on the stack");
                    let mut cycle: Vec<String> =
                        stack[start..].iter().map(|s| s.to_string()).collect();
                    cycle.push(next.to_string());
                    return Some(cycle);
                }
                Mark::White => {
                    let next_id = graph
                        .get_node(next)
                        .map(|n| n.id.as_str())
                        .expect("validated references");
                    if let Some(cycle) = Self::dfs(graph, next_id, marks, stack) {
                        return Some(cycle);
                    }
                }
                Mark::Black => {}
            }
        }

        stack.pop();
        marks.insert(id, Mark::Black);
        None
    }

    fn check_orphans(&self, graph: &TaskGraph, report: &mut ValidationReport) {
        if graph.node_count() < 2 {
            return;
        }
        for id in graph.node_ids() {
            let node = graph.get_node(&id).expect("id came from the graph");
            if node.is_orphan() {
                report
                    .warnings
                    .push(format!("node {} is disconnected from the graph", id));
            }
        }
    }

    fn check_schema(&self, graph: &TaskGraph, report: &mut ValidationReport) {
        for id in graph.node_ids() {
            let node = graph.get_node(&id).expect("id came from the graph");
            if !(0..=10).contains(&node.priority) {
                report.warnings.push(format!(
                    "node {} priority {} is outside the expected 0..=10 range",
                    id, node.priority
                ));
            }
            if node.estimated_duration < 0.0 {
                report
                    .warnings
                    .push(format!("node {} has a negative estimated duration", id));
            }
            if node.memory_mb < 0.0 {
                report
                    .warnings
                    .push(format!("node {} has a negative memory estimate", id));
            }
            if !(0.0..=1.0).contains(&node.cpu_load) {
                report.warnings.push(format!(
                    "node {} cpu load {} is outside [0, 1]",
                    id, node.cpu_load
                ));
            }
        }
    }
}
