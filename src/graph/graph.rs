//! The planning DAG: an arena of nodes keyed by id.
//!
//! The structure itself permits intermediate invalid states during
//! construction; acyclicity is enforced by the validator, and surfaces
//! operationally in `execution_order()` when no progress can be made.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::{Error, Result};
use crate::graph::node::Node;

/// A dependency graph of planned work.
///
/// Owns a node-id -> [`Node`] map plus incrementally maintained root and
/// leaf id sets. `clone()` is a full structural copy — the optimizer always
/// works on a clone, never the caller's graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskGraph {
    nodes: HashMap<String, Node>,
    roots: BTreeSet<String>,
    leaves: BTreeSet<String>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, replacing any previous node with the same id.
    ///
    /// Root/leaf membership reflects the node's current (possibly still
    /// empty) dependency and dependent sets.
    pub fn add_node(&mut self, node: Node) {
        let id = node.id.clone();
        self.nodes.insert(id.clone(), node);
        self.refresh_boundary(&id);
    }

    /// Add an edge: `from` must complete before `to`.
    ///
    /// # Errors
    /// Returns `Error::Validation` if either id is absent.
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<()> {
        if !self.nodes.contains_key(from) {
            return Err(Error::Validation(format!(
                "node {} not found in graph",
                from
            )));
        }
        if !self.nodes.contains_key(to) {
            return Err(Error::Validation(format!("node {} not found in graph", to)));
        }
        if let Some(node) = self.nodes.get_mut(to) {
            node.dependencies.insert(from.to_string());
        }
        if let Some(node) = self.nodes.get_mut(from) {
            node.dependents.insert(to.to_string());
        }
        self.refresh_boundary(from);
        self.refresh_boundary(to);
        Ok(())
    }

    /// Remove a node, detaching it from all neighbors.
    pub fn remove_node(&mut self, id: &str) -> Option<Node> {
        let node = self.nodes.remove(id)?;
        for dep in &node.dependencies {
            if let Some(n) = self.nodes.get_mut(dep) {
                n.dependents.remove(id);
            }
            self.refresh_boundary(dep);
        }
        for dependent in &node.dependents {
            if let Some(n) = self.nodes.get_mut(dependent) {
                n.dependencies.remove(id);
            }
            self.refresh_boundary(dependent);
        }
        self.roots.remove(id);
        self.leaves.remove(id);
        Some(node)
    }

    /// Re-derive root/leaf membership for one node id.
    pub(crate) fn refresh_boundary(&mut self, id: &str) {
        let Some(node) = self.nodes.get(id) else {
            self.roots.remove(id);
            self.leaves.remove(id);
            return;
        };
        if node.dependencies.is_empty() {
            self.roots.insert(id.to_string());
        } else {
            self.roots.remove(id);
        }
        if node.dependents.is_empty() {
            self.leaves.insert(id.to_string());
        } else {
            self.leaves.remove(id);
        }
    }

    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges, counted from the dependency side.
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.dependencies.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All node ids in sorted order.
    pub fn node_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.nodes.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn roots(&self) -> &BTreeSet<String> {
        &self.roots
    }

    pub fn leaves(&self) -> &BTreeSet<String> {
        &self.leaves
    }

    pub fn total_estimated_duration(&self) -> f64 {
        self.nodes.values().map(|n| n.estimated_duration).sum()
    }

    pub fn total_estimated_cost(&self) -> f64 {
        self.nodes.values().map(|n| n.estimated_cost).sum()
    }

    /// Compute the level-ordered execution plan.
    ///
    /// Each level is the set of not-yet-scheduled nodes whose dependencies
    /// are all scheduled, sorted by id for determinism. Fails when no
    /// progress can be made while unscheduled nodes remain — the
    /// operational symptom of a cycle or a dangling dependency.
    pub fn execution_order(&self) -> Result<Vec<Vec<String>>> {
        let mut scheduled: HashSet<&str> = HashSet::new();
        let mut levels: Vec<Vec<String>> = Vec::new();

        while scheduled.len() < self.nodes.len() {
            let mut level: Vec<String> = self
                .nodes
                .values()
                .filter(|n| {
                    !scheduled.contains(n.id.as_str())
                        && n.dependencies.iter().all(|d| scheduled.contains(d.as_str()))
                })
                .map(|n| n.id.clone())
                .collect();
            if level.is_empty() {
                let stuck: Vec<&str> = self
                    .nodes
                    .keys()
                    .filter(|id| !scheduled.contains(id.as_str()))
                    .map(String::as_str)
                    .collect();
                return Err(Error::Validation(format!(
                    "cannot compute execution order: {} node(s) have unsatisfiable dependencies",
                    stuck.len()
                )));
            }
            level.sort();
            for id in &level {
                let node = self.nodes.get(id).expect("level ids come from the map");
                scheduled.insert(node.id.as_str());
            }
            levels.push(level);
        }
        Ok(levels)
    }

    /// Per-level greedy critical path: the node with the largest estimated
    /// duration at each level.
    ///
    /// This is an approximation, not the true longest path through the DAG;
    /// the behavior is kept for compatibility with the planning reports
    /// built on it.
    pub fn critical_path(&self) -> Result<Vec<String>> {
        let levels = self.execution_order()?;
        let mut path = Vec::with_capacity(levels.len());
        for level in levels {
            let longest = level
                .iter()
                .max_by(|a, b| {
                    let da = self.nodes[a.as_str()].estimated_duration;
                    let db = self.nodes[b.as_str()].estimated_duration;
                    // Ties resolve to the first id in sorted order.
                    da.partial_cmp(&db)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then(std::cmp::Ordering::Greater)
                })
                .expect("levels are never empty");
            path.push(longest.clone());
        }
        Ok(path)
    }
}
