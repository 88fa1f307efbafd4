//! Graph-rewriting passes.
//!
//! Each pass mutates a graph in place and reports how many changes it made.
//! The pipeline applies them in a fixed order to a clone of the caller's
//! graph; passes never run on the original.

use serde_json::{json, Value};
use std::collections::HashMap;

use crate::core::task::TaskKind;
use crate::error::Result;
use crate::graph::TaskGraph;

/// Priority bonus granted to nodes on the critical path.
pub const CRITICAL_PATH_BONUS: i64 = 5;

/// A single graph-rewriting step.
///
/// `apply` returns the number of changes made so the pipeline can report
/// per-pass statistics.
pub trait OptimizationPass: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, graph: &mut TaskGraph) -> Result<usize>;
}

/// Rewrites node priorities from topology: a node at level L of M levels
/// gets priority (M - 1 - L), so work that unblocks the most downstream
/// nodes is scheduled first. Critical-path nodes get an extra bonus.
#[derive(Debug, Default)]
pub struct DagReordering;

impl OptimizationPass for DagReordering {
    fn name(&self) -> &'static str {
        "dag_reordering"
    }

    fn apply(&self, graph: &mut TaskGraph) -> Result<usize> {
        let levels = graph.execution_order()?;
        if levels.is_empty() {
            return Ok(0);
        }
        let critical: Vec<String> = graph.critical_path()?;
        let max_level = (levels.len() - 1) as i64;

        let mut changes = 0;
        for (depth, level) in levels.iter().enumerate() {
            for id in level {
                let mut priority = max_level - depth as i64;
                if critical.iter().any(|c| c == id) {
                    priority += CRITICAL_PATH_BONUS;
                }
                let node = graph.get_node_mut(id).expect("id came from the order");
                if node.priority != priority {
                    node.priority = priority;
                    changes += 1;
                }
            }
        }
        Ok(changes)
    }
}

/// Removes duplicate nodes.
///
/// Two nodes are duplicates when their signature (name, kind, sorted
/// dependency ids, cacheable flag, cache key) collides. The duplicate's
/// dependents are redirected to the surviving node; survivors are chosen
/// in sorted id order so elimination is deterministic. Runs to a fixpoint
/// within one apply, so a second apply always reports zero changes.
#[derive(Debug, Default)]
pub struct RedundancyElimination;

impl RedundancyElimination {
    fn signature(graph: &TaskGraph, id: &str) -> String {
        let node = graph.get_node(id).expect("id came from the graph");
        let deps: Vec<&str> = node.dependencies.iter().map(String::as_str).collect();
        format!(
            "{}|{}|{}|{}|{}",
            node.name,
            node.kind,
            deps.join(","),
            node.cacheable,
            node.cache_key.as_deref().unwrap_or("")
        )
    }

    fn eliminate_once(graph: &mut TaskGraph) -> Result<usize> {
        let mut survivors: HashMap<String, String> = HashMap::new();
        let mut removed = 0;

        for id in graph.node_ids() {
            let sig = Self::signature(graph, &id);
            let Some(survivor) = survivors.get(&sig).cloned() else {
                survivors.insert(sig, id);
                continue;
            };
            // Redirect the duplicate's dependents before detaching it.
            let dependents: Vec<String> = graph
                .get_node(&id)
                .map(|n| n.dependents.iter().cloned().collect())
                .unwrap_or_default();
            graph.remove_node(&id);
            for dependent in dependents {
                graph.add_edge(&survivor, &dependent)?;
            }
            removed += 1;
        }
        Ok(removed)
    }
}

impl OptimizationPass for RedundancyElimination {
    fn name(&self) -> &'static str {
        "redundancy_elimination"
    }

    fn apply(&self, graph: &mut TaskGraph) -> Result<usize> {
        // Merging can make former non-duplicates collide (their dependency
        // sets now match), so iterate until stable.
        let mut total = 0;
        loop {
            let removed = Self::eliminate_once(graph)?;
            if removed == 0 {
                return Ok(total);
            }
            total += removed;
        }
    }
}

/// Tags groups of same-kind nodes within a topological level.
///
/// Groups of size >= 2 get a shared `batch_id` and a `batch_size` in their
/// metadata so a downstream executor can combine them.
#[derive(Debug, Default)]
pub struct TaskBatching;

impl OptimizationPass for TaskBatching {
    fn name(&self) -> &'static str {
        "task_batching"
    }

    fn apply(&self, graph: &mut TaskGraph) -> Result<usize> {
        let levels = graph.execution_order()?;
        let mut changes = 0;

        for (depth, level) in levels.iter().enumerate() {
            let mut by_kind: HashMap<String, Vec<&String>> = HashMap::new();
            for id in level {
                let kind = graph.get_node(id).expect("id came from the order").kind;
                by_kind.entry(kind.to_string()).or_default().push(id);
            }
            for (kind, members) in by_kind {
                if members.len() < 2 {
                    continue;
                }
                let batch_id = json!(format!("batch-{}-{}", depth, kind));
                let batch_size = json!(members.len());
                for id in members {
                    let node = graph.get_node_mut(id).expect("id came from the order");
                    node.metadata
                        .insert("batch_id".to_string(), batch_id.clone());
                    node.metadata
                        .insert("batch_size".to_string(), batch_size.clone());
                    changes += 1;
                }
            }
        }
        Ok(changes)
    }
}

/// Marks nodes whose execution can be skipped outright.
///
/// A node is skippable if it is cacheable with a cache key set, if it has
/// no dependents, no declared side effects, and is of generic kind, or if
/// it was already executed with a cacheable result.
#[derive(Debug, Default)]
pub struct ShortCircuiting;

impl OptimizationPass for ShortCircuiting {
    fn name(&self) -> &'static str {
        "short_circuiting"
    }

    fn apply(&self, graph: &mut TaskGraph) -> Result<usize> {
        let mut changes = 0;
        for id in graph.node_ids() {
            let node = graph.get_node(&id).expect("id came from the graph");
            let cached = node.cacheable && node.cache_key.is_some();
            let inert = node.dependents.is_empty()
                && !node.side_effects
                && node.kind == TaskKind::Generic;
            let replayed = node.executed && node.cacheable;
            if !(cached || inert || replayed) {
                continue;
            }
            let already = node
                .metadata
                .get("skippable")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if already {
                continue;
            }
            let node = graph.get_node_mut(&id).expect("id came from the graph");
            node.metadata.insert("skippable".to_string(), json!(true));
            changes += 1;
        }
        Ok(changes)
    }
}

/// Within each level, ranks nodes by weighted cost ascending and nudges
/// priority so cheaper nodes run first and unblock dependents sooner.
#[derive(Debug, Default)]
pub struct CostBasedSorting;

impl OptimizationPass for CostBasedSorting {
    fn name(&self) -> &'static str {
        "cost_based_sorting"
    }

    fn apply(&self, graph: &mut TaskGraph) -> Result<usize> {
        let levels = graph.execution_order()?;
        let mut changes = 0;

        for level in levels {
            if level.len() < 2 {
                continue;
            }
            let mut ranked: Vec<(String, f64)> = level
                .iter()
                .map(|id| {
                    let cost = graph
                        .get_node(id)
                        .expect("id came from the order")
                        .weighted_cost();
                    (id.clone(), cost)
                })
                .collect();
            ranked.sort_by(|a, b| a.1.total_cmp(&b.1));

            // Cheapest node gets the largest bump.
            let width = ranked.len() as i64;
            for (rank, (id, _)) in ranked.into_iter().enumerate() {
                let bump = width - 1 - rank as i64;
                if bump == 0 {
                    continue;
                }
                let node = graph.get_node_mut(&id).expect("id came from the order");
                node.priority += bump;
                changes += 1;
            }
        }
        Ok(changes)
    }
}
