//! Node data model for the planning graph.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

use crate::core::task::TaskKind;

/// A planned unit of work inside a [`TaskGraph`](crate::graph::TaskGraph).
///
/// Dependency and dependent id sets are kept symmetric by the graph's edge
/// operations. Cost estimates feed the optimizer's reordering and
/// cost-based passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub kind: TaskKind,
    /// Ids of nodes that must complete before this one.
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
    /// Ids of nodes that wait on this one.
    #[serde(default)]
    pub dependents: BTreeSet<String>,
    /// Scheduling priority; rewritten by the optimizer.
    pub priority: i64,
    /// Estimated duration in seconds.
    pub estimated_duration: f64,
    /// Estimated monetary cost.
    pub estimated_cost: f64,
    /// Expected CPU load in [0, 1].
    pub cpu_load: f64,
    /// Estimated memory footprint in megabytes.
    pub memory_mb: f64,
    pub cacheable: bool,
    pub cache_key: Option<String>,
    pub executed: bool,
    /// Whether running this node has observable effects beyond its result.
    pub side_effects: bool,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Node {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: TaskKind::Generic,
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
            priority: 5,
            estimated_duration: 0.0,
            estimated_cost: 0.0,
            cpu_load: 0.0,
            memory_mb: 0.0,
            cacheable: false,
            cache_key: None,
            executed: false,
            side_effects: false,
            metadata: HashMap::new(),
        }
    }

    pub fn with_kind(mut self, kind: TaskKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.estimated_duration = seconds;
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.estimated_cost = cost;
        self
    }

    pub fn with_cpu_load(mut self, cpu_load: f64) -> Self {
        self.cpu_load = cpu_load;
        self
    }

    pub fn with_memory_mb(mut self, memory_mb: f64) -> Self {
        self.memory_mb = memory_mb;
        self
    }

    pub fn with_cache_key(mut self, key: &str) -> Self {
        self.cacheable = true;
        self.cache_key = Some(key.to_string());
        self
    }

    pub fn with_side_effects(mut self) -> Self {
        self.side_effects = true;
        self
    }

    pub fn mark_executed(&mut self) {
        self.executed = true;
    }

    /// Weighted scheduling cost used by the cost-based sorting pass:
    /// duration + 10 * monetary cost + 5 * cpu load + memory / 1000.
    pub fn weighted_cost(&self) -> f64 {
        self.estimated_duration
            + 10.0 * self.estimated_cost
            + 5.0 * self.cpu_load
            + self.memory_mb / 1000.0
    }

    /// A node with neither dependencies nor dependents.
    pub fn is_orphan(&self) -> bool {
        self.dependencies.is_empty() && self.dependents.is_empty()
    }
}
