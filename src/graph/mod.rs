//! Planning graph: nodes, the DAG structure, and validation.

#[allow(clippy::module_inception)]
mod graph;
mod node;
mod validator;

pub use graph::TaskGraph;
pub use node::Node;
pub use validator::{GraphValidator, ValidationReport, ValidationStats};
