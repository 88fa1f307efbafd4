//! Full pipeline flow: build a graph, validate it, optimize it, export
//! the plan, and run it through the orchestrator.

use std::sync::Arc;

use taskforge::{
    Node, OptimizerManager, TaskGraph, TaskKind, TaskStatus,
};

use crate::fixtures::{manager_with_workers, wait_for_status, RecordingExecutor};

/// A small ETL-shaped plan with a pair of redundant extract nodes.
fn etl_graph() -> TaskGraph {
    let mut graph = TaskGraph::new();
    graph.add_node(
        Node::new("fetch", "fetch-dataset")
            .with_kind(TaskKind::Network)
            .with_duration(5.0),
    );
    graph.add_node(
        Node::new("extract-1", "extract")
            .with_kind(TaskKind::Data)
            .with_duration(2.0),
    );
    graph.add_node(
        Node::new("extract-2", "extract")
            .with_kind(TaskKind::Data)
            .with_duration(2.0),
    );
    graph.add_node(
        Node::new("train", "train-model")
            .with_kind(TaskKind::Model)
            .with_duration(60.0)
            .with_cpu_load(0.9),
    );
    graph.add_node(
        Node::new("report", "build-report")
            .with_kind(TaskKind::Compute)
            .with_duration(1.0),
    );
    graph.add_edge("fetch", "extract-1").unwrap();
    graph.add_edge("fetch", "extract-2").unwrap();
    graph.add_edge("extract-1", "train").unwrap();
    graph.add_edge("extract-2", "train").unwrap();
    graph.add_edge("train", "report").unwrap();
    graph
}

#[tokio::test]
async fn test_validate_optimize_export_execute() {
    let optimizer = OptimizerManager::new();
    let graph = etl_graph();

    let report = optimizer.validate_only(&graph);
    assert!(report.is_valid());

    let (optimized, report) = optimizer.optimize(&graph).unwrap();
    // The duplicate extract nodes collapse into one.
    assert_eq!(report.before.node_count, 5);
    assert_eq!(report.after.node_count, 4);
    assert!(optimizer.validate_only(&optimized).is_valid());

    let specs = optimizer.export(&optimized).unwrap();
    assert_eq!(specs.len(), 4);
    for spec in &specs {
        assert!(spec.node_id().is_some());
    }

    // Feed the plan into the orchestrator and run it to completion.
    let manager = manager_with_workers(2);
    manager.start().await;

    let recorder = RecordingExecutor::new();
    let log = recorder.log();
    let recorder = Arc::new(recorder);

    let mut ids = Vec::new();
    for spec in specs {
        let id = manager
            .submit_task(spec, Arc::clone(&recorder) as Arc<dyn taskforge::Executor>)
            .await
            .unwrap();
        ids.push(id);
    }
    for id in &ids {
        wait_for_status(&manager, id, TaskStatus::Done).await;
    }

    assert_eq!(log.lock().unwrap().len(), 4);
    manager.stop().await;
}

#[tokio::test]
async fn test_cyclic_graph_never_reaches_the_orchestrator() {
    let mut graph = etl_graph();
    graph.add_edge("report", "fetch").unwrap();

    let optimizer = OptimizerManager::new();
    let err = optimizer.optimize(&graph).unwrap_err();
    assert!(err.to_string().contains("cycle"));

    // validate_only reports the same problem without failing.
    let report = optimizer.validate_only(&graph);
    assert!(!report.is_valid());
    assert!(report.errors[0].contains("fetch"));
}

#[tokio::test]
async fn test_exported_priorities_follow_levels() {
    let optimizer = OptimizerManager::new();
    let (optimized, _) = optimizer.optimize(&etl_graph()).unwrap();
    let specs = optimizer.export(&optimized).unwrap();

    // Earlier levels come out with priorities at least as high as later
    // ones, so a drained queue replays the plan in a valid order.
    let fetch = specs.iter().find(|s| s.node_id() == Some("fetch")).unwrap();
    let report = specs.iter().find(|s| s.node_id() == Some("report")).unwrap();
    assert!(fetch.priority > report.priority);
}

#[tokio::test]
async fn test_optimized_graph_keeps_dependency_semantics() {
    let optimizer = OptimizerManager::new();
    let (optimized, _) = optimizer.optimize(&etl_graph()).unwrap();

    let levels = optimized.execution_order().unwrap();
    let level_of = |id: &str| {
        levels
            .iter()
            .position(|l| l.iter().any(|n| n == id))
            .unwrap()
    };
    assert!(level_of("fetch") < level_of("train"));
    assert!(level_of("train") < level_of("report"));
}
