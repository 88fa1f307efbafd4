//! Integration test suite for taskforge.
//!
//! These tests exercise the full flow from graph construction through
//! optimization and into concurrent execution. They verify that the
//! queue, workers, manager, and optimizer work together correctly.
//!
//! # Test Categories
//!
//! - `orchestrator`: submission, priority ordering, cancellation, lifecycle
//! - `optimizer_flow`: build, validate, optimize, export, execute

mod fixtures;

mod optimizer_flow;
mod orchestrator;
