//! Shared helpers for the integration tests

#![allow(dead_code)]

use mype_core::infer::{colored_type, describe_type};
use mype_core::{Graph, NodeId};
use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Route `tracing` output through the test harness; filter with `RUST_LOG`
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}

/// Rendered concrete type of a colored node
pub fn type_of(graph: &Graph, node: NodeId) -> String {
    let ty = colored_type(graph, node)
        .unwrap_or_else(|| panic!("{node} was not colored"));
    describe_type(graph, ty)
}
