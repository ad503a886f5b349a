//! Graph configuration error.
//!
//! Returned by `TaskGraph::add_vertex` / `add_edge` when the graph under
//! construction would become invalid. Configuration errors are fatal at build
//! time, before any run starts.

use thiserror::Error;

/// Error while building a task graph (duplicate id, dangling edge, cycle).
///
/// `add_edge` validates eagerly: an edge referencing an unregistered vertex or
/// closing a cycle fails immediately rather than at run time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// A vertex with this id was already added; identity is the map key and
    /// must be unique for the lifetime of the graph.
    #[error("duplicate vertex id: {0}")]
    DuplicateVertex(String),

    /// An edge endpoint was not registered via `add_vertex`.
    #[error("unknown vertex in edge: {0}")]
    UnknownVertex(String),

    /// Adding the edge would make the graph cyclic.
    #[error("adding edge {producer} -> {consumer} would create a cycle")]
    CycleDetected {
        /// Edge source (producer of the result).
        producer: String,
        /// Edge target (consumer that must run after).
        consumer: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Display of CycleDetected names both edge endpoints.
    #[test]
    fn graph_error_display_cycle_detected() {
        let err = GraphError::CycleDetected {
            producer: "b".to_string(),
            consumer: "a".to_string(),
        };
        let s = err.to_string();
        assert!(s.contains("b -> a"), "Display should contain the edge: {}", s);
        assert!(s.contains("cycle"), "Display should mention cycle: {}", s);
    }

    /// **Scenario**: Display of UnknownVertex contains the vertex id.
    #[test]
    fn graph_error_display_unknown_vertex() {
        let err = GraphError::UnknownVertex("x".to_string());
        let s = err.to_string();
        assert!(s.contains("unknown vertex"), "{}", s);
        assert!(s.contains("x"), "{}", s);
    }
}
