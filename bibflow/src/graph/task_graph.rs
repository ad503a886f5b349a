//! Task graph builder: vertices plus "must run after" edges.
//!
//! Validation is eager: `add_edge` rejects dangling endpoints and edges that
//! would close a cycle, so a graph that builds successfully always compiles.
//! `compile()` fixes the topological order (Kahn's algorithm; ties among
//! ready vertices are broken by insertion order, which is otherwise
//! unspecified) and produces an immutable [`CompiledTaskGraph`].

use std::collections::HashMap;
use std::sync::Arc;

use super::executor::CompiledTaskGraph;
use super::graph_error::GraphError;
use super::vertex::Vertex;

/// Directed acyclic graph of work units, built once per workflow run.
///
/// Vertices are identified by their `id()`; edges `(producer, consumer)` mean
/// the consumer must not run until the producer has delivered a result.
/// Owned exclusively by one workflow instance and never mutated during a run.
pub struct TaskGraph {
    vertices: HashMap<String, Arc<dyn Vertex>>,
    /// Vertex ids in insertion order; the topological tie-break.
    insertion: Vec<String>,
    /// Edges (producer, consumer).
    edges: Vec<(String, String)>,
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self {
            vertices: HashMap::new(),
            insertion: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Adds a vertex; its id must be unique within the graph.
    pub fn add_vertex(&mut self, vertex: Arc<dyn Vertex>) -> Result<&mut Self, GraphError> {
        let id = vertex.id().to_string();
        if self.vertices.contains_key(&id) {
            return Err(GraphError::DuplicateVertex(id));
        }
        self.insertion.push(id.clone());
        self.vertices.insert(id, vertex);
        Ok(self)
    }

    /// Adds an edge: `consumer` must run after `producer`.
    ///
    /// Fails when either endpoint is unregistered or when the edge would make
    /// the graph cyclic (including self-edges).
    pub fn add_edge(
        &mut self,
        producer: impl Into<String>,
        consumer: impl Into<String>,
    ) -> Result<&mut Self, GraphError> {
        let producer = producer.into();
        let consumer = consumer.into();
        if !self.vertices.contains_key(&producer) {
            return Err(GraphError::UnknownVertex(producer));
        }
        if !self.vertices.contains_key(&consumer) {
            return Err(GraphError::UnknownVertex(consumer));
        }
        if producer == consumer || self.reaches(&consumer, &producer) {
            return Err(GraphError::CycleDetected { producer, consumer });
        }
        self.edges.push((producer, consumer));
        Ok(self)
    }

    /// True when `to` is reachable from `from` along existing edges.
    fn reaches(&self, from: &str, to: &str) -> bool {
        let mut stack = vec![from.to_string()];
        let mut seen = vec![from.to_string()];
        while let Some(current) = stack.pop() {
            for (p, c) in &self.edges {
                if *p == current {
                    if c == to {
                        return true;
                    }
                    if !seen.contains(c) {
                        seen.push(c.clone());
                        stack.push(c.clone());
                    }
                }
            }
        }
        false
    }

    /// Number of vertices currently in the graph.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// True when no vertex has been added.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Fixes the execution order and produces the immutable runnable graph.
    ///
    /// Kahn's algorithm over the declared edges; among vertices with no
    /// remaining unsatisfied dependency the earliest-inserted runs first.
    pub fn compile(self) -> Result<CompiledTaskGraph, GraphError> {
        let mut indegree: HashMap<&str, usize> =
            self.insertion.iter().map(|id| (id.as_str(), 0)).collect();
        for (_, consumer) in &self.edges {
            *indegree.entry(consumer.as_str()).or_insert(0) += 1;
        }

        let mut order: Vec<String> = Vec::with_capacity(self.insertion.len());
        let mut remaining: Vec<&str> = self.insertion.iter().map(String::as_str).collect();
        while !remaining.is_empty() {
            let pos = remaining
                .iter()
                .position(|id| indegree.get(id).copied().unwrap_or(0) == 0);
            let pos = match pos {
                Some(p) => p,
                // Unreachable for graphs built through add_edge; kept as a
                // compile-time invariant check.
                None => {
                    let (producer, consumer) = self
                        .edges
                        .last()
                        .cloned()
                        .unwrap_or_default();
                    return Err(GraphError::CycleDetected { producer, consumer });
                }
            };
            let id = remaining.remove(pos);
            for (producer, consumer) in &self.edges {
                if producer == id {
                    if let Some(d) = indegree.get_mut(consumer.as_str()) {
                        *d = d.saturating_sub(1);
                    }
                }
            }
            order.push(id.to_string());
        }

        let mut predecessors: HashMap<String, Vec<String>> = HashMap::new();
        for (producer, consumer) in &self.edges {
            predecessors
                .entry(consumer.clone())
                .or_default()
                .push(producer.clone());
        }

        Ok(CompiledTaskGraph::new(self.vertices, order, predecessors))
    }
}
