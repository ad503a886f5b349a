//! Compiled task graph: immutable, supports run only.
//!
//! Built by `TaskGraph::compile`. The run visits vertices in the fixed
//! topological order; synchronous vertices are awaited inline, asynchronous
//! vertices are spawned and stored as pending slots immediately — the
//! traversal loop itself never blocks on a deferred result. Consumers await
//! their predecessor's slot inside their own bodies when they need the value.

use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tracing::debug;

use crate::error::WorkflowError;

use super::slot::Slot;
use super::vertex::{Vertex, VertexKind};

/// Immutable runnable graph produced by `TaskGraph::compile`.
///
/// Holds the vertex map, the fixed execution order, and each vertex's
/// predecessor list (in edge-insertion order). Cheap to clone is not a goal;
/// one workflow instance owns exactly one of these.
pub struct CompiledTaskGraph {
    vertices: HashMap<String, Arc<dyn Vertex>>,
    order: Vec<String>,
    predecessors: HashMap<String, Vec<String>>,
}

/// Per-run result slots, keyed by vertex id.
///
/// Each slot was written exactly once during the run. `resolve` is the
/// explicit await operation for callers that need a final value.
#[derive(Debug, Default)]
pub struct RunOutput {
    slots: HashMap<String, Slot>,
}

impl RunOutput {
    /// The stored slot for a vertex, if it was delivered during the run.
    pub fn slot(&self, id: &str) -> Option<Slot> {
        self.slots.get(id).cloned()
    }

    /// Awaits and returns the vertex's value; fails when the vertex delivered
    /// nothing or its pending computation failed.
    pub async fn resolve(&self, id: &str) -> Result<Value, WorkflowError> {
        match self.slot(id) {
            Some(slot) => slot.resolve().await,
            None => Err(WorkflowError::ExecutionFailed(format!(
                "no result slot for vertex {}",
                id
            ))),
        }
    }
}

impl CompiledTaskGraph {
    pub(super) fn new(
        vertices: HashMap<String, Arc<dyn Vertex>>,
        order: Vec<String>,
        predecessors: HashMap<String, Vec<String>>,
    ) -> Self {
        Self {
            vertices,
            order,
            predecessors,
        }
    }

    /// The fixed execution order (topological, insertion tie-break).
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Runs the graph once with fresh result slots.
    ///
    /// For each vertex in order: the argument is its sole predecessor's slot
    /// (pending slots are passed through un-awaited), or nothing for zero
    /// predecessors. With two or more predecessors the edges only order
    /// execution and no argument is supplied. A vertex error aborts the run
    /// and vertices not yet visited never run; slots delivered before the
    /// failure are dropped with the run, though already-spawned deferred
    /// work keeps running to completion.
    pub async fn run(&self) -> Result<RunOutput, WorkflowError> {
        let mut slots: HashMap<String, Slot> = HashMap::with_capacity(self.order.len());
        debug!(vertices = self.order.len(), "task graph run start");

        for id in &self.order {
            let vertex = self
                .vertices
                .get(id)
                .expect("compiled graph has all vertices")
                .clone();
            let input = match self.predecessors.get(id) {
                Some(preds) if preds.len() == 1 => slots.get(&preds[0]).cloned(),
                _ => None,
            };
            debug!(vertex = %id, kind = ?vertex.kind(), "vertex invoke");

            let slot = match vertex.kind() {
                VertexKind::Sync => {
                    let value = vertex.run(input).await?;
                    Slot::Ready(value)
                }
                VertexKind::Async => {
                    let handle = tokio::spawn(async move { vertex.run(input).await });
                    let pending = async move {
                        match handle.await {
                            Ok(Ok(value)) => Ok(value),
                            Ok(Err(e)) => Err(e.to_string()),
                            Err(join) => Err(format!("async vertex panicked: {}", join)),
                        }
                    }
                    .boxed()
                    .shared();
                    Slot::Pending(pending)
                }
            };

            // Single assignment: ids are unique by construction, so the slot
            // for this vertex cannot already exist in this run.
            let previous = slots.insert(id.clone(), slot);
            debug_assert!(previous.is_none(), "result slot written twice: {}", id);
        }

        debug!("task graph run complete");
        Ok(RunOutput { slots })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::graph::{FnVertex, TaskGraph};

    fn append_vertex(
        id: &'static str,
        suffix: &'static str,
        kind: VertexKind,
        trace: Arc<Mutex<Vec<&'static str>>>,
    ) -> Arc<FnVertex> {
        Arc::new(FnVertex::new(id, kind, move |input| {
            let trace = trace.clone();
            async move {
                trace.lock().unwrap().push(id);
                let base = match input {
                    Some(slot) => slot.resolve().await?,
                    None => Value::String(String::new()),
                };
                let mut text = base.as_str().unwrap_or_default().to_string();
                if !text.is_empty() {
                    text.push('-');
                }
                text.push_str(suffix);
                Ok(Value::String(text))
            }
        }))
    }

    /// **Scenario**: A -> B -> C (A produces "x", B appends "-y", C appends "-z")
    /// runs in order A, B, C and yields "x-y-z".
    #[tokio::test]
    async fn run_linear_chain_in_topological_order() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let mut graph = TaskGraph::new();
        graph
            .add_vertex(append_vertex("a", "x", VertexKind::Sync, trace.clone()))
            .unwrap();
        graph
            .add_vertex(append_vertex("b", "y", VertexKind::Sync, trace.clone()))
            .unwrap();
        graph
            .add_vertex(append_vertex("c", "z", VertexKind::Sync, trace.clone()))
            .unwrap();
        graph.add_edge("a", "b").unwrap();
        graph.add_edge("b", "c").unwrap();

        let output = graph.compile().unwrap().run().await.unwrap();
        assert_eq!(*trace.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(
            output.resolve("c").await.unwrap(),
            Value::String("x-y-z".into())
        );
    }

    /// **Scenario**: An async producer's consumer receives a Pending slot and
    /// resolves it in its own body; the traversal completes without the
    /// executor awaiting the producer.
    #[tokio::test]
    async fn run_defers_async_vertex_and_consumer_awaits() {
        let mut graph = TaskGraph::new();
        graph
            .add_vertex(Arc::new(FnVertex::new(
                "fetch",
                VertexKind::Async,
                |_| async {
                    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                    Ok(Value::String("payload".into()))
                },
            )))
            .unwrap();
        graph
            .add_vertex(Arc::new(FnVertex::new(
                "consume",
                VertexKind::Async,
                |input| async move {
                    let slot = input.expect("consumer has one predecessor");
                    assert!(!slot.is_ready(), "producer slot should be pending");
                    let value = slot.resolve().await?;
                    Ok(Value::String(format!("got {}", value.as_str().unwrap())))
                },
            )))
            .unwrap();
        graph.add_edge("fetch", "consume").unwrap();

        let output = graph.compile().unwrap().run().await.unwrap();
        assert_eq!(
            output.resolve("consume").await.unwrap(),
            Value::String("got payload".into())
        );
    }

    /// **Scenario**: A failing sync vertex aborts the run; the successor is
    /// never invoked and the error carries the vertex's message.
    #[tokio::test]
    async fn run_aborts_on_vertex_failure() {
        let visited = Arc::new(AtomicUsize::new(0));
        let visited_after = visited.clone();
        let mut graph = TaskGraph::new();
        graph
            .add_vertex(Arc::new(FnVertex::new("boom", VertexKind::Sync, |_| async {
                Err(WorkflowError::ExecutionFailed("boom".into()))
            })))
            .unwrap();
        graph
            .add_vertex(Arc::new(FnVertex::new(
                "after",
                VertexKind::Sync,
                move |_| {
                    let visited = visited_after.clone();
                    async move {
                        visited.fetch_add(1, Ordering::SeqCst);
                        Ok(Value::Null)
                    }
                },
            )))
            .unwrap();
        graph.add_edge("boom", "after").unwrap();

        let result = graph.compile().unwrap().run().await;
        match result {
            Err(WorkflowError::ExecutionFailed(msg)) => assert!(msg.contains("boom"), "{}", msg),
            other => panic!("expected ExecutionFailed, got {:?}", other.map(|_| ())),
        }
        assert_eq!(visited.load(Ordering::SeqCst), 0, "successor must not run");
    }

    /// **Scenario**: Running the same compiled graph twice uses fresh slots;
    /// results do not leak between runs.
    #[tokio::test]
    async fn run_twice_does_not_reuse_slots() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_v = counter.clone();
        let mut graph = TaskGraph::new();
        graph
            .add_vertex(Arc::new(FnVertex::new(
                "count",
                VertexKind::Sync,
                move |_| {
                    let counter = counter_v.clone();
                    async move { Ok(Value::from(counter.fetch_add(1, Ordering::SeqCst) + 1)) }
                },
            )))
            .unwrap();
        let compiled = graph.compile().unwrap();

        let first = compiled.run().await.unwrap();
        let second = compiled.run().await.unwrap();
        assert_eq!(first.resolve("count").await.unwrap(), Value::from(1));
        assert_eq!(second.resolve("count").await.unwrap(), Value::from(2));
    }

    /// **Scenario**: A vertex with two predecessors is ordered after both but
    /// invoked with no argument.
    #[tokio::test]
    async fn run_two_predecessors_supply_no_argument() {
        let mut graph = TaskGraph::new();
        graph
            .add_vertex(Arc::new(FnVertex::new("left", VertexKind::Sync, |_| async {
                Ok(Value::from(1))
            })))
            .unwrap();
        graph
            .add_vertex(Arc::new(FnVertex::new("right", VertexKind::Sync, |_| async {
                Ok(Value::from(2))
            })))
            .unwrap();
        graph
            .add_vertex(Arc::new(FnVertex::new(
                "join",
                VertexKind::Sync,
                |input| async move {
                    assert!(input.is_none(), "2+ predecessors order only");
                    Ok(Value::Null)
                },
            )))
            .unwrap();
        graph.add_edge("left", "join").unwrap();
        graph.add_edge("right", "join").unwrap();

        let output = graph.compile().unwrap().run().await.unwrap();
        assert!(output.slot("join").is_some());
    }

    /// **Scenario**: resolve() on an id with no slot fails with ExecutionFailed.
    #[tokio::test]
    async fn resolve_unknown_vertex_fails() {
        let output = RunOutput::default();
        let err = output.resolve("ghost").await.unwrap_err();
        assert!(err.to_string().contains("ghost"), "{}", err);
    }
}
