//! Graph vertex trait: one unit of work in a TaskGraph.
//!
//! Receives the sole predecessor's [`Slot`] (or nothing) and returns a JSON
//! value. Whether the executor awaits the vertex inline or defers it is an
//! explicit declaration ([`VertexKind`]), not inferred at call time.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

use crate::error::WorkflowError;

use super::Slot;

/// Execution mode declared at graph-construction time.
///
/// `Sync` vertices are awaited inline by the executor and deliver
/// `Slot::Ready`; `Async` vertices are spawned and deliver `Slot::Pending`
/// immediately, the traversal moving on without blocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexKind {
    /// Result is delivered before the executor visits the next vertex.
    Sync,
    /// Result is deferred; consumers await the pending computation themselves.
    Async,
}

/// One unit of work in a task graph.
///
/// The input is the predecessor's stored slot when the vertex has exactly one
/// predecessor — possibly still pending; the vertex body awaits it when it
/// needs the value. Identity (`id`) is the map key for the vertex's result
/// slot and must be unique within a graph.
///
/// **Interaction**: Registered via `TaskGraph::add_vertex`; invoked by
/// `CompiledTaskGraph::run` in dependency order.
#[async_trait]
pub trait Vertex: Send + Sync {
    /// Vertex id (e.g. `"chat"`, `"dispatch"`). Must be unique within a graph.
    fn id(&self) -> &str;

    /// Declared execution mode; controls deferral, see [`VertexKind`].
    fn kind(&self) -> VertexKind;

    /// Runs the unit of work with the optional predecessor slot.
    async fn run(&self, input: Option<Slot>) -> Result<Value, WorkflowError>;
}

type VertexFn =
    Arc<dyn Fn(Option<Slot>) -> BoxFuture<'static, Result<Value, WorkflowError>> + Send + Sync>;

/// Closure-backed vertex, the usual way workflows assemble their graphs.
///
/// ```rust
/// use bibflow::graph::{FnVertex, Vertex, VertexKind};
/// use serde_json::Value;
///
/// let seed = FnVertex::new("seed", VertexKind::Sync, |_input| async {
///     Ok(Value::String("initial prompt".into()))
/// });
/// assert_eq!(seed.id(), "seed");
/// ```
pub struct FnVertex {
    id: String,
    kind: VertexKind,
    body: VertexFn,
}

impl FnVertex {
    /// Wraps an async closure as a vertex with the given id and kind.
    pub fn new<F, Fut>(id: impl Into<String>, kind: VertexKind, body: F) -> Self
    where
        F: Fn(Option<Slot>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Value, WorkflowError>> + Send + 'static,
    {
        Self {
            id: id.into(),
            kind,
            body: Arc::new(move |input| body(input).boxed()),
        }
    }
}

#[async_trait]
impl Vertex for FnVertex {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> VertexKind {
        self.kind
    }

    async fn run(&self, input: Option<Slot>) -> Result<Value, WorkflowError> {
        (self.body)(input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: An FnVertex runs its closure with the provided input slot.
    #[tokio::test]
    async fn fn_vertex_runs_closure_with_input() {
        let v = FnVertex::new("append", VertexKind::Sync, |input| async move {
            let prefix = match input {
                Some(slot) => slot.resolve().await?,
                None => Value::String(String::new()),
            };
            let text = prefix.as_str().unwrap_or_default();
            Ok(Value::String(format!("{}-y", text)))
        });
        assert_eq!(Vertex::id(&v), "append");
        assert_eq!(v.kind(), VertexKind::Sync);
        let out = v
            .run(Some(Slot::Ready(Value::String("x".into()))))
            .await
            .unwrap();
        assert_eq!(out, Value::String("x-y".into()));
    }

    /// **Scenario**: A vertex with no predecessor is invoked with None.
    #[tokio::test]
    async fn fn_vertex_runs_without_input() {
        let v = FnVertex::new("seed", VertexKind::Sync, |input| async move {
            assert!(input.is_none());
            Ok(Value::from(1))
        });
        assert_eq!(v.run(None).await.unwrap(), Value::from(1));
    }
}
