//! Per-vertex result storage: a resolved value or a pending computation.
//!
//! A synchronous vertex delivers `Slot::Ready`; an asynchronous vertex is
//! deferred by the executor and delivers `Slot::Pending` — a shared handle
//! every successor can await. Awaiting is explicit via [`Slot::resolve`]; the
//! executor itself never blocks on a pending slot.

use std::fmt;

use futures::future::Shared;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::WorkflowError;

/// Shared handle to a deferred vertex result.
///
/// Cloneable so that a producer with several consumers hands each of them the
/// same computation; the underlying future runs once and the result is shared.
/// The error side is a plain string because `Shared` requires `Clone` output.
pub type PendingValue = Shared<BoxFuture<'static, Result<Value, String>>>;

/// Result slot for one vertex in one run: `Ready(value)` or `Pending(handle)`.
///
/// Written exactly once per vertex per run by the executor; read (cloned) by
/// every successor. A consumer that needs the value calls [`Slot::resolve`];
/// passing a `Pending` slot onward without awaiting it is the normal way to
/// thread a still-running network call through the graph.
#[derive(Clone)]
pub enum Slot {
    /// An immediate value from a synchronous vertex.
    Ready(Value),
    /// A deferred computation from an asynchronous vertex, not yet awaited.
    Pending(PendingValue),
}

impl Slot {
    /// Awaits the slot's value: returns immediately for `Ready`, awaits the
    /// shared computation for `Pending`.
    pub async fn resolve(self) -> Result<Value, WorkflowError> {
        match self {
            Slot::Ready(value) => Ok(value),
            Slot::Pending(handle) => handle.await.map_err(WorkflowError::ExecutionFailed),
        }
    }

    /// True when the slot already holds a resolved value.
    pub fn is_ready(&self) -> bool {
        matches!(self, Slot::Ready(_))
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Slot::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    /// **Scenario**: Resolving a Ready slot returns the stored value without awaiting anything.
    #[tokio::test]
    async fn resolve_ready_returns_value() {
        let slot = Slot::Ready(Value::String("x".into()));
        assert!(slot.is_ready());
        let value = slot.resolve().await.unwrap();
        assert_eq!(value, Value::String("x".into()));
    }

    /// **Scenario**: Two clones of a Pending slot both resolve to the same value.
    #[tokio::test]
    async fn pending_slot_clones_share_one_computation() {
        let fut = async { Ok(Value::from(7)) }.boxed().shared();
        let slot = Slot::Pending(fut);
        assert!(!slot.is_ready());
        let a = slot.clone().resolve().await.unwrap();
        let b = slot.resolve().await.unwrap();
        assert_eq!(a, Value::from(7));
        assert_eq!(b, Value::from(7));
    }

    /// **Scenario**: A failed pending computation resolves to ExecutionFailed with the message.
    #[tokio::test]
    async fn pending_failure_maps_to_execution_failed() {
        let fut = async { Err("boom".to_string()) }.boxed().shared();
        let slot = Slot::Pending(fut);
        match slot.resolve().await {
            Err(WorkflowError::ExecutionFailed(msg)) => assert_eq!(msg, "boom"),
            other => panic!("expected ExecutionFailed, got {:?}", other),
        }
    }
}
