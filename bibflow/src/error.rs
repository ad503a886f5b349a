//! Workflow execution error types.
//!
//! Used by vertex bodies, function handlers, and `Workflow::run`. Recoverable
//! conditions (transport failures, unknown function names, missing vocabulary
//! entries) are modeled as values, not errors; only genuine execution failures
//! surface here.

use thiserror::Error;

/// Workflow execution error.
///
/// Returned by `Vertex::run` and everything invoked from a vertex body.
/// Transport failures from the completion or catalog endpoints are NOT
/// represented here; they are returned as values the caller branches on
/// (`ChatReply::Transport`, `CatalogFailure`).
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Execution failed with a message (e.g. a vertex body or handler failed).
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// A function-call payload was not valid structured data.
    ///
    /// The router parses arguments strictly and fails fast instead of
    /// guessing field values from a partially malformed payload.
    #[error("malformed arguments for function {name}: {reason}")]
    MalformedFunctionArguments {
        /// Name of the function whose arguments failed to parse.
        name: String,
        /// Parse error detail.
        reason: String,
    },
}
