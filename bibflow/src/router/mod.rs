//! Dispatch of model-emitted function calls to registered handlers.
//!
//! The model answers with `{name, arguments}`; the router parses the
//! arguments strictly, looks the name up in its handler table and runs the
//! handler. An unknown name is a normal outcome ([`Dispatch::Unknown`]), not
//! an error, so callers branch on the dispatch shape without exception
//! handling. The handler table is checked against the advertised schema list
//! at workflow build time, which turns a missing registration into a build
//! failure instead of a run-time surprise.

mod handlers;
mod schemas;

pub use handlers::{AddInstanceHandler, LoadInstanceHandler, LoadLinkedDataHandler};
pub use schemas::{add_instance_schema, load_instance_schema, load_sinopia_schema};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::error::WorkflowError;
use crate::llm::FunctionSchema;
use crate::message::FunctionCall;

/// Router configuration error, fatal before any run starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    /// A schema is advertised to the model but no handler is registered for
    /// its name, so a call would dead-end at run time.
    #[error("advertised function {0:?} has no registered handler")]
    UnregisteredFunction(String),
}

/// Outcome of dispatching one function call.
///
/// `Url` and `Text` are the two handler result shapes; callers branch on
/// the variant instead of sniffing string prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The handler produced a resource URL (for example a record viewer link).
    Url(String),
    /// The handler produced diagnostic or content text.
    Text(String),
    /// No handler matched; carries the function name.
    Unknown(String),
}

impl Dispatch {
    /// Human-readable form of the outcome; unknown names render as the
    /// sentinel `Unknown function <name>`.
    pub fn message(&self) -> String {
        match self {
            Dispatch::Url(url) => url.clone(),
            Dispatch::Text(text) => text.clone(),
            Dispatch::Unknown(name) => format!("Unknown function {name}"),
        }
    }
}

/// One named function the model may invoke.
#[async_trait]
pub trait FunctionHandler: Send + Sync {
    /// Schema advertised to the model for this function.
    fn schema(&self) -> FunctionSchema;

    /// Runs the function with its parsed argument object.
    async fn invoke(&self, arguments: Map<String, Value>) -> Result<Dispatch, WorkflowError>;
}

/// Handler table keyed by exact function name.
#[derive(Default)]
pub struct FunctionCallRouter {
    handlers: HashMap<String, Arc<dyn FunctionHandler>>,
}

impl FunctionCallRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under its schema name, replacing any previous
    /// handler for that name.
    pub fn register(&mut self, handler: Arc<dyn FunctionHandler>) {
        self.handlers.insert(handler.schema().name.clone(), handler);
    }

    /// Schemas of every registered handler.
    pub fn schemas(&self) -> Vec<FunctionSchema> {
        self.handlers.values().map(|h| h.schema()).collect()
    }

    /// Verifies that every advertised schema has a handler. Run once at
    /// workflow construction.
    pub fn check_schemas(&self, advertised: &[FunctionSchema]) -> Result<(), RouterError> {
        for schema in advertised {
            if !self.handlers.contains_key(&schema.name) {
                return Err(RouterError::UnregisteredFunction(schema.name.clone()));
            }
        }
        Ok(())
    }

    /// Parses the call's arguments and runs the matching handler.
    ///
    /// Arguments that are not a JSON object fail fast with
    /// [`WorkflowError::MalformedFunctionArguments`]; an unmatched name
    /// returns [`Dispatch::Unknown`] without touching any handler.
    pub async fn dispatch(&self, call: &FunctionCall) -> Result<Dispatch, WorkflowError> {
        let handler = match self.handlers.get(&call.name) {
            Some(handler) => handler,
            None => {
                debug!(name = %call.name, "no handler for function call");
                return Ok(Dispatch::Unknown(call.name.clone()));
            }
        };

        let parsed: Value = serde_json::from_str(&call.arguments).map_err(|err| {
            WorkflowError::MalformedFunctionArguments {
                name: call.name.clone(),
                reason: err.to_string(),
            }
        })?;
        let arguments = match parsed {
            Value::Object(map) => map,
            other => {
                return Err(WorkflowError::MalformedFunctionArguments {
                    name: call.name.clone(),
                    reason: format!("expected a JSON object, got {other}"),
                })
            }
        };

        debug!(name = %call.name, "dispatching function call");
        handler.invoke(arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoHandler;

    #[async_trait]
    impl FunctionHandler for EchoHandler {
        fn schema(&self) -> FunctionSchema {
            FunctionSchema {
                name: "echo".to_owned(),
                description: "echoes its text argument".to_owned(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {"text": {"type": "string"}}
                }),
            }
        }

        async fn invoke(&self, arguments: Map<String, Value>) -> Result<Dispatch, WorkflowError> {
            let text = arguments
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default();
            Ok(Dispatch::Text(text.to_owned()))
        }
    }

    fn router() -> FunctionCallRouter {
        let mut router = FunctionCallRouter::new();
        router.register(Arc::new(EchoHandler));
        router
    }

    fn call(name: &str, arguments: &str) -> FunctionCall {
        FunctionCall {
            name: name.to_owned(),
            arguments: arguments.to_owned(),
        }
    }

    /// **Scenario**: A registered name dispatches to its handler with parsed
    /// arguments.
    #[tokio::test]
    async fn dispatch_runs_matching_handler() {
        let outcome = router()
            .dispatch(&call("echo", r#"{"text": "hello"}"#))
            .await
            .unwrap();
        assert_eq!(outcome, Dispatch::Text("hello".to_owned()));
    }

    /// **Scenario**: An unknown name yields the sentinel message and is not an
    /// error.
    #[tokio::test]
    async fn unknown_name_yields_sentinel() {
        let outcome = router()
            .dispatch(&call("frobnicate", "{}"))
            .await
            .unwrap();
        assert_eq!(outcome, Dispatch::Unknown("frobnicate".to_owned()));
        assert_eq!(outcome.message(), "Unknown function frobnicate");
    }

    /// **Scenario**: Malformed argument JSON fails fast with a distinct error
    /// naming the function, instead of guessing field values.
    #[tokio::test]
    async fn malformed_arguments_fail_fast() {
        let err = router()
            .dispatch(&call("echo", "{not json"))
            .await
            .unwrap_err();
        match err {
            WorkflowError::MalformedFunctionArguments { name, .. } => assert_eq!(name, "echo"),
            other => panic!("unexpected error: {other}"),
        }
    }

    /// **Scenario**: Arguments that parse but are not an object are rejected
    /// the same way.
    #[tokio::test]
    async fn non_object_arguments_are_rejected() {
        let err = router()
            .dispatch(&call("echo", "[1, 2]"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::MalformedFunctionArguments { .. }));
    }

    /// **Scenario**: check_schemas flags an advertised schema with no handler
    /// and passes when every name is covered.
    #[test]
    fn schema_check_is_exhaustive() {
        let router = router();
        assert!(router.check_schemas(&router.schemas()).is_ok());
        let extra = FunctionSchema {
            name: "vanish".to_owned(),
            description: String::new(),
            parameters: Value::Null,
        };
        assert_eq!(
            router.check_schemas(&[extra]),
            Err(RouterError::UnregisteredFunction("vanish".to_owned()))
        );
    }
}
