//! Workflow aggregation: one run of the cataloging engine.
//!
//! A workflow owns a compiled task graph and shares a [`WorkflowContext`]
//! with its vertices. The context is the explicit home for everything the
//! run mutates or consults (chat session, record under construction,
//! vocabularies, sinks); no component reaches for process-wide state.
//! Workflows are built once per user-initiated run: graph validation and the
//! schema-against-handler check both happen in the constructor, so a
//! misconfigured workflow never starts.

mod assign_headings;
mod linked_data_to_instance;
mod marc_to_instance;
mod new_resource;

pub use assign_headings::AssignHeadings;
pub use linked_data_to_instance::LinkedDataToInstance;
pub use marc_to_instance::MarcToInstance;
pub use new_resource::NewResource;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::catalog::{CatalogService, VocabularyCache};
use crate::chat::{ChatConfig, ChatSession};
use crate::error::WorkflowError;
use crate::graph::GraphError;
use crate::linked_data::LinkedDataSource;
use crate::llm::CompletionClient;
use crate::router::RouterError;
use crate::sinks::{HistorySink, MarcDecoder, NullSink, RecordDisplay, TextMarcDecoder};

/// Workflow construction failure; fatal before any run starts.
#[derive(Debug, Error)]
pub enum WorkflowBuildError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Router(#[from] RouterError),
}

/// Shared state for one workflow run.
///
/// **Interaction**: Built by the caller (CLI or test), wrapped in an `Arc`
/// and captured by the graph's vertex closures. The chat session and record
/// sit behind async mutexes because vertices share the context, but the
/// sequential traversal means they never contend.
pub struct WorkflowContext {
    pub chat: Mutex<ChatSession>,
    pub vocabularies: Arc<VocabularyCache>,
    pub catalog: Arc<dyn CatalogService>,
    pub linked_data: Arc<dyn LinkedDataSource>,
    pub history: Arc<dyn HistorySink>,
    pub display: Arc<dyn RecordDisplay>,
    pub marc_decoder: Arc<dyn MarcDecoder>,
    /// The record under construction; replaced by `add_instance`.
    pub record: Arc<Mutex<Value>>,
    /// Prompt seeding the next run; set by `Workflow::run`.
    pub initial_prompt: Mutex<String>,
}

impl WorkflowContext {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        catalog: Arc<dyn CatalogService>,
        linked_data: Arc<dyn LinkedDataSource>,
    ) -> Self {
        let sink = Arc::new(NullSink);
        Self {
            chat: Mutex::new(ChatSession::new(client, ChatConfig::default())),
            vocabularies: Arc::new(VocabularyCache::new(Arc::clone(&catalog))),
            catalog,
            linked_data,
            history: Arc::clone(&sink) as Arc<dyn HistorySink>,
            display: sink as Arc<dyn RecordDisplay>,
            marc_decoder: Arc::new(TextMarcDecoder),
            record: Arc::new(Mutex::new(Value::Null)),
            initial_prompt: Mutex::new(String::new()),
        }
    }

    /// Swaps in real sinks; the default context drops everything.
    pub fn with_sinks(
        mut self,
        history: Arc<dyn HistorySink>,
        display: Arc<dyn RecordDisplay>,
    ) -> Self {
        self.history = history;
        self.display = display;
        self
    }
}

/// One runnable workflow.
#[async_trait]
pub trait Workflow: Send + Sync {
    /// Display name shown in history and the CLI.
    fn name(&self) -> &str;

    /// Executes the workflow graph seeded with `initial_prompt` and returns
    /// the outcome text of the final vertex.
    async fn run(&self, initial_prompt: &str) -> Result<String, WorkflowError>;
}

/// Awaits a vertex's optional argument, treating a missing predecessor as
/// null.
pub(crate) async fn resolve_input(input: Option<crate::graph::Slot>) -> Result<Value, WorkflowError> {
    match input {
        Some(slot) => slot.resolve().await,
        None => Ok(Value::Null),
    }
}

/// Outcome of routing one model reply through [`dispatch_reply`].
pub(crate) enum RoutedReply {
    /// `add_instance` created a record: the display was pointed at the viewer
    /// URL and the load prompt was announced in history. Workflows with a
    /// follow-up load turn send that prompt as the next chat message.
    Created(String),
    /// Every other outcome, already rendered as text.
    Text(String),
}

impl RoutedReply {
    /// The outcome string a final vertex delivers.
    pub(crate) fn into_outcome(self) -> String {
        match self {
            RoutedReply::Created(url) => format!("Finished {url}"),
            RoutedReply::Text(text) => text,
        }
    }
}

/// The prompt announcing a freshly created record; also sent back to the
/// model by workflows with a follow-up load turn.
pub(crate) fn load_prompt(url: &str) -> String {
    format!("Load catalog instance {url}")
}

/// Handles one model reply: runs any function call through the router and
/// reports the routed outcome.
///
/// A viewer URL is pushed to the display and its load prompt recorded in
/// history; other outcomes (handler text, the unknown-function sentinel,
/// transport failures) are recorded as responses. Only genuinely unexpected
/// conditions (malformed arguments) propagate as errors.
pub(crate) async fn dispatch_reply(
    context: &WorkflowContext,
    router: &crate::router::FunctionCallRouter,
    reply: &crate::llm::ChatReply,
) -> Result<RoutedReply, WorkflowError> {
    use crate::llm::ChatReply;
    use crate::router::Dispatch;
    use crate::sinks::HistoryEntry;

    if let ChatReply::Transport(failure) = reply {
        let text = format!("chat call failed ({}): {}", failure.error, failure.message);
        context.history.record(HistoryEntry::response(text.clone()));
        return Ok(RoutedReply::Text(text));
    }

    let Some(call) = reply.function_call() else {
        let content = reply.content().unwrap_or_default().to_owned();
        context.history.record(HistoryEntry::response(content.clone()));
        return Ok(RoutedReply::Text(content));
    };

    context
        .history
        .record(HistoryEntry::response(format!("function call: {}", call.name)));
    match router.dispatch(call).await? {
        Dispatch::Url(url) => {
            context.history.record(HistoryEntry::prompt(load_prompt(&url)));
            context.display.show(&url);
            Ok(RoutedReply::Created(url))
        }
        outcome => {
            let message = outcome.message();
            context.history.record(HistoryEntry::response(message.clone()));
            Ok(RoutedReply::Text(message))
        }
    }
}

/// Composes a system prompt from its base and few-shot examples. Zero-shot
/// runs keep the bare base prompt.
pub(crate) fn compose_system(base: &str, examples: &[&str], zero_shot: bool) -> String {
    if zero_shot || examples.is_empty() {
        return base.to_owned();
    }
    let mut prompt = format!("{base}\nExamples:\n");
    prompt.push_str(&examples.join("\n"));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Few-shot examples are appended after an Examples marker;
    /// zero-shot keeps the base prompt untouched.
    #[test]
    fn system_prompt_composition() {
        let base = "You are an expert cataloger";
        let examples = ["Q: a\nA: b"];
        let few_shot = compose_system(base, &examples, false);
        assert!(few_shot.starts_with(base));
        assert!(few_shot.contains("Examples:"));
        assert!(few_shot.ends_with("Q: a\nA: b"));
        assert_eq!(compose_system(base, &examples, true), base);
    }

    /// **Scenario**: A created record renders as the Finished line and its
    /// load prompt names the viewer URL; text outcomes pass through.
    #[test]
    fn routed_reply_renders_outcome() {
        let url = "https://folio.example.edu/inventory/view/abc";
        let created = RoutedReply::Created(url.to_owned());
        assert_eq!(created.into_outcome(), format!("Finished {url}"));
        assert_eq!(load_prompt(url), format!("Load catalog instance {url}"));
        let text = RoutedReply::Text("Unknown function frobnicate".to_owned());
        assert_eq!(text.into_outcome(), "Unknown function frobnicate");
    }
}
