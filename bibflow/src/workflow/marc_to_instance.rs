//! Convert a MARC21 record into a catalog instance record.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{
    compose_system, dispatch_reply, load_prompt, resolve_input, RoutedReply, Workflow,
    WorkflowBuildError, WorkflowContext,
};
use crate::error::WorkflowError;
use crate::graph::{CompiledTaskGraph, FnVertex, TaskGraph, Vertex, VertexKind};
use crate::llm::{ChatReply, FunctionSchema};
use crate::router::{
    add_instance_schema, AddInstanceHandler, FunctionCallRouter, LoadInstanceHandler,
};
use crate::sinks::{HistoryEntry, RecordDisplay};

const SYSTEM_PROMPT: &str = "In the role as an expert cataloger, you will be given a MARC21 record and then convert\nto a FOLIO Instance JSON record\n";

const EXAMPLES: [&str; 1] = [r#"Q: =LDR  01071cam a2200349 i 4500
=020  \\$a0070824525
=100  1\$aErickson, Bonnie H.
=245  10$aUnderstanding data /$cBonnie H. Erickson, T. A. Nosanchuk.
=260  \\$aToronto ;$aNew York :$bMcGraw-Hill Ryerson,$cc1977.
=650  \0$aStatistics.
=700  1\$aNosanchuk, T. A.,$d1935-

   A: {"source": "MARC",
       "title": "Understanding data / Bonnie H. Erickson, T. A. Nosanchuk.",
       "identifiers": [{"identifierTypeName": "ISBN", "value": "0070824525"}],
       "contributors": [
         {"name": "Erickson, Bonnie H", "contributorTypeText": "Contributor", "primary": true},
         {"name": "Nosanchuk, T. A., 1935-", "contributorTypeText": "Contributor", "primary": false}],
       "subjects": ["Statistics"],
       "publication": [{"publisher": "McGraw-Hill Ryerson", "place": "Toronto New York", "dateOfPublication": "c1977"}]}
"#];

/// MARC text in, persisted record and viewer URL out, with a follow-up load
/// turn after creation.
///
/// Graph: `decode` normalizes the raw MARC input to text, `chat` (deferred)
/// asks for the conversion, `create` routes `add_instance` and yields the
/// load prompt, `load` (deferred) sends that prompt as a second chat turn,
/// `finish` routes the load reply. A first round that creates nothing skips
/// the second turn. Records from MARC default their resource type to "text"
/// rather than "unspecified".
pub struct MarcToInstance {
    context: Arc<WorkflowContext>,
    graph: CompiledTaskGraph,
    schemas: Vec<FunctionSchema>,
    zero_shot: bool,
}

impl MarcToInstance {
    pub fn new(context: Arc<WorkflowContext>, zero_shot: bool) -> Result<Self, WorkflowBuildError> {
        let mut router = FunctionCallRouter::new();
        router.register(Arc::new(
            AddInstanceHandler::new(
                Arc::clone(&context.catalog),
                Arc::clone(&context.vocabularies),
                Arc::clone(&context.record),
                Arc::clone(&context.display) as Arc<dyn RecordDisplay>,
            )
            .with_instance_type_default("text"),
        ));
        // The load turn may come back as a load_instance call.
        router.register(Arc::new(LoadInstanceHandler::new(
            Arc::clone(&context.display) as Arc<dyn RecordDisplay>,
        )));
        let schemas = vec![add_instance_schema()];
        router.check_schemas(&schemas)?;
        let router = Arc::new(router);

        let graph = build_graph(&context, &router)?;
        Ok(Self {
            context,
            graph,
            schemas,
            zero_shot,
        })
    }
}

fn build_graph(
    context: &Arc<WorkflowContext>,
    router: &Arc<FunctionCallRouter>,
) -> Result<CompiledTaskGraph, WorkflowBuildError> {
    let mut graph = TaskGraph::new();

    let ctx = Arc::clone(context);
    graph.add_vertex(Arc::new(FnVertex::new(
        "decode",
        VertexKind::Sync,
        move |_input| {
            let ctx = Arc::clone(&ctx);
            async move {
                let raw = ctx.initial_prompt.lock().await.clone();
                let text = ctx.marc_decoder.decode(raw.as_bytes())?;
                ctx.history.record(HistoryEntry::prompt(text.clone()));
                Ok(Value::String(text))
            }
        },
    )) as Arc<dyn Vertex>)?;

    let ctx = Arc::clone(context);
    graph.add_vertex(Arc::new(FnVertex::new("chat", VertexKind::Async, move |input| {
        let ctx = Arc::clone(&ctx);
        async move {
            let text = resolve_input(input).await?;
            let text = text.as_str().unwrap_or_default().to_owned();
            let reply = ctx.chat.lock().await.send(text).await;
            serde_json::to_value(reply)
                .map_err(|err| WorkflowError::ExecutionFailed(err.to_string()))
        }
    })) as Arc<dyn Vertex>)?;

    // After a successful creation the load prompt becomes a second chat
    // turn; any other first-round outcome skips the turn and carries through.
    let ctx = Arc::clone(context);
    let create_router = Arc::clone(router);
    graph.add_vertex(Arc::new(FnVertex::new(
        "create",
        VertexKind::Sync,
        move |input| {
            let ctx = Arc::clone(&ctx);
            let router = Arc::clone(&create_router);
            async move {
                let reply: ChatReply = serde_json::from_value(resolve_input(input).await?)
                    .map_err(|err| WorkflowError::ExecutionFailed(err.to_string()))?;
                match dispatch_reply(&ctx, &router, &reply).await? {
                    RoutedReply::Created(url) => {
                        Ok(serde_json::json!({ "follow_up": load_prompt(&url) }))
                    }
                    RoutedReply::Text(text) => Ok(serde_json::json!({ "outcome": text })),
                }
            }
        },
    )) as Arc<dyn Vertex>)?;

    let ctx = Arc::clone(context);
    graph.add_vertex(Arc::new(FnVertex::new("load", VertexKind::Async, move |input| {
        let ctx = Arc::clone(&ctx);
        async move {
            let input = resolve_input(input).await?;
            let Some(prompt) = input.get("follow_up").and_then(Value::as_str) else {
                return Ok(input);
            };
            let reply = ctx.chat.lock().await.send(prompt.to_owned()).await;
            serde_json::to_value(reply)
                .map_err(|err| WorkflowError::ExecutionFailed(err.to_string()))
        }
    })) as Arc<dyn Vertex>)?;

    let ctx = Arc::clone(context);
    let router = Arc::clone(router);
    graph.add_vertex(Arc::new(FnVertex::new(
        "finish",
        VertexKind::Sync,
        move |input| {
            let ctx = Arc::clone(&ctx);
            let router = Arc::clone(&router);
            async move {
                let input = resolve_input(input).await?;
                if let Some(outcome) = input.get("outcome").and_then(Value::as_str) {
                    return Ok(Value::String(outcome.to_owned()));
                }
                let reply: ChatReply = serde_json::from_value(input)
                    .map_err(|err| WorkflowError::ExecutionFailed(err.to_string()))?;
                let outcome = dispatch_reply(&ctx, &router, &reply).await?.into_outcome();
                Ok(Value::String(outcome))
            }
        },
    )) as Arc<dyn Vertex>)?;

    graph.add_edge("decode", "chat")?;
    graph.add_edge("chat", "create")?;
    graph.add_edge("create", "load")?;
    graph.add_edge("load", "finish")?;
    Ok(graph.compile()?)
}

#[async_trait]
impl Workflow for MarcToInstance {
    fn name(&self) -> &str {
        "MARC21 to Inventory Record"
    }

    async fn run(&self, initial_prompt: &str) -> Result<String, WorkflowError> {
        {
            let mut chat = self.context.chat.lock().await;
            chat.set_system(compose_system(SYSTEM_PROMPT, &EXAMPLES, self.zero_shot));
            chat.set_functions(self.schemas.clone());
        }
        self.context.vocabularies.warm().await;
        *self.context.initial_prompt.lock().await = initial_prompt.to_owned();

        let output = self.graph.run().await?;
        let outcome = output.resolve("finish").await?;
        Ok(outcome.as_str().unwrap_or_default().to_owned())
    }
}
