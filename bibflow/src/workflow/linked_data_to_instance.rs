//! Convert a Sinopia linked-data resource into a catalog instance record.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{
    compose_system, dispatch_reply, resolve_input, Workflow, WorkflowBuildError, WorkflowContext,
};
use crate::error::WorkflowError;
use crate::graph::{CompiledTaskGraph, FnVertex, TaskGraph, Vertex, VertexKind};
use crate::llm::{ChatReply, FunctionSchema};
use crate::router::{
    add_instance_schema, load_sinopia_schema, AddInstanceHandler, FunctionCallRouter,
    LoadLinkedDataHandler,
};
use crate::sinks::{HistoryEntry, RecordDisplay};

const SYSTEM_PROMPT: &str = "You are an expert cataloger, given a Sinopia URL you will retrieve the JSON Linked Data\nand convert it to a FOLIO Instance JSON record";

const EXAMPLES: [&str; 1] = [r#"Q: @prefix bf: <http://id.loc.gov/ontologies/bibframe/> .

<https://api.stage.sinopia.io/resource/bd072fe6> a bf:Work ;
    bf:title [ a bf:Title ; bf:mainTitle "Parable of the Sower"@en ] ;
    bf:contribution [ bf:agent <http://id.loc.gov/authorities/names/n2020014067> ;
                      bf:role <http://id.loc.gov/vocabulary/relators/aut> ] .

   A: {"title": "Parable of the Sower", "source": "Sinopia",
       "contributors": [{"name": "Octavia Butler", "contributorTypeText": "Author", "primary": true}],
       "languages": ["eng"]}
"#];

/// Resource URL in, persisted record and viewer URL out, via two model turns.
///
/// Graph: `seed` records the prompt, `first_chat` (deferred) lets the model
/// ask for the resource, `fetch` dispatches the expected `load_sinopia` call
/// and yields the RDF text as a follow-up prompt, `second_chat` (deferred)
/// asks for the conversion, `dispatch` routes the final `add_instance`.
pub struct LinkedDataToInstance {
    context: Arc<WorkflowContext>,
    graph: CompiledTaskGraph,
    schemas: Vec<FunctionSchema>,
    zero_shot: bool,
}

impl LinkedDataToInstance {
    pub fn new(context: Arc<WorkflowContext>, zero_shot: bool) -> Result<Self, WorkflowBuildError> {
        let mut router = FunctionCallRouter::new();
        router.register(Arc::new(AddInstanceHandler::new(
            Arc::clone(&context.catalog),
            Arc::clone(&context.vocabularies),
            Arc::clone(&context.record),
            Arc::clone(&context.display) as Arc<dyn RecordDisplay>,
        )));
        router.register(Arc::new(LoadLinkedDataHandler::new(Arc::clone(
            &context.linked_data,
        ))));
        let schemas = vec![load_sinopia_schema(), add_instance_schema()];
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

fn chat_vertex(
    id: &str,
    context: &Arc<WorkflowContext>,
) -> Arc<dyn Vertex> {
    let ctx = Arc::clone(context);
    Arc::new(FnVertex::new(id, VertexKind::Async, move |input| {
        let ctx = Arc::clone(&ctx);
        async move {
            let prompt = resolve_input(input).await?;
            let prompt = prompt.as_str().unwrap_or_default().to_owned();
            let reply = ctx.chat.lock().await.send(prompt).await;
            serde_json::to_value(reply)
                .map_err(|err| WorkflowError::ExecutionFailed(err.to_string()))
        }
    }))
}

fn build_graph(
    context: &Arc<WorkflowContext>,
    router: &Arc<FunctionCallRouter>,
) -> Result<CompiledTaskGraph, WorkflowBuildError> {
    let mut graph = TaskGraph::new();

    let ctx = Arc::clone(context);
    graph.add_vertex(Arc::new(FnVertex::new("seed", VertexKind::Sync, move |_input| {
        let ctx = Arc::clone(&ctx);
        async move {
            let prompt = ctx.initial_prompt.lock().await.clone();
            ctx.history.record(HistoryEntry::prompt(prompt.clone()));
            Ok(Value::String(prompt))
        }
    })) as Arc<dyn Vertex>)?;

    graph.add_vertex(chat_vertex("first_chat", context))?;

    // The first dispatch round turns load_sinopia into a follow-up prompt
    // carrying the fetched RDF text.
    let ctx = Arc::clone(context);
    let first_router = Arc::clone(router);
    graph.add_vertex(Arc::new(FnVertex::new(
        "fetch",
        VertexKind::Sync,
        move |input| {
            let ctx = Arc::clone(&ctx);
            let router = Arc::clone(&first_router);
            async move {
                let reply: ChatReply = serde_json::from_value(resolve_input(input).await?)
                    .map_err(|err| WorkflowError::ExecutionFailed(err.to_string()))?;
                let text = dispatch_reply(&ctx, &router, &reply).await?.into_outcome();
                let prompt = format!("Add FOLIO Instance JSON record from\n{text}");
                ctx.history.record(HistoryEntry::prompt(prompt.clone()));
                Ok(Value::String(prompt))
            }
        },
    )) as Arc<dyn Vertex>)?;

    graph.add_vertex(chat_vertex("second_chat", context))?;

    let ctx = Arc::clone(context);
    let router = Arc::clone(router);
    graph.add_vertex(Arc::new(FnVertex::new(
        "dispatch",
        VertexKind::Sync,
        move |input| {
            let ctx = Arc::clone(&ctx);
            let router = Arc::clone(&router);
            async move {
                let reply: ChatReply = serde_json::from_value(resolve_input(input).await?)
                    .map_err(|err| WorkflowError::ExecutionFailed(err.to_string()))?;
                let outcome = dispatch_reply(&ctx, &router, &reply).await?.into_outcome();
                Ok(Value::String(outcome))
            }
        },
    )) as Arc<dyn Vertex>)?;

    graph.add_edge("seed", "first_chat")?;
    graph.add_edge("first_chat", "fetch")?;
    graph.add_edge("fetch", "second_chat")?;
    graph.add_edge("second_chat", "dispatch")?;
    Ok(graph.compile()?)
}

#[async_trait]
impl Workflow for LinkedDataToInstance {
    fn name(&self) -> &str {
        "Sinopia BIBFRAME to Inventory Instance"
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
        let outcome = output.resolve("dispatch").await?;
        Ok(outcome.as_str().unwrap_or_default().to_owned())
    }
}
