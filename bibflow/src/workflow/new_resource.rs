//! Create a new catalog record from a natural-language description.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{
    compose_system, dispatch_reply, resolve_input, Workflow, WorkflowBuildError, WorkflowContext,
};
use crate::error::WorkflowError;
use crate::graph::{CompiledTaskGraph, FnVertex, TaskGraph, Vertex, VertexKind};
use crate::llm::{ChatReply, FunctionSchema};
use crate::router::{add_instance_schema, AddInstanceHandler, FunctionCallRouter};
use crate::sinks::{HistoryEntry, RecordDisplay};

const SYSTEM_PROMPT: &str =
    "You are an expert cataloger, return any records as FOLIO JSON";

const EXAMPLES: [&str; 1] = [r#"Q: Parable of the Sower by Octavia Butler, published in 1993 by Four Walls Eight Windows in New York

   A: {"title": "Parable of the Sower", "source": "ChatGPT",
       "contributors": [{"name": "Octavia Butler", "contributorTypeText": "Author"}],
       "publication": [{"publisher": "Four Walls Eight Windows", "dateOfPublication": "1993", "place": "New York"}]}
"#];

/// Description in, persisted record and viewer URL out.
///
/// Graph: `seed` records the prompt, `chat` (deferred) runs the completion,
/// `dispatch` routes the expected `add_instance` call and loads the result.
pub struct NewResource {
    context: Arc<WorkflowContext>,
    graph: CompiledTaskGraph,
    schemas: Vec<FunctionSchema>,
    zero_shot: bool,
}

impl NewResource {
    pub fn new(context: Arc<WorkflowContext>, zero_shot: bool) -> Result<Self, WorkflowBuildError> {
        let mut router = FunctionCallRouter::new();
        router.register(Arc::new(AddInstanceHandler::new(
            Arc::clone(&context.catalog),
            Arc::clone(&context.vocabularies),
            Arc::clone(&context.record),
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
    graph.add_vertex(Arc::new(FnVertex::new("seed", VertexKind::Sync, move |_input| {
        let ctx = Arc::clone(&ctx);
        async move {
            let prompt = ctx.initial_prompt.lock().await.clone();
            ctx.history.record(HistoryEntry::prompt(prompt.clone()));
            Ok(Value::String(prompt))
        }
    })) as Arc<dyn Vertex>)?;

    let ctx = Arc::clone(context);
    graph.add_vertex(Arc::new(FnVertex::new("chat", VertexKind::Async, move |input| {
        let ctx = Arc::clone(&ctx);
        async move {
            let prompt = resolve_input(input).await?;
            let prompt = prompt.as_str().unwrap_or_default().to_owned();
            let reply = ctx.chat.lock().await.send(prompt).await;
            serde_json::to_value(reply)
                .map_err(|err| WorkflowError::ExecutionFailed(err.to_string()))
        }
    })) as Arc<dyn Vertex>)?;

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

    graph.add_edge("seed", "chat")?;
    graph.add_edge("chat", "dispatch")?;
    Ok(graph.compile()?)
}

#[async_trait]
impl Workflow for NewResource {
    fn name(&self) -> &str {
        "Create a New Resource"
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
