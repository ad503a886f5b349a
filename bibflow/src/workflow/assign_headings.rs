//! Assign subject headings to terms in a plain conversational turn.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{compose_system, resolve_input, Workflow, WorkflowBuildError, WorkflowContext};
use crate::error::WorkflowError;
use crate::graph::{CompiledTaskGraph, FnVertex, TaskGraph, Vertex, VertexKind};
use crate::llm::ChatReply;
use crate::sinks::HistoryEntry;

const SYSTEM_PROMPT: &str = "As an expert cataloger, you will use the context to assign Library of Congress Subject Headings to terms";

/// Terms in, headings out. No functions, no catalog writes; the reply text
/// is the whole outcome.
pub struct AssignHeadings {
    context: Arc<WorkflowContext>,
    graph: CompiledTaskGraph,
    zero_shot: bool,
}

impl AssignHeadings {
    pub fn new(context: Arc<WorkflowContext>, zero_shot: bool) -> Result<Self, WorkflowBuildError> {
        let graph = build_graph(&context)?;
        Ok(Self {
            context,
            graph,
            zero_shot,
        })
    }
}

fn build_graph(context: &Arc<WorkflowContext>) -> Result<CompiledTaskGraph, WorkflowBuildError> {
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
    graph.add_vertex(Arc::new(FnVertex::new(
        "answer",
        VertexKind::Sync,
        move |input| {
            let ctx = Arc::clone(&ctx);
            async move {
                let reply: ChatReply = serde_json::from_value(resolve_input(input).await?)
                    .map_err(|err| WorkflowError::ExecutionFailed(err.to_string()))?;
                let text = match &reply {
                    ChatReply::Transport(failure) => {
                        format!("chat call failed ({}): {}", failure.error, failure.message)
                    }
                    ChatReply::Completion(_) => reply.content().unwrap_or_default().to_owned(),
                };
                ctx.history.record(HistoryEntry::response(text.clone()));
                Ok(Value::String(text))
            }
        },
    )) as Arc<dyn Vertex>)?;

    graph.add_edge("seed", "chat")?;
    graph.add_edge("chat", "answer")?;
    Ok(graph.compile()?)
}

#[async_trait]
impl Workflow for AssignHeadings {
    fn name(&self) -> &str {
        "Assign Subject Headings"
    }

    async fn run(&self, initial_prompt: &str) -> Result<String, WorkflowError> {
        {
            let mut chat = self.context.chat.lock().await;
            chat.set_system(compose_system(SYSTEM_PROMPT, &[], self.zero_shot));
        }
        *self.context.initial_prompt.lock().await = initial_prompt.to_owned();

        let output = self.graph.run().await?;
        let outcome = output.resolve("answer").await?;
        Ok(outcome.as_str().unwrap_or_default().to_owned())
    }
}
