//! # bibflow
//!
//! A workflow engine for LLM-assisted cataloging. Each workflow is a small
//! directed acyclic task graph: vertices talk to a chat completion endpoint,
//! route model-emitted function calls to handlers, rewrite the extracted
//! record against catalog vocabularies, and persist it to an Okapi-style
//! catalog service.
//!
//! ## Design principles
//!
//! - **Explicit deferral**: a vertex is declared [`VertexKind::Sync`] or
//!   [`VertexKind::Async`]; async results travel through [`Slot::Pending`]
//!   and the consumer awaits them, never the scheduler.
//! - **Failures as values**: transport failures from the completion endpoint
//!   ([`ChatReply::Transport`]), catalog rejections ([`CatalogFailure`]) and
//!   unknown function names ([`Dispatch::Unknown`]) are returned, not raised;
//!   only graph misconfiguration and malformed function arguments error out.
//! - **No globals**: everything a run touches lives in a [`WorkflowContext`]
//!   passed to the vertices.
//!
//! ## Main modules
//!
//! - [`graph`]: [`TaskGraph`], [`CompiledTaskGraph`], [`Vertex`], [`Slot`] —
//!   build and run dependency-ordered work.
//! - [`chat`]: [`ChatSession`] over a [`CompletionClient`].
//! - [`llm`]: completion wire types, [`HttpCompletionClient`],
//!   [`MockCompletionClient`].
//! - [`router`]: [`FunctionCallRouter`], [`Dispatch`], the cataloging
//!   handlers and their schemas.
//! - [`record`]: [`RecordTransformer`] — names to vocabulary ids, in place.
//! - [`catalog`]: [`CatalogService`], [`HttpCatalog`], [`VocabularyCache`].
//! - [`linked_data`]: [`LinkedDataSource`], [`HttpLinkedData`].
//! - [`sinks`]: history, display and MARC-decoding seams.
//! - [`workflow`]: [`WorkflowContext`] plus the concrete workflows
//!   ([`NewResource`], [`MarcToInstance`], [`LinkedDataToInstance`],
//!   [`AssignHeadings`]).

pub mod catalog;
pub mod chat;
pub mod error;
pub mod graph;
pub mod linked_data;
pub mod llm;
pub mod message;
pub mod record;
pub mod router;
pub mod sinks;
pub mod workflow;

pub use catalog::{
    CatalogConfig, CatalogFailure, CatalogService, HttpCatalog, Vocabulary, VocabularyCache,
    VocabularyKind,
};
pub use chat::{ChatConfig, ChatSession};
pub use error::WorkflowError;
pub use graph::{
    CompiledTaskGraph, FnVertex, GraphError, PendingValue, RunOutput, Slot, TaskGraph, Vertex,
    VertexKind,
};
pub use linked_data::{HttpLinkedData, LinkedDataFailure, LinkedDataSource};
pub use llm::{
    ChatCompletion, ChatReply, CompletionClient, CompletionRequest, FunctionSchema,
    HttpCompletionClient, MockCompletionClient, TransportFailure,
};
pub use message::{ChatMessage, FunctionCall, Role};
pub use record::RecordTransformer;
pub use router::{
    AddInstanceHandler, Dispatch, FunctionCallRouter, FunctionHandler, LoadInstanceHandler,
    LoadLinkedDataHandler, RouterError,
};
pub use sinks::{
    HistoryEntry, HistoryKind, HistorySink, MarcDecoder, MemoryDisplay, MemoryHistory, NullSink,
    RecordDisplay, TextMarcDecoder,
};
pub use workflow::{
    AssignHeadings, LinkedDataToInstance, MarcToInstance, NewResource, Workflow,
    WorkflowBuildError, WorkflowContext,
};
