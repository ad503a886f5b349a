//! Task graph: vertices + "must run after" edges, compile and run.
//!
//! Build with `add_vertex` / `add_edge(producer, consumer)`; both validate at
//! add time (dangling edges and cycles are build-time failures). Then
//! `compile()` to get a [`CompiledTaskGraph`] and `run()` it: vertices are
//! visited in dependency order, each receiving its sole predecessor's
//! [`Slot`] — an immediate value or a pending computation the vertex body
//! awaits itself.

mod executor;
mod graph_error;
mod slot;
mod task_graph;
mod vertex;

pub use executor::{CompiledTaskGraph, RunOutput};
pub use graph_error::GraphError;
pub use slot::{PendingValue, Slot};
pub use task_graph::TaskGraph;
pub use vertex::{FnVertex, Vertex, VertexKind};
