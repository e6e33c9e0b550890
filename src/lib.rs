#![deny(unstable_features)]
#![deny(trivial_casts)]
#![deny(unconditional_recursion)]
#![deny(clippy::empty_loop)]
#![deny(unreachable_code)]
#![deny(unreachable_pub)]
#![deny(unreachable_patterns)]
#![deny(unused_macro_rules)]
#![deny(unused_doc_comments)]

//! Concurrent shortest-collaboration-path engine over an actor co-starring
//! graph.
//!
//! Five pieces, built leaves-first: [`actors`] holds the vertex set,
//! [`graph_loader`] fills in adjacency lists in parallel, [`signal_coordinator`]
//! mediates shutdown, [`dispatcher`] serves queries off a named pipe, and
//! [`bfs`] answers each one.

pub mod actors;
pub mod bfs;
pub mod dispatcher;
pub mod error;
pub mod explored_set;
pub mod frontier;
pub mod graph_loader;
pub mod signal_coordinator;

/// Prelude module to import everything from this crate.
pub mod prelude {
    pub use crate::actors::{Actor, VertexStore};
    pub use crate::dispatcher::QueryMessage;
    pub use crate::error::CamminiError;
    pub use crate::signal_coordinator::Flags;
}
