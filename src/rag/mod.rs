//! Retrieval-augmented generation: context assembly and the query pipeline.

pub mod context;
pub mod query;

pub use context::{assemble, AssembledContext, MAX_CONTEXT_CHARS};
pub use query::{answer_query, NO_RESULTS_ANSWER};
