//! LLM provider access: batch embeddings and grounded answer generation.

pub mod embeddings;
pub mod generate;

pub use embeddings::EmbeddingClient;
pub use generate::generate_answer;
