//! Error types shared across the indexing and query pipelines.

use thiserror::Error;

/// Errors raised by the indexing and retrieval components.
///
/// The orchestrator treats `InvalidInput` as terminal (never retried) and
/// everything else as retriable up to the job's attempt ceiling. The query
/// path maps variants onto HTTP status codes in `api::query`.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed user input: bad repo URL, short query, empty repo id.
    #[error("{0}")]
    InvalidInput(String),

    /// Upstream returned 429 or an explicit rate-limit signal.
    #[error("rate limited by {service}: {detail}")]
    RateLimited { service: &'static str, detail: String },

    /// Transient network or filesystem failure worth a job retry.
    #[error("transient I/O failure: {0}")]
    TransientIo(String),

    /// Vector store failure; fatal to the current operation.
    #[error("vector store error: {0}")]
    VectorStore(#[from] sqlx::Error),

    /// LLM provider failure on the query path; surfaced as 500, not retried.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Status poll for a job id the queue does not know.
    #[error("unknown job: {0}")]
    JobUnknown(uuid::Uuid),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the orchestrator should re-enqueue the job after this error.
    pub fn is_retriable(&self) -> bool {
        !matches!(self, Error::InvalidInput(_) | Error::JobUnknown(_))
    }
}
