//! Query service: validate, retrieve, assemble, generate.

use crate::error::Error;
use crate::llm::generate_answer;
use crate::models::{QueryChunk, QueryMeta, QueryRequest, QueryResponse};
use crate::rag::context;
use crate::state::AppState;
use crate::store::DEFAULT_TOP_K;

/// Cap on the caller-supplied `top_k`.
const MAX_TOP_K: usize = 50;

/// Answer returned when nothing clears the similarity floor.
pub const NO_RESULTS_ANSWER: &str =
    "No relevant code was found in the indexed repository for this question. \
     The repository may not be indexed yet, or the question may not match its contents.";

#[derive(Debug, PartialEq, Eq)]
pub struct ValidatedQuery {
    pub repo_id: String,
    pub query: String,
    pub top_k: usize,
}

/// Validate a query request. `top_k` is a hard upper bound, applied after
/// the similarity threshold.
pub fn validate(req: &QueryRequest) -> Result<ValidatedQuery, Error> {
    let repo_id = req.repo_id.trim().to_string();
    if repo_id.is_empty() {
        return Err(Error::InvalidInput("repo_id is required".to_string()));
    }

    let query = req.query.trim().to_string();
    if query.len() < 3 {
        return Err(Error::InvalidInput(
            "query must be at least 3 characters".to_string(),
        ));
    }

    let top_k = req.top_k.unwrap_or(DEFAULT_TOP_K).clamp(1, MAX_TOP_K);

    Ok(ValidatedQuery {
        repo_id,
        query,
        top_k,
    })
}

/// Run the full query pipeline and produce an answer with citations.
pub async fn answer_query(state: &AppState, req: QueryRequest) -> Result<QueryResponse, Error> {
    let validated = validate(&req)?;

    let query_embedding = state.embedder.embed_query(&validated.query).await?;
    let retrieval = state
        .store
        .retrieve(&query_embedding, &validated.repo_id, validated.top_k)
        .await?;

    if retrieval.chunks.is_empty() {
        return Ok(QueryResponse {
            answer: NO_RESULTS_ANSWER.to_string(),
            citations: Default::default(),
            chunks: Vec::new(),
            meta: QueryMeta {
                repo_id: validated.repo_id,
                retrieved: 0,
                total_candidates: retrieval.total_candidates,
                token_estimate: 0,
                retrieval_ms: retrieval.duration_ms,
            },
        });
    }

    let assembled = context::assemble(&validated.query, &retrieval.chunks, &validated.repo_id);
    let answer = generate_answer(
        &state.http_client,
        &state.config.llm,
        &assembled.system_prompt,
        &assembled.user_prompt,
    )
    .await?;

    let chunks: Vec<QueryChunk> = retrieval
        .chunks
        .iter()
        .map(|c| QueryChunk {
            file_path: c.file_path.clone(),
            start_line: c.start_line,
            end_line: c.end_line,
            symbol_name: c.symbol_name.clone(),
            score: round4(c.score),
            language: c.language.clone(),
        })
        .collect();

    Ok(QueryResponse {
        answer,
        citations: assembled.citation_map,
        meta: QueryMeta {
            repo_id: validated.repo_id,
            retrieved: chunks.len(),
            total_candidates: retrieval.total_candidates,
            token_estimate: assembled.token_estimate,
            retrieval_ms: retrieval.duration_ms,
        },
        chunks,
    })
}

fn round4(score: f64) -> f64 {
    (score * 10_000.0).round() / 10_000.0
}
