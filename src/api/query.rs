//! RAG query endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;

use crate::api::error_response;
use crate::models::{QueryRequest, QueryResponse};
use crate::rag;
use crate::state::AppState;

/// POST /api/rag/query - retrieve, assemble, and answer.
pub async fn query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, (StatusCode, Json<Value>)> {
    let response = rag::answer_query(&state, req).await.map_err(error_response)?;
    Ok(Json(response))
}
