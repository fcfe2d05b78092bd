//! Axum HTTP handlers.

pub mod health;
pub mod index;
pub mod query;

use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::error::Error;

/// Map pipeline errors onto stable JSON bodies: `error` always, `detail`
/// only on 500s.
pub(crate) fn error_response(err: Error) -> (StatusCode, Json<Value>) {
    match err {
        Error::InvalidInput(msg) => (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))),
        Error::JobUnknown(_) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "unknown job" })),
        ),
        Error::Llm(detail) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "LLM generation failed", "detail": detail })),
        ),
        Error::VectorStore(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "vector store error", "detail": e.to_string() })),
        ),
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "internal error", "detail": other.to_string() })),
        ),
    }
}
