//! Indexing endpoints: job submission and status polling.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::error_response;
use crate::github::parse_github_url;
use crate::models::{IndexRepoJobData, IndexRequest, IndexResponse, JobStatus};
use crate::state::AppState;

/// POST /api/index - validate the URL and enqueue an indexing job.
pub async fn submit(
    State(state): State<AppState>,
    Json(req): Json<IndexRequest>,
) -> Result<(StatusCode, Json<IndexResponse>), (StatusCode, Json<Value>)> {
    let github_url = req.github_url.trim().to_string();

    // Reject before enqueueing so bad URLs never reach the queue.
    if parse_github_url(&github_url).is_err() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid GitHub URL" })),
        ));
    }

    let job_id = state
        .queue
        .enqueue(&IndexRepoJobData {
            github_url: github_url.clone(),
            github_token: None,
            requested_by: None,
        })
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(IndexResponse {
            message: "Indexing started".to_string(),
            job_id,
            github_url,
        }),
    ))
}

/// GET /api/index/status/{job_id}
pub async fn status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatus>, (StatusCode, Json<Value>)> {
    // A malformed id is indistinguishable from an unknown job to callers.
    let id = Uuid::parse_str(&job_id).map_err(|_| {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "unknown job" })),
        )
    })?;

    let status = state.queue.status(id).await.map_err(error_response)?;
    Ok(Json(status))
}
