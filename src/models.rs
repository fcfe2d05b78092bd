use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A file pulled out of a repository, before filtering.
///
/// `path` is repo-root-relative with forward slashes regardless of platform.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub path: String,
    pub content: String,
    pub size_bytes: usize,
}

/// A contiguous span of a file's lines, the unit of embedding and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeChunk {
    /// Deterministic id: `{safe(repo_id)}__{safe(file_path)}__L{start_line}`
    pub id: String,
    /// `{owner}/{repo}`
    pub repo_id: String,
    pub file_path: String,
    pub language: String,
    pub content: String,
    /// 1-indexed, inclusive
    pub start_line: usize,
    /// 1-indexed, inclusive
    pub end_line: usize,
    pub symbol_name: Option<String>,
    /// 0-based position within the file's emission order
    pub chunk_index: usize,
}

impl CodeChunk {
    pub fn line_count(&self) -> usize {
        self.end_line - self.start_line + 1
    }
}

/// A chunk paired with its embedding vector.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk: CodeChunk,
    /// Unit-length vector of the configured dimension
    pub embedding: Vec<f32>,
    pub embedded_at: DateTime<Utc>,
}

/// Repository metadata gathered before and during fetching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoMeta {
    pub repo_id: String,
    pub owner: String,
    pub repo: String,
    pub default_branch: String,
    pub size_kb: u64,
    pub file_count: usize,
    /// True when the shallow-clone path was used instead of the metadata API
    pub used_fallback: bool,
}

/// One row of the `repo_index` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoIndex {
    pub repo_id: String,
    pub commit_hash: Option<String>,
    pub default_branch: String,
    pub size_kb: i64,
    pub file_count: i32,
    pub chunk_count: i32,
    pub embedding_model: String,
    pub updated_at: DateTime<Utc>,
}

/// A chunk returned by similarity search. `score` is `1 - cosine_distance`.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub symbol_name: Option<String>,
    pub content: String,
    pub language: String,
    pub score: f64,
}

/// Lifecycle state of an indexing job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Active,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Active => "active",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }
}

impl std::str::FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobState::Queued),
            "active" => Ok(JobState::Active),
            "completed" => Ok(JobState::Completed),
            "failed" => Ok(JobState::Failed),
            other => Err(format!("unknown job state: {other}")),
        }
    }
}

/// Payload enqueued for the `index-repo` queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRepoJobData {
    pub github_url: String,
    pub github_token: Option<String>,
    pub requested_by: Option<String>,
}

/// Return value of a completed indexing job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRepoJobResult {
    pub repo_id: String,
    pub strategy: String,
    pub chunks_written: usize,
    pub total_duration_ms: u64,
}

/// A job as seen by the status endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub job_id: Uuid,
    pub state: JobState,
    pub progress: i16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<IndexRepoJobResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_reason: Option<String>,
}

// ─── HTTP request/response types ─────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRequest {
    pub github_url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexResponse {
    pub message: String,
    pub job_id: Uuid,
    pub github_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub repo_id: String,
    pub query: String,
    pub top_k: Option<usize>,
}

/// A citation marker resolved to its source location.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_name: Option<String>,
}

/// Chunk projection returned alongside the answer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryChunk {
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_name: Option<String>,
    pub score: f64,
    pub language: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub citations: std::collections::BTreeMap<String, Citation>,
    pub chunks: Vec<QueryChunk>,
    pub meta: QueryMeta,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMeta {
    pub repo_id: String,
    pub retrieved: usize,
    pub total_candidates: usize,
    pub token_estimate: usize,
    pub retrieval_ms: u64,
}
