//! GitHub REST API client: repo metadata, tree listing, blob contents.

use futures_util::future::join_all;
use serde::Deserialize;

use crate::error::Error;
use crate::models::RawFile;

const API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("repo-rag/", env!("CARGO_PKG_VERSION"));

/// Blob fetches issued per parallel batch.
const BLOB_BATCH_SIZE: usize = 20;

/// Repository metadata from `GET /repos/{owner}/{repo}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoInfo {
    pub default_branch: String,
    /// Repository size in kilobytes, as reported by GitHub
    pub size: u64,
}

/// One blob entry of a recursive tree listing.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct TreeListing {
    pub entries: Vec<TreeEntry>,
    pub truncated: bool,
}

#[derive(Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct CommitResponse {
    sha: String,
}

/// Thin wrapper over the GitHub REST API.
///
/// All methods classify upstream failures: 429 (or 403 with an exhausted
/// rate-limit header) maps to `RateLimited`, transport errors to
/// `TransientIo`, and a missing repository to `InvalidInput` so the
/// orchestrator does not retry it.
#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(http: reqwest::Client, token: Option<String>) -> Self {
        Self { http, token }
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut req = self.http.get(url).header("User-Agent", USER_AGENT);
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        req
    }

    async fn get_checked(&self, url: &str, accept: &str) -> Result<reqwest::Response, Error> {
        let resp = self
            .request(url)
            .header("Accept", accept)
            .send()
            .await
            .map_err(|e| Error::TransientIo(format!("GitHub request failed: {e}")))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::InvalidInput(format!("GitHub resource not found: {url}")));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || is_rate_limited(&resp) {
            let detail = resp.text().await.unwrap_or_default();
            return Err(Error::RateLimited {
                service: "github",
                detail,
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::TransientIo(format!(
                "GitHub returned {status} for {url}: {body}"
            )));
        }
        Ok(resp)
    }

    /// Fetch default branch and size for a repository.
    pub async fn repo_metadata(&self, owner: &str, repo: &str) -> Result<RepoInfo, Error> {
        let url = format!("{API_BASE}/repos/{owner}/{repo}");
        let resp = self.get_checked(&url, "application/vnd.github+json").await?;
        resp.json::<RepoInfo>()
            .await
            .map_err(|e| Error::TransientIo(format!("bad repo metadata payload: {e}")))
    }

    /// Recursively list the blob entries of a branch.
    pub async fn tree(&self, owner: &str, repo: &str, branch: &str) -> Result<TreeListing, Error> {
        let url = format!("{API_BASE}/repos/{owner}/{repo}/git/trees/{branch}?recursive=1");
        let resp = self.get_checked(&url, "application/vnd.github+json").await?;
        let body: TreeResponse = resp
            .json()
            .await
            .map_err(|e| Error::TransientIo(format!("bad tree payload: {e}")))?;
        let entries = body
            .tree
            .into_iter()
            .filter(|e| e.kind == "blob")
            .collect();
        Ok(TreeListing {
            entries,
            truncated: body.truncated,
        })
    }

    /// Current head commit SHA of a branch, or `None` on any failure.
    ///
    /// Tolerant on purpose: a missing commit hash downgrades the write
    /// strategy to upsert rather than failing the job.
    pub async fn head_commit_sha(&self, owner: &str, repo: &str, branch: &str) -> Option<String> {
        let url = format!("{API_BASE}/repos/{owner}/{repo}/commits/{branch}");
        match self.get_checked(&url, "application/vnd.github+json").await {
            Ok(resp) => match resp.json::<CommitResponse>().await {
                Ok(c) => Some(c.sha),
                Err(e) => {
                    tracing::warn!("failed to parse commit payload for {owner}/{repo}: {e}");
                    None
                }
            },
            Err(e) => {
                tracing::warn!("failed to fetch head commit for {owner}/{repo}: {e}");
                None
            }
        }
    }

    /// Fetch one file's raw contents from the default branch.
    async fn fetch_raw(&self, owner: &str, repo: &str, branch: &str, path: &str) -> Result<String, Error> {
        let url = format!("{API_BASE}/repos/{owner}/{repo}/contents/{path}?ref={branch}");
        let resp = self.get_checked(&url, "application/vnd.github.raw").await?;
        resp.text()
            .await
            .map_err(|e| Error::TransientIo(format!("failed to read blob body: {e}")))
    }

    /// Fetch many blobs in parallel batches with all-settled semantics.
    ///
    /// Per-file failures are logged and skipped; they never fail the batch.
    pub async fn fetch_files(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        paths: &[String],
    ) -> Vec<RawFile> {
        let mut files = Vec::with_capacity(paths.len());

        for batch in paths.chunks(BLOB_BATCH_SIZE) {
            let futures = batch.iter().map(|path| {
                let path = path.clone();
                async move {
                    let result = self.fetch_raw(owner, repo, branch, &path).await;
                    (path, result)
                }
            });

            for (path, result) in join_all(futures).await {
                match result {
                    Ok(content) => {
                        let size_bytes = content.len();
                        files.push(RawFile {
                            path,
                            content,
                            size_bytes,
                        });
                    }
                    Err(e) => {
                        tracing::warn!("skipping {owner}/{repo}:{path}: {e}");
                    }
                }
            }
        }

        files
    }
}

fn is_rate_limited(resp: &reqwest::Response) -> bool {
    resp.status() == reqwest::StatusCode::FORBIDDEN
        && resp
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == "0")
            .unwrap_or(false)
}
