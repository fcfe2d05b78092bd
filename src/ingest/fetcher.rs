//! Repository acquisition: metadata API first, shallow clone as fallback.

use crate::error::Error;
use crate::github::{clone, GithubClient, RepoInfo, RepoRef};
use crate::ingest::filter::{has_denied_segment, is_supported_extension, MAX_FILE_BYTES};
use crate::models::{RawFile, RepoMeta};

/// Above either threshold the metadata API is abandoned for a clone.
pub const API_MAX_FILES: usize = 1000;
pub const API_MAX_SIZE_KB: u64 = 50 * 1024;

#[derive(Debug)]
pub struct FetchOutput {
    pub files: Vec<RawFile>,
    pub meta: RepoMeta,
}

/// Whether the metadata-API strategy applies.
pub fn api_strategy_applies(file_count: usize, size_kb: u64, truncated: bool) -> bool {
    !truncated && file_count <= API_MAX_FILES && size_kb <= API_MAX_SIZE_KB
}

/// Whether a tree entry is worth downloading at all.
///
/// Mirrors the filter's path and extension rules plus the per-file fetch
/// cap, so obviously-unindexable blobs are never pulled over the network.
pub fn is_fetchable_entry(path: &str, size: u64) -> bool {
    !has_denied_segment(path) && is_supported_extension(path) && size <= MAX_FILE_BYTES as u64
}

/// Acquire a repository's candidate files.
///
/// Small repos go through the tree + blob APIs; large or truncated listings
/// fall back to a shallow clone. Either way the returned paths are
/// repo-root-relative with forward slashes.
pub async fn fetch_repo(
    github: &GithubClient,
    repo_ref: &RepoRef,
    info: &RepoInfo,
    clone_token: Option<&str>,
) -> Result<FetchOutput, Error> {
    let owner = &repo_ref.owner;
    let repo = &repo_ref.repo;
    let branch = &info.default_branch;

    if info.size <= API_MAX_SIZE_KB {
        let tree = github.tree(owner, repo, branch).await?;
        if api_strategy_applies(tree.entries.len(), info.size, tree.truncated) {
            let paths: Vec<String> = tree
                .entries
                .iter()
                .filter(|e| is_fetchable_entry(&e.path, e.size))
                .map(|e| e.path.clone())
                .collect();

            tracing::info!(
                "{owner}/{repo}: fetching {} of {} blobs via API",
                paths.len(),
                tree.entries.len()
            );

            let files = github.fetch_files(owner, repo, branch, &paths).await;
            let file_count = files.len();
            return Ok(FetchOutput {
                files,
                meta: RepoMeta {
                    repo_id: repo_ref.repo_id(),
                    owner: owner.clone(),
                    repo: repo.clone(),
                    default_branch: branch.clone(),
                    size_kb: info.size,
                    file_count,
                    used_fallback: false,
                },
            });
        }
        tracing::info!(
            "{owner}/{repo}: tree has {} entries (truncated: {}), using clone fallback",
            tree.entries.len(),
            tree.truncated
        );
    } else {
        tracing::info!(
            "{owner}/{repo}: {} KB exceeds API threshold, using clone fallback",
            info.size
        );
    }

    let clone_url = format!("https://github.com/{owner}/{repo}.git");
    let branch_owned = branch.clone();
    let token_owned = clone_token.map(|t| t.to_string());
    let files = tokio::task::spawn_blocking(move || {
        clone::clone_and_read(&clone_url, &branch_owned, token_owned.as_deref())
    })
    .await
    .map_err(|e| Error::TransientIo(format!("clone task panicked: {e}")))??;

    let file_count = files.len();
    Ok(FetchOutput {
        files,
        meta: RepoMeta {
            repo_id: repo_ref.repo_id(),
            owner: owner.clone(),
            repo: repo.clone(),
            default_branch: branch.clone(),
            size_kb: info.size,
            file_count,
            used_fallback: true,
        },
    })
}
