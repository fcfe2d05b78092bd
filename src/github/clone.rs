//! Shallow-clone fallback for repositories too large for the metadata API.

use anyhow::Context;
use std::path::Path;
use walkdir::WalkDir;

use crate::error::Error;
use crate::ingest::filter::{is_denied_dir, is_supported_extension, MAX_FILE_BYTES};
use crate::models::RawFile;

/// Clone `url` at depth 1 (single branch) and read its indexable files.
///
/// The clone lands in a unique temp directory owned by a `TempDir` guard, so
/// the checkout is removed on every exit path, including panics during the
/// walk. Blocking; callers run it inside `spawn_blocking`.
pub fn clone_and_read(url: &str, branch: &str, token: Option<&str>) -> Result<Vec<RawFile>, Error> {
    let tmp = tempfile::tempdir()
        .map_err(|e| Error::TransientIo(format!("failed to create temp dir: {e}")))?;

    clone_shallow(url, branch, token, tmp.path())
        .with_context(|| format!("Failed to clone {url}"))
        .map_err(|e| Error::TransientIo(format!("{e:#}")))?;

    Ok(read_repo_files(tmp.path()))
}

fn clone_shallow(url: &str, branch: &str, token: Option<&str>, target: &Path) -> anyhow::Result<()> {
    tracing::info!("Cloning {url} (branch {branch}, depth 1) into {}", target.display());

    let mut callbacks = git2::RemoteCallbacks::new();
    if let Some(token) = token {
        let token = token.to_string();
        callbacks.credentials(move |_url, _user, _allowed| {
            git2::Cred::userpass_plaintext("x-access-token", &token)
        });
    }

    let mut fetch_options = git2::FetchOptions::new();
    fetch_options.remote_callbacks(callbacks);
    fetch_options.depth(1);

    git2::build::RepoBuilder::new()
        .branch(branch)
        .fetch_options(fetch_options)
        .clone(url, target)?;

    tracing::info!("Clone complete: {}", target.display());
    Ok(())
}

/// Walk a checkout and read candidate files into memory.
///
/// Applies the same directory, extension, and size rules as the metadata-API
/// path so both acquisition strategies feed identical inputs to the filter.
fn read_repo_files(repo_dir: &Path) -> Vec<RawFile> {
    let mut files = Vec::new();

    for entry in WalkDir::new(repo_dir)
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e))
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if !is_supported_extension(&path.to_string_lossy()) {
            continue;
        }

        if let Ok(meta) = std::fs::metadata(path) {
            if meta.len() > MAX_FILE_BYTES as u64 {
                continue;
            }
        }

        let relative = path
            .strip_prefix(repo_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");

        match std::fs::read_to_string(path) {
            Ok(content) => {
                let size_bytes = content.len();
                files.push(RawFile {
                    path: relative,
                    content,
                    size_bytes,
                });
            }
            Err(_) => {
                // Not valid UTF-8; the binary heuristic would reject it anyway
                continue;
            }
        }
    }

    files
}

fn is_skipped_dir(entry: &walkdir::DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    is_denied_dir(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn make_repo_dir() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("repo");
        fs::create_dir_all(&root).unwrap();
        (dir, root)
    }

    #[test]
    fn test_read_repo_files_basic() {
        let (_dir, root) = make_repo_dir();

        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/index.ts"), "export const x = 1;").unwrap();
        fs::write(root.join("README.md"), "# Hello").unwrap();

        let files = read_repo_files(&root);
        assert_eq!(files.len(), 2);

        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert!(paths.contains(&"src/index.ts"));
        assert!(paths.contains(&"README.md"));
    }

    #[test]
    fn test_read_repo_files_skips_node_modules() {
        let (_dir, root) = make_repo_dir();

        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "// dep").unwrap();
        fs::write(root.join("index.js"), "// app").unwrap();

        let files = read_repo_files(&root);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "index.js");
    }

    #[test]
    fn test_read_repo_files_skips_unsupported_extensions() {
        let (_dir, root) = make_repo_dir();

        fs::write(root.join("app.py"), "print('hi')").unwrap();
        fs::write(root.join("photo.png"), "fake png data").unwrap();
        fs::write(root.join("lib.rs"), "fn main() {}").unwrap();

        let files = read_repo_files(&root);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "app.py");
    }

    #[test]
    fn test_read_repo_files_skips_git_dir() {
        let (_dir, root) = make_repo_dir();

        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join(".git/config.json"), "{}").unwrap();
        fs::write(root.join("visible.ts"), "const a = 1;").unwrap();

        let files = read_repo_files(&root);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "visible.ts");
    }

    #[test]
    fn test_read_empty_directory() {
        let (_dir, root) = make_repo_dir();
        assert!(read_repo_files(&root).is_empty());
    }
}
