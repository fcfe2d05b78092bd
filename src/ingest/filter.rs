//! File filtering: decide which fetched files are worth indexing.
//!
//! The filter is a pure function over the file list. Rules run in a fixed
//! order and the first failing rule records the rejection reason.

use crate::models::RawFile;

/// Minimum file size considered indexable.
pub const MIN_FILE_BYTES: usize = 10;
/// Maximum file size considered indexable (also the per-file fetch cap).
pub const MAX_FILE_BYTES: usize = 512_000;

const DENIED_DIRS: &[&str] = &[
    "node_modules",
    "dist",
    "build",
    "out",
    ".next",
    ".nuxt",
    ".output",
    ".cache",
    "__pycache__",
    ".pytest_cache",
    "vendor",
    "venv",
    ".venv",
    "env",
    "__pypackages__",
    ".git",
    ".svn",
    ".hg",
    ".idea",
    ".vscode",
    "coverage",
    ".nyc_output",
    "htmlcov",
    "tmp",
    "temp",
    "logs",
    ".pnp",
];

const DENIED_FILENAMES: &[&str] = &[
    // Lockfiles
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "poetry.lock",
    "Pipfile.lock",
    "composer.lock",
    // OS artifacts
    ".DS_Store",
    "Thumbs.db",
    // Env files
    ".env",
    ".env.local",
    ".env.production",
    // Dotfile configs
    ".gitignore",
    ".gitattributes",
    ".editorconfig",
    ".prettierrc",
    // Test configs
    "vitest.config.ts",
];

const ALLOWED_EXTENSIONS: &[&str] = &[
    ".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs", ".py", ".md", ".mdx", ".json", ".yaml", ".yml",
    ".toml",
];

/// A file the filter rejected, with the first rule that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedFile {
    pub path: String,
    pub reason: &'static str,
}

#[derive(Debug, Default)]
pub struct FilterResult {
    pub accepted: Vec<RawFile>,
    pub rejected: Vec<RejectedFile>,
}

/// Whether a directory name is on the denylist.
///
/// Matches exact names plus the `*.egg-info` pattern.
pub fn is_denied_dir(name: &str) -> bool {
    DENIED_DIRS.contains(&name) || name.ends_with(".egg-info")
}

/// Whether a basename is on the filename denylist.
///
/// Matches exact names plus the `.eslintrc*` and `jest.config.*` families.
pub fn is_denied_filename(name: &str) -> bool {
    DENIED_FILENAMES.contains(&name)
        || name.starts_with(".eslintrc")
        || name.starts_with("jest.config.")
}

/// Whether a path carries an allowlisted extension.
pub fn is_supported_extension(path: &str) -> bool {
    ALLOWED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Whether any non-basename path segment is denylisted.
pub fn has_denied_segment(path: &str) -> bool {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() < 2 {
        return false;
    }
    segments[..segments.len() - 1]
        .iter()
        .any(|s| is_denied_dir(s))
}

/// Partition files into accepted and rejected sets.
///
/// Deterministic and side-effect-free: the outcome depends only on the
/// input files. Rules are evaluated in order; the first failure wins.
pub fn filter(files: Vec<RawFile>) -> FilterResult {
    let mut result = FilterResult::default();

    for file in files {
        match rejection_reason(&file) {
            None => result.accepted.push(file),
            Some(reason) => result.rejected.push(RejectedFile {
                path: file.path,
                reason,
            }),
        }
    }

    result
}

fn rejection_reason(file: &RawFile) -> Option<&'static str> {
    if has_denied_segment(&file.path) {
        return Some("path contains a denylisted directory");
    }

    let basename = file.path.rsplit('/').next().unwrap_or(&file.path);
    if is_denied_filename(basename) {
        return Some("denylisted filename");
    }

    if !is_supported_extension(&file.path) {
        return Some("unsupported file extension");
    }

    if file.size_bytes < MIN_FILE_BYTES {
        return Some("file too small");
    }
    if file.size_bytes > MAX_FILE_BYTES {
        return Some("file too large");
    }

    if file.content.contains('\0') {
        return Some("binary content");
    }

    None
}
