//! GitHub URL parsing.

use crate::error::Error;

/// `owner/repo` extracted from a GitHub URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    /// The canonical `{owner}/{repo}` identifier used as the index key.
    pub fn repo_id(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// Parse a GitHub repository URL into `owner/repo`.
///
/// Accepts `https://github.com/<owner>/<repo>` with or without a scheme or
/// `www.` prefix, a trailing `.git`, or a `/tree/<ref>` suffix. Anything
/// else is rejected.
pub fn parse_github_url(url: &str) -> Result<RepoRef, Error> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("Invalid GitHub URL".to_string()));
    }

    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);

    let path = rest
        .strip_prefix("github.com/")
        .ok_or_else(|| Error::InvalidInput("Invalid GitHub URL".to_string()))?;

    // Drop any branch/tree suffix before splitting
    let path = match path.find("/tree/") {
        Some(pos) => &path[..pos],
        None => path,
    };

    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let owner = segments.next();
    let repo = segments.next();
    let extra = segments.next();

    match (owner, repo, extra) {
        (Some(owner), Some(repo), None) => {
            let repo = repo.trim_end_matches(".git");
            if owner.is_empty() || repo.is_empty() {
                return Err(Error::InvalidInput("Invalid GitHub URL".to_string()));
            }
            Ok(RepoRef {
                owner: owner.to_string(),
                repo: repo.to_string(),
            })
        }
        _ => Err(Error::InvalidInput("Invalid GitHub URL".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_url() {
        let r = parse_github_url("https://github.com/octocat/Hello-World").unwrap();
        assert_eq!(r.owner, "octocat");
        assert_eq!(r.repo, "Hello-World");
        assert_eq!(r.repo_id(), "octocat/Hello-World");
    }

    #[test]
    fn test_parse_strips_git_suffix() {
        let r = parse_github_url("https://github.com/octocat/Hello-World.git").unwrap();
        assert_eq!(r.repo, "Hello-World");
    }

    #[test]
    fn test_parse_strips_tree_suffix() {
        let r = parse_github_url("https://github.com/octocat/Hello-World/tree/main/src").unwrap();
        assert_eq!(r.repo_id(), "octocat/Hello-World");
    }

    #[test]
    fn test_parse_without_scheme() {
        let r = parse_github_url("github.com/octocat/Hello-World").unwrap();
        assert_eq!(r.repo_id(), "octocat/Hello-World");
    }

    #[test]
    fn test_parse_with_www() {
        let r = parse_github_url("https://www.github.com/octocat/Hello-World").unwrap();
        assert_eq!(r.repo_id(), "octocat/Hello-World");
    }

    #[test]
    fn test_parse_trailing_slash() {
        let r = parse_github_url("https://github.com/octocat/Hello-World/").unwrap();
        assert_eq!(r.repo_id(), "octocat/Hello-World");
    }

    #[test]
    fn test_rejects_not_a_url() {
        assert!(parse_github_url("not-a-url").is_err());
    }

    #[test]
    fn test_rejects_other_host() {
        assert!(parse_github_url("https://gitlab.com/owner/repo").is_err());
    }

    #[test]
    fn test_rejects_missing_repo() {
        assert!(parse_github_url("https://github.com/octocat").is_err());
    }

    #[test]
    fn test_rejects_extra_segments() {
        assert!(parse_github_url("https://github.com/a/b/c").is_err());
    }

    #[test]
    fn test_rejects_empty() {
        assert!(parse_github_url("").is_err());
        assert!(parse_github_url("   ").is_err());
    }

    #[test]
    fn test_round_trip_formats() {
        for url in [
            "https://github.com/rust-lang/cargo",
            "https://github.com/rust-lang/cargo.git",
            "https://github.com/rust-lang/cargo/tree/master",
        ] {
            let r = parse_github_url(url).unwrap();
            assert_eq!(r.owner, "rust-lang");
            assert_eq!(r.repo, "cargo");
        }
    }
}
