//! GitHub acquisition: URL parsing, REST API client, shallow-clone fallback.

pub mod api;
pub mod cache;
pub mod clone;
pub mod url;

pub use api::{GithubClient, RepoInfo, TreeEntry, TreeListing};
pub use cache::RepoInfoCache;
pub use url::{parse_github_url, RepoRef};
