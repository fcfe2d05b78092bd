//! TTL cache for repository metadata lookups.
//!
//! Repo metadata (default branch, size) changes rarely; retried jobs and
//! resubmissions of the same repo reuse it instead of spending GitHub rate
//! limit. Head-commit lookups are never cached, freshness is their point.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::RepoInfo;

pub struct RepoInfoCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, RepoInfo)>>,
}

impl RepoInfoCache {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            ttl: Duration::from_secs(ttl_seconds),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, repo_id: &str) -> Option<RepoInfo> {
        let entries = self.entries.lock();
        entries.get(repo_id).and_then(|(stored_at, info)| {
            if stored_at.elapsed() < self.ttl {
                Some(info.clone())
            } else {
                None
            }
        })
    }

    pub fn put(&self, repo_id: &str, info: RepoInfo) {
        let mut entries = self.entries.lock();
        // Drop expired entries opportunistically so the map stays bounded
        // by the set of repos seen within one TTL window.
        let ttl = self.ttl;
        entries.retain(|_, (stored_at, _)| stored_at.elapsed() < ttl);
        entries.insert(repo_id.to_string(), (Instant::now(), info));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(branch: &str) -> RepoInfo {
        RepoInfo {
            default_branch: branch.to_string(),
            size: 42,
        }
    }

    #[test]
    fn test_hit_within_ttl() {
        let cache = RepoInfoCache::new(3600);
        cache.put("o/r", info("main"));
        assert_eq!(cache.get("o/r").unwrap().default_branch, "main");
    }

    #[test]
    fn test_miss_for_unknown_repo() {
        let cache = RepoInfoCache::new(3600);
        assert!(cache.get("ghost/missing").is_none());
    }

    #[test]
    fn test_zero_ttl_never_hits() {
        let cache = RepoInfoCache::new(0);
        cache.put("o/r", info("main"));
        assert!(cache.get("o/r").is_none());
    }

    #[test]
    fn test_put_replaces_entry() {
        let cache = RepoInfoCache::new(3600);
        cache.put("o/r", info("main"));
        cache.put("o/r", info("develop"));
        assert_eq!(cache.get("o/r").unwrap().default_branch, "develop");
    }
}
