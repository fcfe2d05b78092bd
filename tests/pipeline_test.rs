//! Integration tests for the indexing and query pipeline.
//!
//! These exercise the full filter → chunk → assemble flow over synthetic
//! repositories, without requiring Postgres, GitHub, or an LLM.

use repo_rag::chunking::{self, ChunkStrategy, MAX_CHUNK_LINES, MIN_CHUNK_LINES};
use repo_rag::github::parse_github_url;
use repo_rag::ingest::fetcher::{api_strategy_applies, is_fetchable_entry};
use repo_rag::ingest::filter;
use repo_rag::ingest::{chunk_files, filter::filter as run_filter};
use repo_rag::models::{QueryRequest, RawFile, RetrievedChunk};
use repo_rag::rag::{assemble, query::validate, NO_RESULTS_ANSWER};
use repo_rag::store::writer::{decide_strategy, WriteStrategy};

/// Helper: a small TypeScript web service.
fn sample_ts_project() -> Vec<RawFile> {
    let server = r#"import { createServer } from 'http';
import { router } from './router';

export function startServer(port: number) {
  const server = createServer(router);
  server.listen(port);
  return server;
}

export const shutdown = async (server: any) => {
  await new Promise((resolve) => server.close(resolve));
};
"#;

    let auth = r#"export class AuthService {
  private tokens = new Map<string, string>();

  issue(userId: string): string {
    const token = crypto.randomUUID();
    this.tokens.set(token, userId);
    return token;
  }

  verify(token: string): string | undefined {
    return this.tokens.get(token);
  }
}
"#;

    vec![
        raw("src/server.ts", server),
        raw("src/auth.ts", auth),
        raw(
            "node_modules/express/index.js",
            "module.exports = require('./lib/express');\n",
        ),
        raw(
            "package-lock.json",
            "{\"lockfileVersion\": 3, \"packages\": {}}\n",
        ),
        raw(
            "README.md",
            "# Demo Service\n\nA tiny HTTP service used in tests.\n",
        ),
    ]
}

fn raw(path: &str, content: &str) -> RawFile {
    RawFile {
        path: path.to_string(),
        content: content.to_string(),
        size_bytes: content.len(),
    }
}

#[test]
fn test_filter_then_chunk_end_to_end() {
    let result = run_filter(sample_ts_project());

    // node_modules and the lockfile are gone, sources and README remain
    assert_eq!(result.accepted.len(), 3);
    assert_eq!(result.rejected.len(), 2);

    let chunks = chunk_files("demo/service", &result.accepted);
    assert!(!chunks.is_empty());

    // Symbol-aware chunking found the TS declarations
    let symbols: Vec<&str> = chunks
        .iter()
        .filter_map(|c| c.symbol_name.as_deref())
        .collect();
    assert!(symbols.contains(&"startServer"));
    assert!(symbols.contains(&"shutdown"));
    assert!(symbols.contains(&"AuthService"));

    // Every chunk respects the size bounds and carries the repo id
    for chunk in &chunks {
        let len = chunk.end_line - chunk.start_line + 1;
        assert!((MIN_CHUNK_LINES..=MAX_CHUNK_LINES).contains(&len));
        assert_eq!(chunk.repo_id, "demo/service");
    }
}

#[test]
fn test_chunk_ids_stable_across_runs() {
    let files = sample_ts_project();
    let first = run_filter(files.clone());
    let second = run_filter(files);

    let ids_a: Vec<String> = chunk_files("demo/service", &first.accepted)
        .into_iter()
        .map(|c| c.id)
        .collect();
    let ids_b: Vec<String> = chunk_files("demo/service", &second.accepted)
        .into_iter()
        .map(|c| c.id)
        .collect();

    assert_eq!(ids_a, ids_b);
}

#[test]
fn test_python_project_symbols() {
    let app = r#"import json


def load_config(path):
    with open(path) as fh:
        return json.load(fh)


async def handle_request(request):
    config = load_config('app.json')
    return {'status': 'ok', 'debug': config.get('debug')}


class Router:
    def __init__(self):
        self.routes = {}

    def add(self, path, handler):
        self.routes[path] = handler
"#;

    let files = vec![raw("app.py", app)];

    let chunks = chunk_files("demo/pyservice", &files);
    let symbols: Vec<&str> = chunks
        .iter()
        .filter_map(|c| c.symbol_name.as_deref())
        .collect();

    assert!(symbols.contains(&"load_config"));
    assert!(symbols.contains(&"handle_request"));
    assert!(symbols.contains(&"Router"));
    assert!(chunks.iter().all(|c| c.language == "python"));
}

#[test]
fn test_symbolless_files_use_sliding_window() {
    let yaml: String = (0..130)
        .map(|i| format!("key_{i}: value_{i}\n"))
        .collect();
    let result = chunking::chunk_file("demo/config", "deploy.yaml", &yaml);

    assert_eq!(result.strategy, ChunkStrategy::SlidingWindow);
    assert!(result.chunks.len() >= 2);
    assert!(result.chunks.iter().all(|c| c.symbol_name.is_none()));

    // Consecutive windows overlap by the configured amount
    let overlap = result.chunks[0].end_line - result.chunks[1].start_line + 1;
    assert_eq!(overlap, chunking::SLIDING_WINDOW_OVERLAP);
}

// ─── URL and strategy scenarios ──────────────────────────

#[test]
fn test_invalid_url_is_rejected_before_enqueue() {
    assert!(parse_github_url("not-a-url").is_err());
    assert!(parse_github_url("https://example.com/a/b").is_err());
}

#[test]
fn test_url_variants_resolve_to_same_repo() {
    let variants = [
        "https://github.com/octocat/Hello-World",
        "https://github.com/octocat/Hello-World.git",
        "https://github.com/octocat/Hello-World/tree/main",
        "github.com/octocat/Hello-World",
    ];
    for url in variants {
        assert_eq!(
            parse_github_url(url).unwrap().repo_id(),
            "octocat/Hello-World",
            "{url}"
        );
    }
}

#[test]
fn test_resubmit_same_commit_skips() {
    // First submission: no stored hash, incoming hash → full reindex.
    assert_eq!(
        decide_strategy(None, Some("aa11")),
        WriteStrategy::FullReindex
    );
    // Second submission with the identical head commit → skipped.
    assert_eq!(
        decide_strategy(Some("aa11"), Some("aa11")),
        WriteStrategy::Skipped
    );
    // A push changes the hash → full reindex replaces the old chunks.
    assert_eq!(
        decide_strategy(Some("aa11"), Some("bb22")),
        WriteStrategy::FullReindex
    );
}

#[test]
fn test_large_repo_selects_clone_fallback() {
    // 1500 files exceeds the API ceiling regardless of size.
    assert!(!api_strategy_applies(1500, 10 * 1024, false));
    // A truncated tree listing also forces the fallback.
    assert!(!api_strategy_applies(900, 10 * 1024, true));
    // Within both limits the API path is used.
    assert!(api_strategy_applies(900, 10 * 1024, false));
}

#[test]
fn test_tree_prefilter_matches_filter_rules() {
    assert!(is_fetchable_entry("src/index.ts", 2_000));
    assert!(!is_fetchable_entry("dist/bundle.js", 2_000));
    assert!(!is_fetchable_entry("assets/logo.svg", 2_000));
    assert!(!is_fetchable_entry(
        "data/huge.json",
        filter::MAX_FILE_BYTES as u64 + 1
    ));
}

// ─── Query-path scenarios ────────────────────────────────

#[test]
fn test_short_query_rejected_with_exact_message() {
    let err = validate(&QueryRequest {
        repo_id: "o/r".to_string(),
        query: "ok".to_string(),
        top_k: None,
    })
    .unwrap_err();
    assert_eq!(err.to_string(), "query must be at least 3 characters");
}

#[test]
fn test_no_results_answer_mentions_no_relevant_code() {
    assert!(NO_RESULTS_ANSWER.contains("No relevant code was found"));
}

#[test]
fn test_assembled_context_cites_retrieved_chunks() {
    let chunks = vec![
        RetrievedChunk {
            file_path: "src/auth.ts".to_string(),
            start_line: 1,
            end_line: 13,
            symbol_name: Some("AuthService".to_string()),
            content: "export class AuthService { /* ... */ }".to_string(),
            language: "typescript".to_string(),
            score: 0.91,
        },
        RetrievedChunk {
            file_path: "src/server.ts".to_string(),
            start_line: 4,
            end_line: 8,
            symbol_name: Some("startServer".to_string()),
            content: "export function startServer(port: number) { /* ... */ }".to_string(),
            language: "typescript".to_string(),
            score: 0.77,
        },
    ];

    let ctx = assemble("where is auth handled?", &chunks, "demo/service");

    assert!(ctx.user_prompt.contains("### src/auth.ts"));
    assert!(ctx.user_prompt.contains("[1] `AuthService` (lines 1–13)"));
    assert!(ctx.user_prompt.contains("[2] `startServer` (lines 4–8)"));
    assert!(ctx.user_prompt.contains("where is auth handled?"));
    assert_eq!(ctx.citation_map.len(), 2);
    assert_eq!(ctx.citation_map["[1]"].file_path, "src/auth.ts");
    assert!(ctx.token_estimate > 0);
}
