//! Grounded-prompt assembly from retrieved chunks.
//!
//! Chunks are grouped by file and rendered as numbered citation blocks under
//! a character budget. The citation map lets callers verify every `[N]`
//! marker in the generated answer against a real file and line range.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::models::{Citation, RetrievedChunk};

/// Context budget in characters, roughly 3k tokens.
pub const MAX_CONTEXT_CHARS: usize = 12_000;

fn system_prompt(repo_id: &str) -> String {
    format!(
        "You are a code assistant answering questions about the repository {repo_id}.\n\
         Answer ONLY from the provided context blocks; never use outside knowledge.\n\
         Cite sources with their [N] markers and include file paths and line numbers.\n\
         If the context is insufficient to answer, say you don't know.\n\
         Be concise."
    )
}

#[derive(Debug)]
pub struct AssembledContext {
    pub system_prompt: String,
    pub user_prompt: String,
    pub citation_map: BTreeMap<String, Citation>,
    pub token_estimate: usize,
}

/// Build system/user prompts and the citation map for a query.
///
/// Files appear in retrieval insertion order; chunks within a file are
/// sorted by start line. Once the accumulated content exceeds the budget no
/// further chunks are emitted, but the block in progress is kept whole.
pub fn assemble(query: &str, chunks: &[RetrievedChunk], repo_id: &str) -> AssembledContext {
    let groups = group_by_file(chunks);

    let mut blocks = String::new();
    let mut citation_map = BTreeMap::new();
    let mut citation_no = 0usize;
    let mut accumulated = 0usize;
    let mut over_budget = false;

    for (file_path, file_chunks) in &groups {
        if over_budget {
            break;
        }

        if !blocks.is_empty() {
            blocks.push_str("\n\n---\n\n");
        }
        let _ = writeln!(blocks, "### {file_path}");

        for chunk in file_chunks {
            citation_no += 1;
            let marker = format!("[{citation_no}]");

            let header = match &chunk.symbol_name {
                Some(symbol) => format!(
                    "{marker} `{symbol}` (lines {}–{})",
                    chunk.start_line, chunk.end_line
                ),
                None => format!("{marker} lines {}–{}", chunk.start_line, chunk.end_line),
            };

            let _ = write!(
                blocks,
                "\n{header}\n```{}\n{}\n```\n",
                chunk.language, chunk.content
            );

            citation_map.insert(
                marker,
                Citation {
                    file_path: chunk.file_path.clone(),
                    start_line: chunk.start_line,
                    end_line: chunk.end_line,
                    symbol_name: chunk.symbol_name.clone(),
                },
            );

            accumulated += chunk.content.len();
            if accumulated > MAX_CONTEXT_CHARS {
                over_budget = true;
                break;
            }
        }
    }

    let system_prompt = system_prompt(repo_id);
    let user_prompt = format!(
        "## Codebase Context\n\n{blocks}\n\n---\n\n## Question\n\n{query}\n\n## Answer (cite sources with [N] markers)"
    );
    let total_chars = system_prompt.len() + user_prompt.len();

    AssembledContext {
        system_prompt,
        user_prompt,
        citation_map,
        token_estimate: total_chars.div_ceil(4),
    }
}

/// Group chunks by file in insertion order, each group sorted by start line.
fn group_by_file(chunks: &[RetrievedChunk]) -> Vec<(String, Vec<&RetrievedChunk>)> {
    let mut groups: Vec<(String, Vec<&RetrievedChunk>)> = Vec::new();

    for chunk in chunks {
        match groups.iter_mut().find(|(path, _)| path == &chunk.file_path) {
            Some((_, members)) => members.push(chunk),
            None => groups.push((chunk.file_path.clone(), vec![chunk])),
        }
    }

    for (_, members) in &mut groups {
        members.sort_by_key(|c| c.start_line);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(path: &str, start: usize, end: usize, symbol: Option<&str>, content: &str) -> RetrievedChunk {
        RetrievedChunk {
            file_path: path.to_string(),
            start_line: start,
            end_line: end,
            symbol_name: symbol.map(|s| s.to_string()),
            content: content.to_string(),
            language: "typescript".to_string(),
            score: 0.9,
        }
    }

    #[test]
    fn test_citations_numbered_in_order() {
        let chunks = vec![
            hit("src/a.ts", 1, 10, Some("alpha"), "const a = 1;"),
            hit("src/b.ts", 5, 20, None, "const b = 2;"),
        ];
        let ctx = assemble("where is alpha?", &chunks, "o/r");

        assert!(ctx.user_prompt.contains("[1] `alpha` (lines 1–10)"));
        assert!(ctx.user_prompt.contains("[2] lines 5–20"));
        assert_eq!(ctx.citation_map.len(), 2);
        assert_eq!(ctx.citation_map["[1]"].file_path, "src/a.ts");
        assert_eq!(ctx.citation_map["[2]"].file_path, "src/b.ts");
    }

    #[test]
    fn test_citation_totality() {
        // Every [N] emitted into the prompt resolves in the map.
        let chunks: Vec<_> = (0..5)
            .map(|i| hit(&format!("f{i}.ts"), 1, 10, None, "code here"))
            .collect();
        let ctx = assemble("q", &chunks, "o/r");

        for n in 1..=5 {
            let marker = format!("[{n}]");
            assert!(ctx.user_prompt.contains(&marker));
            assert!(ctx.citation_map.contains_key(&marker), "{marker} missing");
        }
    }

    #[test]
    fn test_chunks_grouped_by_file_and_sorted() {
        let chunks = vec![
            hit("src/a.ts", 50, 60, None, "later"),
            hit("src/b.ts", 1, 10, None, "other file"),
            hit("src/a.ts", 1, 10, None, "earlier"),
        ];
        let ctx = assemble("q", &chunks, "o/r");

        // a.ts appears once as a section, with its chunks line-sorted
        let first_header = ctx.user_prompt.find("### src/a.ts").unwrap();
        let second_header = ctx.user_prompt.find("### src/b.ts").unwrap();
        assert!(first_header < second_header);

        let earlier = ctx.user_prompt.find("earlier").unwrap();
        let later = ctx.user_prompt.find("later").unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn test_budget_stops_emission() {
        let big = "x".repeat(5_000);
        let chunks: Vec<_> = (0..10)
            .map(|i| hit(&format!("f{i}.ts"), 1, 50, None, &big))
            .collect();
        let ctx = assemble("q", &chunks, "o/r");

        // Third block crosses 12k; nothing after it is emitted.
        assert_eq!(ctx.citation_map.len(), 3);
        assert!(!ctx.user_prompt.contains("[4]"));

        // Budget holds modulo the final in-progress block.
        assert!(ctx.user_prompt.len() <= MAX_CONTEXT_CHARS + 6_000);
    }

    #[test]
    fn test_files_separated_by_rule() {
        let chunks = vec![
            hit("a.ts", 1, 5, None, "aaa"),
            hit("b.ts", 1, 5, None, "bbb"),
        ];
        let ctx = assemble("q", &chunks, "o/r");
        assert!(ctx.user_prompt.contains("\n\n---\n\n"));
    }

    #[test]
    fn test_prompt_shape() {
        let chunks = vec![hit("a.ts", 1, 5, None, "code")];
        let ctx = assemble("how does it work?", &chunks, "o/r");

        assert!(ctx.user_prompt.starts_with("## Codebase Context"));
        assert!(ctx.user_prompt.contains("## Question\n\nhow does it work?"));
        assert!(ctx.user_prompt.ends_with("## Answer (cite sources with [N] markers)"));
        assert!(ctx.system_prompt.contains("[N]"));
    }

    #[test]
    fn test_code_fence_tagged_with_language() {
        let chunks = vec![hit("a.ts", 1, 5, None, "const x = 1;")];
        let ctx = assemble("q", &chunks, "o/r");
        assert!(ctx.user_prompt.contains("```typescript\nconst x = 1;\n```"));
    }

    #[test]
    fn test_token_estimate_quarter_of_chars() {
        let chunks = vec![hit("a.ts", 1, 5, None, "const x = 1;")];
        let ctx = assemble("q", &chunks, "o/r");
        let chars = ctx.system_prompt.len() + ctx.user_prompt.len();
        assert_eq!(ctx.token_estimate, chars.div_ceil(4));
    }

    #[test]
    fn test_empty_chunks_still_produce_prompts() {
        let ctx = assemble("anything?", &[], "o/r");
        assert!(ctx.citation_map.is_empty());
        assert!(ctx.user_prompt.contains("## Question"));
    }
}
