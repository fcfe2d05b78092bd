//! Code chunking: symbol-aware for TypeScript/JavaScript/Python, sliding
//! window for everything else.
//!
//! Symbol detection uses tree-sitter for boundary discovery only; block
//! extents, size limits, and overlap are applied uniformly here. Files whose
//! parse yields no symbols fall through to the sliding window so no file is
//! lost.

pub mod symbols;
pub mod window;

use crate::models::CodeChunk;
use symbols::SymbolSyntax;

pub const MIN_CHUNK_LINES: usize = 3;
pub const MAX_CHUNK_LINES: usize = 150;
pub const SLIDING_WINDOW_SIZE: usize = 60;
pub const SLIDING_WINDOW_OVERLAP: usize = 15;

/// How a file ended up being chunked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStrategy {
    Ast,
    SlidingWindow,
}

impl ChunkStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkStrategy::Ast => "ast",
            ChunkStrategy::SlidingWindow => "sliding-window",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChunkingResult {
    pub chunks: Vec<CodeChunk>,
    pub strategy: ChunkStrategy,
}

/// A contiguous line range with an optional symbol name, before materialization.
#[derive(Debug, Clone)]
pub(crate) struct LineBlock {
    /// 1-indexed inclusive
    pub start_line: usize,
    /// 1-indexed inclusive
    pub end_line: usize,
    pub symbol_name: Option<String>,
}

/// Split one file into chunks.
pub fn chunk_file(repo_id: &str, path: &str, content: &str) -> ChunkingResult {
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return ChunkingResult {
            chunks: Vec::new(),
            strategy: ChunkStrategy::SlidingWindow,
        };
    }

    let language = language_for_path(path);

    if let Some(syntax) = symbol_syntax_for_path(path) {
        if let Some(blocks) = symbols::symbol_blocks(content, syntax, lines.len()) {
            if !blocks.is_empty() {
                let chunks = materialize(repo_id, path, language, &lines, blocks);
                // A file of nothing but sub-minimum blocks still needs the
                // window fallback so it is not dropped entirely.
                if !chunks.is_empty() {
                    return ChunkingResult {
                        chunks,
                        strategy: ChunkStrategy::Ast,
                    };
                }
            }
        }
    }

    let blocks = window::sliding_blocks(lines.len());
    let chunks = materialize(repo_id, path, language, &lines, blocks);
    ChunkingResult {
        chunks,
        strategy: ChunkStrategy::SlidingWindow,
    }
}

/// Turn line blocks into chunks: enforce size bounds, split oversized blocks
/// into overlapping parts, assign deterministic ids and emission indexes.
fn materialize(
    repo_id: &str,
    path: &str,
    language: &str,
    lines: &[&str],
    blocks: Vec<LineBlock>,
) -> Vec<CodeChunk> {
    let mut chunks = Vec::new();

    for block in blocks {
        for part in split_oversized(&block) {
            let line_count = part.end_line - part.start_line + 1;
            if line_count < MIN_CHUNK_LINES {
                continue;
            }

            let content = lines[part.start_line - 1..part.end_line].join("\n");
            chunks.push(CodeChunk {
                id: chunk_id(repo_id, path, part.start_line),
                repo_id: repo_id.to_string(),
                file_path: path.to_string(),
                language: language.to_string(),
                content,
                start_line: part.start_line,
                end_line: part.end_line,
                symbol_name: part.symbol_name,
                chunk_index: chunks.len(),
            });
        }
    }

    chunks
}

/// Split a block longer than `MAX_CHUNK_LINES` into overlapping sub-windows.
/// Sub-chunks inherit the symbol name with a `" [part N]"` suffix.
fn split_oversized(block: &LineBlock) -> Vec<LineBlock> {
    let len = block.end_line - block.start_line + 1;
    if len <= MAX_CHUNK_LINES {
        return vec![block.clone()];
    }

    let step = MAX_CHUNK_LINES - SLIDING_WINDOW_OVERLAP;
    let mut parts = Vec::new();
    let mut start = block.start_line;
    let mut part_no = 1;

    while start <= block.end_line {
        let end = (start + MAX_CHUNK_LINES - 1).min(block.end_line);
        parts.push(LineBlock {
            start_line: start,
            end_line: end,
            symbol_name: block
                .symbol_name
                .as_ref()
                .map(|name| format!("{name} [part {part_no}]")),
        });
        if end == block.end_line {
            break;
        }
        start += step;
        part_no += 1;
    }

    parts
}

/// Deterministic chunk id: `{safe(repo_id)}__{safe(path)}__L{start_line}`.
pub fn chunk_id(repo_id: &str, path: &str, start_line: usize) -> String {
    format!("{}__{}__L{}", safe(repo_id), safe(path), start_line)
}

fn safe(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn symbol_syntax_for_path(path: &str) -> Option<SymbolSyntax> {
    match extension(path) {
        "ts" => Some(SymbolSyntax::TypeScript),
        "tsx" => Some(SymbolSyntax::Tsx),
        "js" | "jsx" | "mjs" => Some(SymbolSyntax::JavaScript),
        "py" => Some(SymbolSyntax::Python),
        _ => None,
    }
}

/// Language tag recorded on chunks and used for fenced code blocks.
pub fn language_for_path(path: &str) -> &'static str {
    match extension(path) {
        "ts" | "tsx" => "typescript",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "py" => "python",
        "md" | "mdx" => "markdown",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        _ => "text",
    }
}

fn extension(path: &str) -> &str {
    path.rsplit('/')
        .next()
        .and_then(|base| base.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts_two_symbols() -> String {
        let mut src = String::new();
        src.push_str("export function foo() {\n");
        for i in 0..38 {
            src.push_str(&format!("  const v{i} = {i};\n"));
        }
        src.push_str("}\n");
        src.push_str("export class Bar {\n");
        for i in 0..18 {
            src.push_str(&format!("  method{i}() {{ return {i}; }}\n"));
        }
        src.push_str("}\n");
        src
    }

    #[test]
    fn test_typescript_two_symbols() {
        let result = chunk_file("o/r", "src/lib.ts", &ts_two_symbols());
        assert_eq!(result.strategy, ChunkStrategy::Ast);
        assert_eq!(result.chunks.len(), 2);

        let names: Vec<&str> = result
            .chunks
            .iter()
            .map(|c| c.symbol_name.as_deref().unwrap())
            .collect();
        assert_eq!(names, vec!["foo", "Bar"]);

        // Line ranges are disjoint
        assert!(result.chunks[0].end_line < result.chunks[1].start_line);
    }

    #[test]
    fn test_chunk_id_deterministic() {
        let first = chunk_file("o/r", "src/lib.ts", &ts_two_symbols());
        let second = chunk_file("o/r", "src/lib.ts", &ts_two_symbols());
        let ids_a: Vec<&str> = first.chunks.iter().map(|c| c.id.as_str()).collect();
        let ids_b: Vec<&str> = second.chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn test_chunk_id_format() {
        assert_eq!(chunk_id("octo/repo", "src/a.ts", 7), "octo_repo__src_a_ts__L7");
    }

    #[test]
    fn test_chunk_size_bounds_hold() {
        // A very long file exercises both the block splitter and the window.
        let long_py: String = (0..400).map(|i| format!("x_{i} = {i}\n")).collect();
        let result = chunk_file("o/r", "gen.py", &long_py);
        for chunk in &result.chunks {
            let len = chunk.line_count();
            assert!((MIN_CHUNK_LINES..=MAX_CHUNK_LINES).contains(&len), "{len}");
        }
    }

    #[test]
    fn test_oversized_symbol_gets_part_suffix() {
        let mut src = String::from("export function huge() {\n");
        for i in 0..200 {
            src.push_str(&format!("  const v{i} = {i};\n"));
        }
        src.push_str("}\n");

        let result = chunk_file("o/r", "huge.ts", &src);
        assert_eq!(result.strategy, ChunkStrategy::Ast);
        assert!(result.chunks.len() >= 2);
        assert_eq!(result.chunks[0].symbol_name.as_deref(), Some("huge [part 1]"));
        assert_eq!(result.chunks[1].symbol_name.as_deref(), Some("huge [part 2]"));
    }

    #[test]
    fn test_markdown_uses_sliding_window() {
        let md: String = (0..100).map(|i| format!("line {i}\n")).collect();
        let result = chunk_file("o/r", "README.md", &md);
        assert_eq!(result.strategy, ChunkStrategy::SlidingWindow);
        assert!(result.chunks.iter().all(|c| c.symbol_name.is_none()));
        assert!(result.chunks.iter().all(|c| c.language == "markdown"));
    }

    #[test]
    fn test_js_without_symbols_falls_back() {
        let src = "console.log(1);\nconsole.log(2);\nconsole.log(3);\nconsole.log(4);\n";
        let result = chunk_file("o/r", "script.js", src);
        assert_eq!(result.strategy, ChunkStrategy::SlidingWindow);
        assert_eq!(result.chunks.len(), 1);
    }

    #[test]
    fn test_empty_file_yields_nothing() {
        let result = chunk_file("o/r", "empty.ts", "");
        assert!(result.chunks.is_empty());
    }

    #[test]
    fn test_chunk_index_is_emission_order() {
        let result = chunk_file("o/r", "src/lib.ts", &ts_two_symbols());
        for (i, chunk) in result.chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i);
        }
    }

    #[test]
    fn test_line_coverage_modulo_overlap() {
        // Concatenating chunks in line order covers every original line.
        let src: String = (0..137).map(|i| format!("value_{i} = {i}\n")).collect();
        let result = chunk_file("o/r", "data.yaml", &src);

        let mut covered = vec![false; 137];
        for chunk in &result.chunks {
            for line in chunk.start_line..=chunk.end_line {
                covered[line - 1] = true;
            }
        }
        assert!(covered.iter().all(|&c| c), "all lines covered");
    }

    #[test]
    fn test_language_map() {
        assert_eq!(language_for_path("a.ts"), "typescript");
        assert_eq!(language_for_path("a.tsx"), "typescript");
        assert_eq!(language_for_path("a.cjs"), "javascript");
        assert_eq!(language_for_path("a.py"), "python");
        assert_eq!(language_for_path("a.mdx"), "markdown");
        assert_eq!(language_for_path("a.yml"), "yaml");
        assert_eq!(language_for_path("Makefile"), "text");
    }

    #[test]
    fn test_cjs_dispatches_to_sliding_window() {
        // .cjs is indexable but not routed through the symbol chunker.
        let src = "module.exports = function named() {\n  return 1;\n};\nconst x = 2;\n";
        let result = chunk_file("o/r", "util.cjs", src);
        assert_eq!(result.strategy, ChunkStrategy::SlidingWindow);
    }
}
