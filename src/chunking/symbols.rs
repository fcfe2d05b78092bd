//! Symbol-boundary detection with tree-sitter.
//!
//! Only boundary discovery happens here: the start line and name of every
//! top-level function, class, or exported arrow-function const. Block
//! extents and size limits are applied by the caller, so swapping the
//! parser out changes nothing downstream.

use super::LineBlock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolSyntax {
    TypeScript,
    Tsx,
    JavaScript,
    Python,
}

impl SymbolSyntax {
    fn language(&self) -> tree_sitter::Language {
        match self {
            SymbolSyntax::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            SymbolSyntax::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            SymbolSyntax::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            SymbolSyntax::Python => tree_sitter_python::LANGUAGE.into(),
        }
    }
}

/// A detected symbol start.
#[derive(Debug, Clone)]
struct SymbolBoundary {
    /// 1-indexed line of the declaration (export/decorator line included)
    start_line: usize,
    name: String,
}

/// Compute symbol-delimited line blocks for a file.
///
/// Returns `None` when the parse fails entirely; returns `Some(vec![])` when
/// the file parsed but contains no recognizable symbols. Each symbol's block
/// runs from its start line to the line before the next symbol (or EOF). A
/// preamble before the first symbol (imports, module constants) becomes an
/// unnamed block so those lines stay searchable.
pub(crate) fn symbol_blocks(
    content: &str,
    syntax: SymbolSyntax,
    total_lines: usize,
) -> Option<Vec<LineBlock>> {
    let boundaries = detect_boundaries(content, syntax)?;
    if boundaries.is_empty() {
        return Some(Vec::new());
    }

    let mut blocks = Vec::with_capacity(boundaries.len() + 1);

    if boundaries[0].start_line > 1 {
        blocks.push(LineBlock {
            start_line: 1,
            end_line: boundaries[0].start_line - 1,
            symbol_name: None,
        });
    }

    for (i, boundary) in boundaries.iter().enumerate() {
        let end_line = boundaries
            .get(i + 1)
            .map(|next| next.start_line - 1)
            .unwrap_or(total_lines);
        if end_line < boundary.start_line {
            continue;
        }
        blocks.push(LineBlock {
            start_line: boundary.start_line,
            end_line,
            symbol_name: Some(boundary.name.clone()),
        });
    }

    Some(blocks)
}

fn detect_boundaries(content: &str, syntax: SymbolSyntax) -> Option<Vec<SymbolBoundary>> {
    let mut parser = tree_sitter::Parser::new();
    parser.set_language(&syntax.language()).ok()?;
    let tree = parser.parse(content, None)?;
    let root = tree.root_node();
    let src = content.as_bytes();

    let mut boundaries = Vec::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        let found = match syntax {
            SymbolSyntax::Python => python_symbol(child, src),
            _ => js_symbol(child, src),
        };
        if let Some((line, name)) = found {
            boundaries.push(SymbolBoundary {
                start_line: line,
                name,
            });
        }
    }

    boundaries.sort_by_key(|b| b.start_line);
    Some(boundaries)
}

/// Top-level TS/JS symbols: function and class declarations, plus exported
/// consts whose value is an arrow function.
fn js_symbol(node: tree_sitter::Node, src: &[u8]) -> Option<(usize, String)> {
    let start_line = node.start_position().row + 1;

    match node.kind() {
        "function_declaration"
        | "generator_function_declaration"
        | "class_declaration"
        | "abstract_class_declaration" => {
            let name = field_text(node, "name", src)?;
            Some((start_line, name))
        }
        "export_statement" => {
            let decl = node.child_by_field_name("declaration")?;
            match decl.kind() {
                "function_declaration"
                | "generator_function_declaration"
                | "class_declaration"
                | "abstract_class_declaration" => {
                    let name = field_text(decl, "name", src)?;
                    Some((start_line, name))
                }
                "lexical_declaration" | "variable_declaration" => {
                    let name = arrow_const_name(decl, src)?;
                    Some((start_line, name))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// `const foo = (...) => {...}` inside an export statement.
fn arrow_const_name(decl: tree_sitter::Node, src: &[u8]) -> Option<String> {
    let mut cursor = decl.walk();
    for declarator in decl.named_children(&mut cursor) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let value = declarator.child_by_field_name("value")?;
        if matches!(value.kind(), "arrow_function" | "function_expression" | "function") {
            return field_text(declarator, "name", src);
        }
    }
    None
}

/// Top-level Python symbols: `def`, `async def`, `class`, and their
/// decorated forms. A decorated definition's block starts at the first
/// decorator line.
fn python_symbol(node: tree_sitter::Node, src: &[u8]) -> Option<(usize, String)> {
    let start_line = node.start_position().row + 1;

    match node.kind() {
        "function_definition" | "class_definition" => {
            let name = field_text(node, "name", src)?;
            Some((start_line, name))
        }
        "decorated_definition" => {
            let inner = node.child_by_field_name("definition")?;
            let name = field_text(inner, "name", src)?;
            Some((start_line, name))
        }
        _ => None,
    }
}

fn field_text(node: tree_sitter::Node, field: &str, src: &[u8]) -> Option<String> {
    node.child_by_field_name(field)?
        .utf8_text(src)
        .ok()
        .map(|s| s.to_string())
}
