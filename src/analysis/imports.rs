//! Module reference extraction using tree-sitter for JavaScript/TypeScript.
//!
//! This module parses source files and collects every module reference:
//! the source of static `import` declarations, the first string argument
//! of `require(...)` calls, and (when asked for) dynamic `import(...)`
//! calls and `export ... from` re-exports.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tree_sitter::{Language, Node, Parser, Tree};

use crate::parser::ParseError;

/// Errors that can occur during usage analysis.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Syntax error in {} at {line}:{column}", path.display())]
    Syntax {
        path: PathBuf,
        line: usize,
        column: usize,
    },

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Tree-sitter language initialization failed")]
    LanguageInit,

    #[error(transparent)]
    Manifest(#[from] ParseError),
}

/// Result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// The syntactic form a module reference was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// Static import declaration: `import x from 'module'`, `import 'module'`,
    /// `import type { T } from 'module'`, `import x = require('module')`
    Import,
    /// CommonJS require: `require('module')`
    Require,
    /// Dynamic import: `import('module')`
    DynamicImport,
    /// Re-export: `export { x } from 'module'`, `export * from 'module'`
    ReExport,
}

impl ReferenceKind {
    /// Kinds that count as usage unless configured otherwise.
    pub const DEFAULT: [ReferenceKind; 2] = [ReferenceKind::Import, ReferenceKind::Require];

    /// Every kind the extractor reports.
    pub const ALL: [ReferenceKind; 4] = [
        ReferenceKind::Import,
        ReferenceKind::Require,
        ReferenceKind::DynamicImport,
        ReferenceKind::ReExport,
    ];
}

/// A raw module reference found in a source file. Not yet normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReference {
    /// The referenced module (e.g., "react", "./utils", "@scope/pkg/sub")
    pub source: String,
    /// How the module was referenced
    pub kind: ReferenceKind,
    /// Line number in the source file (1-indexed)
    pub line: usize,
}

impl ImportReference {
    /// Returns true if this reference names a package (not a relative/absolute path).
    pub fn is_package_import(&self) -> bool {
        normalize_package_name(&self.source).is_some()
    }

    /// Returns the package name this reference resolves to, if any.
    pub fn package_name(&self) -> Option<&str> {
        normalize_package_name(&self.source)
    }
}

/// Normalizes a raw module reference to a registry package name.
///
/// - Relative and absolute paths (`.`, `..`, `/` prefixes) are not packages.
/// - Scoped references keep the first two segments: `@scope/pkg/sub` -> `@scope/pkg`.
/// - Unscoped references keep the first segment: `lodash/fp` -> `lodash`.
///
/// # Example
///
/// ```
/// use pua::analysis::normalize_package_name;
///
/// assert_eq!(normalize_package_name("lodash/fp"), Some("lodash"));
/// assert_eq!(normalize_package_name("@scope/pkg/sub/path"), Some("@scope/pkg"));
/// assert_eq!(normalize_package_name("./local-module"), None);
/// ```
pub fn normalize_package_name(reference: &str) -> Option<&str> {
    if reference.is_empty() || reference.starts_with('.') || reference.starts_with('/') {
        return None;
    }

    if reference.starts_with('@') {
        // @scope/package/subpath -> @scope/package
        let second_slash = reference.match_indices('/').nth(1).map(|(idx, _)| idx);
        return Some(match second_slash {
            Some(end) => &reference[..end],
            None => reference,
        });
    }

    // package/subpath -> package
    reference.split('/').next()
}

/// Source dialect, decided purely by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceLanguage {
    JavaScript,
    Jsx,
    TypeScript,
    Tsx,
}

impl SourceLanguage {
    /// Determine language from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "js" => Some(SourceLanguage::JavaScript),
            "jsx" => Some(SourceLanguage::Jsx),
            "ts" => Some(SourceLanguage::TypeScript),
            "tsx" => Some(SourceLanguage::Tsx),
            _ => None,
        }
    }

    /// Determine language from a file path.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// True for dialects that need the type grammar.
    pub fn is_typed(&self) -> bool {
        matches!(self, SourceLanguage::TypeScript | SourceLanguage::Tsx)
    }

    /// Get tree-sitter language for this source language.
    pub fn tree_sitter_language(&self) -> Language {
        match self {
            // The JavaScript grammar parses JSX natively.
            SourceLanguage::JavaScript | SourceLanguage::Jsx => {
                tree_sitter_javascript::LANGUAGE.into()
            }
            SourceLanguage::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            SourceLanguage::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

/// Extracts module references from JavaScript/TypeScript source files.
///
/// Holds one parser per grammar so they can be reused across files.
pub struct ImportAnalyzer {
    js_parser: Parser,
    ts_parser: Parser,
    tsx_parser: Parser,
}

impl ImportAnalyzer {
    /// Create a new ImportAnalyzer.
    pub fn new() -> AnalysisResult<Self> {
        Ok(Self {
            js_parser: parser_for(SourceLanguage::JavaScript)?,
            ts_parser: parser_for(SourceLanguage::TypeScript)?,
            tsx_parser: parser_for(SourceLanguage::Tsx)?,
        })
    }

    /// Analyze a single file and extract all module references.
    pub fn analyze_file(&mut self, path: &Path) -> AnalysisResult<Vec<ImportReference>> {
        let language = SourceLanguage::from_path(path).ok_or_else(|| {
            AnalysisError::UnsupportedFileType(
                path.extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            )
        })?;

        let content = fs::read_to_string(path)?;
        self.analyze_source(&content, language, path)
    }

    /// Analyze source code directly.
    ///
    /// A source that does not parse cleanly is rejected as a whole with
    /// [`AnalysisError::Syntax`]; no references are returned for it.
    pub fn analyze_source(
        &mut self,
        source: &str,
        language: SourceLanguage,
        path: &Path,
    ) -> AnalysisResult<Vec<ImportReference>> {
        let parser = match language {
            SourceLanguage::JavaScript | SourceLanguage::Jsx => &mut self.js_parser,
            SourceLanguage::TypeScript => &mut self.ts_parser,
            SourceLanguage::Tsx => &mut self.tsx_parser,
        };

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| AnalysisError::Syntax {
                path: path.to_path_buf(),
                line: 0,
                column: 0,
            })?;

        let root = tree.root_node();
        if root.has_error() {
            let position = first_error(root).unwrap_or(root).start_position();
            return Err(AnalysisError::Syntax {
                path: path.to_path_buf(),
                line: position.row + 1,
                column: position.column + 1,
            });
        }

        Ok(extract_references(&tree, source))
    }
}

fn parser_for(language: SourceLanguage) -> AnalysisResult<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&language.tree_sitter_language())
        .map_err(|_| AnalysisError::LanguageInit)?;
    Ok(parser)
}

/// Walks the whole tree once, collecting references in document order.
fn extract_references(tree: &Tree, source: &str) -> Vec<ImportReference> {
    let mut references = Vec::new();
    let mut cursor = tree.walk();

    loop {
        if let Some(reference) = reference_at(&cursor.node(), source) {
            references.push(reference);
        }

        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return references;
            }
        }
    }
}

/// Returns the reference introduced by this node, if it introduces one.
fn reference_at(node: &Node, source: &str) -> Option<ImportReference> {
    let (string_node, kind) = match node.kind() {
        "import_statement" => (import_source(node)?, ReferenceKind::Import),
        "export_statement" => (node.child_by_field_name("source")?, ReferenceKind::ReExport),
        "call_expression" => {
            let callee = node.child_by_field_name("function")?;
            let kind = match callee.kind() {
                "identifier" if node_text(&callee, source) == Some("require") => {
                    ReferenceKind::Require
                }
                "import" => ReferenceKind::DynamicImport,
                _ => return None,
            };
            (first_argument(node)?, kind)
        }
        _ => return None,
    };

    if string_node.kind() != "string" {
        return None;
    }

    Some(ImportReference {
        source: string_value(&string_node, source)?,
        kind,
        line: node.start_position().row + 1,
    })
}

/// The source string of an import statement.
///
/// TypeScript's `import x = require('m')` keeps the string inside an
/// `import_require_clause` rather than in the statement's source field.
fn import_source<'t>(node: &Node<'t>) -> Option<Node<'t>> {
    if let Some(source) = node.child_by_field_name("source") {
        return Some(source);
    }

    let mut cursor = node.walk();
    let children: Vec<_> = node.named_children(&mut cursor).collect();
    for child in children {
        match child.kind() {
            "string" => return Some(child),
            "import_require_clause" => {
                let mut inner = child.walk();
                let found = child
                    .named_children(&mut inner)
                    .find(|n| n.kind() == "string");
                if found.is_some() {
                    return found;
                }
            }
            _ => {}
        }
    }
    None
}

/// The first argument of a call, skipping comments.
fn first_argument<'t>(call: &Node<'t>) -> Option<Node<'t>> {
    let args = call.child_by_field_name("arguments")?;
    let mut cursor = args.walk();
    let first = args
        .named_children(&mut cursor)
        .find(|n| n.kind() != "comment");
    first
}

/// First error or missing node in document order.
fn first_error(root: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = root.walk();

    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Some(node);
        }

        // Subtrees without errors are skipped entirely.
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

/// Extract the text content of a node.
fn node_text<'a>(node: &Node, source: &'a str) -> Option<&'a str> {
    source.get(node.start_byte()..node.end_byte())
}

/// Extract a string literal's value: strips the quotes and decodes escapes.
fn string_value(node: &Node, source: &str) -> Option<String> {
    let text = node_text(node, source)?;
    let inner = text.get(1..text.len().checked_sub(1)?)?;
    if inner.contains('\\') {
        unescape(inner)
    } else {
        Some(inner.to_string())
    }
}

/// Decode JavaScript string escapes. `None` if an escape is malformed.
fn unescape(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                out.push(code_point(&hex, 2)?);
            }
            'u' if chars.as_str().starts_with('{') => {
                chars.next();
                let hex: String = chars.by_ref().take_while(|c| *c != '}').collect();
                out.push(code_point(&hex, hex.len().max(1))?);
            }
            'u' => {
                let hex: String = chars.by_ref().take(4).collect();
                out.push(code_point(&hex, 4)?);
            }
            // Line continuation
            '\r' => {
                if chars.as_str().starts_with('\n') {
                    chars.next();
                }
            }
            '\n' | '\u{2028}' | '\u{2029}' => {}
            other => out.push(other),
        }
    }

    Some(out)
}

fn code_point(hex: &str, len: usize) -> Option<char> {
    if hex.len() != len || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    char::from_u32(u32::from_str_radix(hex, 16).ok()?)
}
