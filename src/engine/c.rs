//! Completion engine for C, built on tree-sitter.
//!
//! Parsing (the expensive, cached step) walks the include graph reachable
//! from the edited file and harvests every declaration it finds in headers.
//! Completing (the per-request step) re-parses only the current buffer and
//! merges its declarations, the locals of the enclosing function, the cached
//! header declarations, macros and keywords into one candidate list.

use anyhow::{Context, Result};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tree_sitter::{Language, Node, Parser, Tree};

use super::{Candidate, ChunkKind, Completion, CompletionEngine, Diagnostic, Query, Severity};
use crate::completion::partial::cursor_offset;

pub const LOCAL_PRIORITY: u32 = 30;
pub const KEYWORD_PRIORITY: u32 = 40;
pub const FILE_PRIORITY: u32 = 50;
pub const HEADER_PRIORITY: u32 = 55;
pub const MACRO_PRIORITY: u32 = 70;

const MAX_INCLUDE_DEPTH: usize = 4;
const MAX_HEADERS: usize = 256;
const MAX_DIAGNOSTICS: usize = 20;

const KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while", "_Alignas", "_Alignof", "_Atomic",
    "_Bool", "_Complex", "_Generic", "_Noreturn", "_Static_assert", "_Thread_local",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SymbolKind {
    Function,
    Variable,
    Type,
    Constant,
    Macro,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Symbol {
    name: String,
    result_type: String,
    signature: String,
    kind: SymbolKind,
}

impl Symbol {
    fn new(name: impl Into<String>, result_type: impl Into<String>, kind: SymbolKind) -> Self {
        Self { name: name.into(), result_type: result_type.into(), signature: String::new(), kind }
    }

    fn to_candidate(&self, scope_priority: u32) -> Candidate {
        let priority = if self.kind == SymbolKind::Macro { MACRO_PRIORITY } else { scope_priority };
        Candidate::new(priority)
            .with_chunk(ChunkKind::ResultType, self.result_type.as_str())
            .with_chunk(ChunkKind::TypedText, self.name.as_str())
            .with_chunk(ChunkKind::Other, self.signature.as_str())
    }
}

/// An `#include` directive found in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Include {
    name: String,
    /// `"name"` rather than `<name>`
    quoted: bool,
    /// 1-based line of the directive
    line: usize,
}

/// What the engine understands of the flag list.
#[derive(Debug, Default)]
struct Flags {
    include_dirs: Vec<PathBuf>,
    system_dirs: Vec<PathBuf>,
    defines: Vec<Symbol>,
}

impl Flags {
    fn parse(flags: &[String]) -> Self {
        let mut parsed = Self::default();
        let mut iter = flags.iter();

        while let Some(flag) = iter.next() {
            match flag.as_str() {
                "-I" => parsed.include_dirs.extend(iter.next().map(PathBuf::from)),
                "-isystem" => parsed.system_dirs.extend(iter.next().map(PathBuf::from)),
                "-D" => parsed.defines.extend(iter.next().and_then(|d| define_symbol(d))),
                _ => {
                    if let Some(dir) = flag.strip_prefix("-I") {
                        parsed.include_dirs.push(PathBuf::from(dir));
                    } else if let Some(definition) = flag.strip_prefix("-D") {
                        parsed.defines.extend(define_symbol(definition));
                    }
                }
            }
        }
        parsed
    }

    /// Locate an included header the way a C preprocessor would.
    fn resolve(&self, include: &Include, including_dir: &Path) -> Option<PathBuf> {
        let local = include.quoted.then_some(including_dir);
        local
            .into_iter()
            .chain(self.include_dirs.iter().map(PathBuf::as_path))
            .chain(self.system_dirs.iter().map(PathBuf::as_path))
            .map(|dir| dir.join(&include.name))
            .find(|candidate| candidate.is_file())
    }
}

/// `NAME`, `NAME=value` or `NAME(args)=body` from a `-D` flag.
fn define_symbol(definition: &str) -> Option<Symbol> {
    let head = definition.split_once('=').map_or(definition, |(head, _)| head);
    let (name, signature) = match head.find('(') {
        Some(open) => (&head[..open], &head[open..]),
        None => (head, ""),
    };
    if name.is_empty() {
        return None;
    }

    let mut symbol = Symbol::new(name, "", SymbolKind::Macro);
    symbol.signature = signature.to_string();
    Some(symbol)
}

/// Parsed state for one file.
pub struct CUnit {
    flags: Flags,
    /// Declarations harvested from reachable headers
    headers: Vec<Symbol>,
    /// Includes of the edited file that were not found anywhere
    unresolved: Vec<Include>,
}

impl CUnit {
    pub fn header_symbol_count(&self) -> usize {
        self.headers.len()
    }
}

/// Tree-sitter backed C engine.
pub struct CEngine {
    parser: Parser,
}

impl CEngine {
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_c::LANGUAGE.into();
        let mut parser = Parser::new();
        parser.set_language(&language).context("Failed to load the C grammar")?;
        Ok(Self { parser })
    }

    fn parse_source(&mut self, source: &[u8]) -> Result<Tree> {
        self.parser.parse(source, None).context("tree-sitter returned no parse tree")
    }

    /// Breadth-first walk over the include graph, harvesting header declarations.
    fn harvest_headers(&mut self, file: &Path, includes: Vec<Include>, unit: &mut CUnit) {
        let file_dir = file.parent().unwrap_or_else(|| Path::new("/"));
        let mut visited: HashSet<PathBuf> = HashSet::from([file.to_path_buf()]);
        let mut queue = VecDeque::new();

        for include in includes {
            match unit.flags.resolve(&include, file_dir) {
                Some(path) => queue.push_back((path, 1)),
                None => unit.unresolved.push(include),
            }
        }

        while let Some((path, depth)) = queue.pop_front() {
            if visited.len() > MAX_HEADERS {
                tracing::debug!("Include limit reached, skipping the rest");
                break;
            }
            if !visited.insert(path.clone()) {
                continue;
            }

            let source = match std::fs::read(&path) {
                Ok(source) => source,
                Err(err) => {
                    tracing::debug!("Skipping header {}: {err}", path.display());
                    continue;
                }
            };
            let Ok(tree) = self.parse_source(&source) else {
                continue;
            };

            let mut symbols = Vec::new();
            collect_file_scope(tree.root_node(), &source, &mut symbols);
            unit.headers.extend(symbols.into_iter().filter(|s| !is_reserved(&s.name)));

            if depth < MAX_INCLUDE_DEPTH {
                let header_dir = path.parent().unwrap_or_else(|| Path::new("/"));
                for include in collect_includes(tree.root_node(), &source) {
                    if let Some(next) = unit.flags.resolve(&include, header_dir) {
                        queue.push_back((next, depth + 1));
                    }
                }
            }
        }
    }
}

impl CompletionEngine for CEngine {
    type Unit = CUnit;

    fn parse(&mut self, file: &Path, flags: &[String], buffer: &[u8]) -> Result<CUnit> {
        let tree = self.parse_source(buffer)?;
        let includes = collect_includes(tree.root_node(), buffer);

        let mut unit = CUnit { flags: Flags::parse(flags), headers: Vec::new(), unresolved: Vec::new() };
        self.harvest_headers(file, includes, &mut unit);

        tracing::debug!(
            "Parsed {}: {} header declaration(s), {} unresolved include(s)",
            file.display(),
            unit.header_symbol_count(),
            unit.unresolved.len()
        );
        Ok(unit)
    }

    fn complete(&mut self, unit: &mut CUnit, query: &Query<'_>) -> Result<Completion> {
        tracing::trace!("Completing {} at {}:{}", query.file.display(), query.line, query.column);
        let tree = self.parse_source(query.buffer)?;
        let root = tree.root_node();
        let cursor =
            cursor_offset(query.buffer, query.line, query.column).unwrap_or(query.buffer.len());

        let mut file_scope = Vec::new();
        collect_file_scope(root, query.buffer, &mut file_scope);
        let locals = collect_locals(root, query.buffer, cursor);

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        let scopes = [
            (locals.as_slice(), LOCAL_PRIORITY),
            (file_scope.as_slice(), FILE_PRIORITY),
            (unit.headers.as_slice(), HEADER_PRIORITY),
            (unit.flags.defines.as_slice(), MACRO_PRIORITY),
        ];
        for (symbols, priority) in scopes {
            for symbol in symbols {
                if seen.insert(symbol.name.as_str()) {
                    candidates.push(symbol.to_candidate(priority));
                }
            }
        }
        candidates.extend(
            KEYWORDS
                .iter()
                .map(|keyword| Candidate::new(KEYWORD_PRIORITY).with_chunk(ChunkKind::TypedText, *keyword)),
        );

        let mut diagnostics = Vec::new();
        syntax_diagnostics(root, &mut diagnostics);
        diagnostics.extend(unit.unresolved.iter().map(|include| Diagnostic {
            severity: Severity::Warning,
            line: include.line,
            column: 1,
            message: if include.quoted {
                format!("cannot find include \"{}\"", include.name)
            } else {
                format!("cannot find include <{}>", include.name)
            },
        }));

        Ok(Completion { candidates, diagnostics })
    }
}

/// Names reserved for the implementation, which headers are full of.
fn is_reserved(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next() == Some('_') && chars.next().is_some_and(|c| c == '_' || c.is_ascii_uppercase())
}

fn node_text<'s>(node: Node<'_>, source: &'s [u8]) -> &'s str {
    node.utf8_text(source).unwrap_or_default()
}

/// Collapse whitespace runs (parameter lists often span lines).
fn compact(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").replace("( ", "(").replace(" )", ")")
}

fn first_named_child(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    let child = node.named_children(&mut cursor).next();
    child
}

fn specifier_keyword(kind: &str) -> Option<&'static str> {
    match kind {
        "struct_specifier" => Some("struct"),
        "union_specifier" => Some("union"),
        "enum_specifier" => Some("enum"),
        _ => None,
    }
}

fn type_name(node: Node<'_>, source: &[u8]) -> String {
    match specifier_keyword(node.kind()) {
        Some(keyword) => match node.child_by_field_name("name") {
            Some(name) => format!("{keyword} {}", node_text(name, source)),
            None => keyword.to_string(),
        },
        None => compact(node_text(node, source)),
    }
}

/// Type qualifiers plus the base type of a declaration-like node.
fn declaration_type(node: Node<'_>, source: &[u8]) -> String {
    let mut parts = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "type_qualifier" {
            parts.push(node_text(child, source).to_string());
        }
    }
    if let Some(ty) = node.child_by_field_name("type") {
        parts.push(type_name(ty, source));
    }
    parts.join(" ")
}

/// A declarator unwrapped down to its identifier.
struct Declarator {
    name: String,
    pointers: usize,
    params: Option<String>,
}

impl Declarator {
    fn resolve(node: Node<'_>, source: &[u8]) -> Option<Self> {
        let mut node = node;
        let mut pointers = 0;
        let mut params = None;

        loop {
            match node.kind() {
                "identifier" | "field_identifier" | "type_identifier" => {
                    let name = node_text(node, source).to_string();
                    return Some(Self { name, pointers, params });
                }
                "pointer_declarator" => pointers += 1,
                "function_declarator" => {
                    if params.is_none() {
                        params = node
                            .child_by_field_name("parameters")
                            .map(|list| compact(node_text(list, source)));
                    }
                }
                "init_declarator"
                | "array_declarator"
                | "attributed_declarator"
                | "parenthesized_declarator" => {}
                _ => return None,
            }

            node = match node.child_by_field_name("declarator") {
                Some(inner) => inner,
                None => first_named_child(node)?,
            };
        }
    }

    fn into_symbol(self, base_type: &str) -> Symbol {
        let result_type = if self.pointers == 0 {
            base_type.to_string()
        } else {
            format!("{base_type} {}", "*".repeat(self.pointers))
        };
        let kind = if self.params.is_some() { SymbolKind::Function } else { SymbolKind::Variable };

        Symbol { name: self.name, result_type, signature: self.params.unwrap_or_default(), kind }
    }
}

/// Symbols introduced by a `declaration` or `parameter_declaration`.
fn declaration_symbols(node: Node<'_>, source: &[u8], out: &mut Vec<Symbol>) {
    let base_type = declaration_type(node, source);
    let mut cursor = node.walk();
    for declarator in node.children_by_field_name("declarator", &mut cursor) {
        if let Some(declarator) = Declarator::resolve(declarator, source) {
            out.push(declarator.into_symbol(&base_type));
        }
    }
}

/// Tags and enumerators of a struct/union/enum definition.
fn collect_tagged_types(node: Node<'_>, source: &[u8], out: &mut Vec<Symbol>) {
    let specifier = if specifier_keyword(node.kind()).is_some() {
        node
    } else if let Some(ty) = node.child_by_field_name("type") {
        ty
    } else {
        return;
    };
    let Some(keyword) = specifier_keyword(specifier.kind()) else {
        return;
    };
    let Some(body) = specifier.child_by_field_name("body") else {
        return;
    };

    let name = specifier.child_by_field_name("name").map(|name| node_text(name, source));
    if let Some(name) = name {
        out.push(Symbol::new(name, keyword, SymbolKind::Type));
    }

    if keyword == "enum" {
        let result_type = name.map_or_else(|| "enum".to_string(), |name| format!("enum {name}"));
        let mut cursor = body.walk();
        for enumerator in body.named_children(&mut cursor) {
            if enumerator.kind() != "enumerator" {
                continue;
            }
            if let Some(constant) = enumerator.child_by_field_name("name") {
                out.push(Symbol::new(
                    node_text(constant, source),
                    result_type.as_str(),
                    SymbolKind::Constant,
                ));
            }
        }
    }
}

/// Declarations visible at file scope, looking through preprocessor
/// conditionals.
fn collect_file_scope(node: Node<'_>, source: &[u8], out: &mut Vec<Symbol>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "function_definition" => {
                let declarator = child
                    .child_by_field_name("declarator")
                    .and_then(|declarator| Declarator::resolve(declarator, source));
                if let Some(declarator) = declarator {
                    out.push(declarator.into_symbol(&declaration_type(child, source)));
                }
            }
            "declaration" => {
                declaration_symbols(child, source, out);
                collect_tagged_types(child, source, out);
            }
            "type_definition" => {
                let mut declarators = child.walk();
                for declarator in child.children_by_field_name("declarator", &mut declarators) {
                    if let Some(declarator) = Declarator::resolve(declarator, source) {
                        out.push(Symbol::new(declarator.name, "typedef", SymbolKind::Type));
                    }
                }
                collect_tagged_types(child, source, out);
            }
            "struct_specifier" | "union_specifier" | "enum_specifier" => {
                collect_tagged_types(child, source, out);
            }
            "preproc_def" => {
                if let Some(name) = child.child_by_field_name("name") {
                    out.push(Symbol::new(node_text(name, source), "", SymbolKind::Macro));
                }
            }
            "preproc_function_def" => {
                if let Some(name) = child.child_by_field_name("name") {
                    let mut symbol = Symbol::new(node_text(name, source), "", SymbolKind::Macro);
                    symbol.signature = child
                        .child_by_field_name("parameters")
                        .map(|params| compact(node_text(params, source)))
                        .unwrap_or_default();
                    out.push(symbol);
                }
            }
            "preproc_if" | "preproc_ifdef" | "preproc_else" | "preproc_elif" | "preproc_elifdef"
            | "linkage_specification" | "declaration_list" => {
                collect_file_scope(child, source, out);
            }
            _ => {}
        }
    }
}

/// `#include` directives at file scope, looking through conditionals.
fn collect_includes(node: Node<'_>, source: &[u8]) -> Vec<Include> {
    let mut includes = Vec::new();
    let mut pending = vec![node];

    while let Some(node) = pending.pop() {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "preproc_include" => {
                    let Some(path) = child.child_by_field_name("path") else {
                        continue;
                    };
                    let raw = node_text(path, source);
                    let quoted = path.kind() == "string_literal";
                    let name = raw.trim_matches(|c| matches!(c, '"' | '<' | '>'));
                    if !name.is_empty() {
                        includes.push(Include {
                            name: name.to_string(),
                            quoted,
                            line: child.start_position().row + 1,
                        });
                    }
                }
                "preproc_if" | "preproc_ifdef" | "preproc_else" | "preproc_elif"
                | "preproc_elifdef" => pending.push(child),
                _ => {}
            }
        }
    }

    includes.sort_by_key(|include| include.line);
    includes
}

/// Parameters and block declarations of the function around `cursor` that
/// appear before it.
fn collect_locals(root: Node<'_>, source: &[u8], cursor: usize) -> Vec<Symbol> {
    let mut function = root.descendant_for_byte_range(cursor, cursor);
    while let Some(node) = function {
        if node.kind() == "function_definition" {
            break;
        }
        function = node.parent();
    }
    let Some(function) = function else {
        return Vec::new();
    };

    let mut locals = Vec::new();

    let mut declarator = function.child_by_field_name("declarator");
    while let Some(node) = declarator {
        if node.kind() == "function_declarator" {
            break;
        }
        declarator = node.child_by_field_name("declarator");
    }
    if let Some(params) = declarator.and_then(|d| d.child_by_field_name("parameters")) {
        let mut cursor = params.walk();
        for param in params.named_children(&mut cursor) {
            if param.kind() == "parameter_declaration" {
                declaration_symbols(param, source, &mut locals);
            }
        }
    }

    if let Some(body) = function.child_by_field_name("body") {
        let mut pending = vec![body];
        while let Some(node) = pending.pop() {
            let mut walk = node.walk();
            for child in node.named_children(&mut walk) {
                if child.start_byte() >= cursor {
                    break;
                }
                if child.kind() == "declaration" {
                    declaration_symbols(child, source, &mut locals);
                } else {
                    pending.push(child);
                }
            }
        }
    }

    // later declarations shadow earlier ones
    locals.reverse();
    locals
}

/// Syntax errors and missing tokens, in document order.
fn syntax_diagnostics(root: Node<'_>, out: &mut Vec<Diagnostic>) {
    let mut pending = vec![root];

    while let Some(node) = pending.pop() {
        if out.len() >= MAX_DIAGNOSTICS {
            break;
        }

        let position = node.start_position();
        let message = if node.is_error() {
            Some("syntax error".to_string())
        } else if node.is_missing() {
            Some(format!("missing `{}`", node.kind()))
        } else {
            None
        };

        if let Some(message) = message {
            out.push(Diagnostic {
                severity: Severity::Error,
                line: position.row + 1,
                column: position.column + 1,
                message,
            });
            continue;
        }

        if node.has_error() {
            let mut cursor = node.walk();
            let children: Vec<_> = node.children(&mut cursor).collect();
            pending.extend(children.into_iter().rev());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"#include "missing.h"
#define LIMIT 10
#define MAX(a, b) ((a) > (b) ? (a) : (b))

struct point { int x; int y; };
typedef struct point Point;
enum color { RED, GREEN };
static const char *greeting = "hi";

int add(int a, int b) {
    int total = a + b;
    return tot;
}
"#;

    fn complete_at(source: &str, file: &Path, flags: &[String], line: i32, column: i32) -> Completion {
        let mut engine = CEngine::new().unwrap();
        let mut unit = engine.parse(file, flags, source.as_bytes()).unwrap();
        let query = Query { file, buffer: source.as_bytes(), line, column };
        engine.complete(&mut unit, &query).unwrap()
    }

    fn find<'a>(completion: &'a Completion, word: &str) -> Option<&'a Candidate> {
        completion.candidates.iter().find(|c| c.typed_text() == Some(word))
    }

    fn chunk(candidate: &Candidate, kind: ChunkKind) -> String {
        candidate
            .chunks
            .iter()
            .filter(|chunk| chunk.kind == kind)
            .map(|chunk| chunk.text.as_str())
            .collect()
    }

    #[test]
    fn test_file_scope_and_locals() {
        let completion = complete_at(SOURCE, Path::new("/src/add.c"), &[], 12, 12);

        let add = find(&completion, "add").unwrap();
        assert_eq!(add.priority, FILE_PRIORITY);
        assert_eq!(chunk(add, ChunkKind::ResultType), "int");
        assert_eq!(chunk(add, ChunkKind::Other), "(int a, int b)");

        let total = find(&completion, "total").unwrap();
        assert_eq!(total.priority, LOCAL_PRIORITY);
        assert_eq!(chunk(total, ChunkKind::ResultType), "int");
        assert_eq!(find(&completion, "a").unwrap().priority, LOCAL_PRIORITY);

        let greeting = find(&completion, "greeting").unwrap();
        assert_eq!(chunk(greeting, ChunkKind::ResultType), "const char *");

        assert_eq!(chunk(find(&completion, "Point").unwrap(), ChunkKind::ResultType), "typedef");
        assert_eq!(chunk(find(&completion, "point").unwrap(), ChunkKind::ResultType), "struct");
        assert_eq!(chunk(find(&completion, "RED").unwrap(), ChunkKind::ResultType), "enum color");

        let max = find(&completion, "MAX").unwrap();
        assert_eq!(max.priority, MACRO_PRIORITY);
        assert_eq!(chunk(max, ChunkKind::Other), "(a, b)");
        assert_eq!(find(&completion, "LIMIT").unwrap().priority, MACRO_PRIORITY);

        assert_eq!(find(&completion, "return").unwrap().priority, KEYWORD_PRIORITY);
    }

    #[test]
    fn test_locals_only_inside_function() {
        let completion = complete_at(SOURCE, Path::new("/src/add.c"), &[], 9, 1);
        assert!(find(&completion, "total").is_none());
        assert!(find(&completion, "add").is_some());
    }

    #[test]
    fn test_prototype_and_definition_are_one_candidate() {
        let source = "int f(void);\nint f(void) { return 0; }\n";
        let completion = complete_at(source, Path::new("/src/f.c"), &[], 2, 1);
        let count = completion.candidates.iter().filter(|c| c.typed_text() == Some("f")).count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_headers_are_harvested_at_parse_time() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("util.h"), "double scale(double v);\n#include \"deep.h\"\n")
            .unwrap();
        std::fs::write(dir.path().join("deep.h"), "extern int depth_level;\nint __internal;\n")
            .unwrap();
        let include = dir.path().join("include");
        std::fs::create_dir(&include).unwrap();
        std::fs::write(include.join("api.h"), "void api_init(void);\n").unwrap();

        let flags = vec![
            format!("-I{}", include.display()),
            "-DFEATURE_X".to_string(),
            "-DSQUARE(x)=((x)*(x))".to_string(),
        ];
        let source = "#include \"util.h\"\n#include <api.h>\nint main(void) { return 0; }\n";
        let file = dir.path().join("main.c");

        let mut engine = CEngine::new().unwrap();
        let mut unit = engine.parse(&file, &flags, source.as_bytes()).unwrap();
        assert_eq!(unit.header_symbol_count(), 3);

        let query = Query { file: &file, buffer: source.as_bytes(), line: 3, column: 1 };
        let completion = engine.complete(&mut unit, &query).unwrap();

        let scale = find(&completion, "scale").unwrap();
        assert_eq!(scale.priority, HEADER_PRIORITY);
        assert_eq!(chunk(scale, ChunkKind::ResultType), "double");
        assert!(find(&completion, "depth_level").is_some());
        assert!(find(&completion, "api_init").is_some());
        assert!(find(&completion, "__internal").is_none());

        assert_eq!(find(&completion, "FEATURE_X").unwrap().priority, MACRO_PRIORITY);
        assert_eq!(chunk(find(&completion, "SQUARE").unwrap(), ChunkKind::Other), "(x)");
        assert!(completion.diagnostics.is_empty(), "{:?}", completion.diagnostics);
    }

    #[test]
    fn test_buffer_is_fresh_on_every_query() {
        let file = Path::new("/src/live.c");
        let mut engine = CEngine::new().unwrap();
        let mut unit = engine.parse(file, &[], b"int first(void);\n").unwrap();

        let edited = b"int first(void);\nint second(void);\n";
        let query = Query { file, buffer: edited, line: 3, column: 1 };
        let completion = engine.complete(&mut unit, &query).unwrap();
        assert!(find(&completion, "second").is_some());
    }

    #[test]
    fn test_diagnostics() {
        let completion = complete_at(SOURCE, Path::new("/src/add.c"), &[], 12, 12);
        let warning = completion
            .diagnostics
            .iter()
            .find(|d| d.severity == Severity::Warning)
            .unwrap();
        assert_eq!(warning.line, 1);
        assert!(warning.message.contains("missing.h"));

        let broken = "int main(void) {\n    int x = ;\n}\n";
        let completion = complete_at(broken, Path::new("/src/broken.c"), &[], 2, 5);
        assert!(completion.diagnostics.iter().any(|d| d.severity == Severity::Error));
    }

    #[test]
    fn test_define_symbol() {
        let plain = define_symbol("DEBUG").unwrap();
        assert_eq!((plain.name.as_str(), plain.signature.as_str()), ("DEBUG", ""));

        let valued = define_symbol("LEVEL=3").unwrap();
        assert_eq!(valued.name, "LEVEL");

        let function = define_symbol("MIN(a,b)=((a)<(b)?(a):(b))").unwrap();
        assert_eq!((function.name.as_str(), function.signature.as_str()), ("MIN", "(a,b)"));

        assert!(define_symbol("=1").is_none());
    }

    #[test]
    fn test_flags_parse() {
        let flags: Vec<String> = ["-I", "/a", "-I/b", "-isystem", "/c", "-D", "X", "-DY=1", "-O2"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let parsed = Flags::parse(&flags);
        assert_eq!(parsed.include_dirs, [PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(parsed.system_dirs, [PathBuf::from("/c")]);
        let names: Vec<_> = parsed.defines.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["X", "Y"]);
    }

    #[test]
    fn test_reserved_names() {
        assert!(is_reserved("__x"));
        assert!(is_reserved("_Bool"));
        assert!(!is_reserved("_private"));
        assert!(!is_reserved("value"));
    }
}
