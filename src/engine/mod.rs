//! Interface to the source-analysis engine.
//!
//! The daemon only needs two things from an engine: build an expensive parsed
//! state for a file, and run a cheap completion query against that state with
//! the current buffer contents. Everything language-specific lives behind
//! [`CompletionEngine`].

pub mod c;

#[cfg(test)]
pub mod testing;

use anyhow::Result;
use std::fmt;
use std::path::Path;

/// Source-analysis engine producing raw completion candidates.
pub trait CompletionEngine {
    /// Parsed state for one file. Dropping it releases everything the engine
    /// holds for that parse.
    type Unit;

    /// Build parsed state for `file` using `flags` and the unsaved `buffer`.
    fn parse(&mut self, file: &Path, flags: &[String], buffer: &[u8]) -> Result<Self::Unit>;

    /// Run a completion query against previously parsed state.
    ///
    /// `query.buffer` is always the latest buffer contents; only the parsed
    /// skeleton in `unit` may be stale.
    fn complete(&mut self, unit: &mut Self::Unit, query: &Query<'_>) -> Result<Completion>;
}

/// Position to complete at.
#[derive(Debug, Clone, Copy)]
pub struct Query<'a> {
    pub file: &'a Path,
    pub buffer: &'a [u8],
    /// 1-based line
    pub line: i32,
    /// 1-based column, pointing at the start of the identifier being typed
    pub column: i32,
}

/// Raw engine output for one query.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub candidates: Vec<Candidate>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Role of a display fragment inside a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// The type the completed expression evaluates to
    ResultType,
    /// The text that gets inserted
    TypedText,
    /// Anything else (parameter lists, punctuation)
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub kind: ChunkKind,
    pub text: String,
}

/// One raw completion candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Lower is more relevant
    pub priority: u32,
    pub chunks: Vec<Chunk>,
}

impl Candidate {
    pub fn new(priority: u32) -> Self {
        Self { priority, chunks: Vec::new() }
    }

    /// Append a fragment; empty text is skipped.
    #[must_use]
    pub fn with_chunk(mut self, kind: ChunkKind, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.is_empty() {
            self.chunks.push(Chunk { kind, text });
        }
        self
    }

    /// The insertion text, if the candidate has one.
    pub fn typed_text(&self) -> Option<&str> {
        self.chunks
            .iter()
            .find(|chunk| chunk.kind == ChunkKind::TypedText)
            .map(|chunk| chunk.text.as_str())
    }

    /// Display width (in characters) of all result-type fragments together.
    pub fn result_type_width(&self) -> usize {
        self.chunks
            .iter()
            .filter(|chunk| chunk.kind == ChunkKind::ResultType)
            .map(|chunk| chunk.text.chars().count())
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// Informational message produced while parsing or completing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub column: usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}: {}", self.line, self.column, self.severity, self.message)
    }
}
