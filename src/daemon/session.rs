//! The daemon's completion session: one cached parse plus the request path.
//!
//! Parsing is the expensive step, so the session keeps exactly one parsed
//! unit, keyed on the (file, flags) pair it was built for. A request with the
//! same key reuses it; anything else disposes it and parses again. The buffer
//! itself is never part of the key: every completion query is handed the
//! fresh buffer.

use std::path::Path;

use crate::completion::{build_proposals, extract_partial};
use crate::daemon::protocol::{CompletionRequest, CompletionResponse};
use crate::engine::{CompletionEngine, Query};
use crate::project;

/// The cached parse and what it was built from.
struct CacheEntry<U> {
    file: String,
    flags: Vec<String>,
    unit: U,
}

impl<U> CacheEntry<U> {
    fn matches(&self, file: &str, flags: &[String]) -> bool {
        self.file == file && self.flags == flags
    }
}

/// Owns the engine and its single cached unit.
///
/// Owned by the dispatch loop; there is no other way to reach the cache.
pub struct CompletionSession<E: CompletionEngine> {
    engine: E,
    entry: Option<CacheEntry<E::Unit>>,
    rebuilds: u64,
}

impl<E: CompletionEngine> CompletionSession<E> {
    pub fn new(engine: E) -> Self {
        Self { engine, entry: None, rebuilds: 0 }
    }

    /// Handle one completion request, loading flags from the project file.
    pub fn complete(&mut self, request: &CompletionRequest) -> CompletionResponse {
        let flags = project::load_flags(Path::new(&request.filename));
        self.complete_with_flags(request, flags)
    }

    /// Handle one completion request with an explicit flag list.
    ///
    /// Engine failures never escape: they are logged and produce an empty
    /// proposal list.
    pub fn complete_with_flags(
        &mut self,
        request: &CompletionRequest,
        flags: Vec<String>,
    ) -> CompletionResponse {
        let partial = extract_partial(&request.buffer, request.line, request.column);
        if let Some(partial) = &partial {
            tracing::trace!("Partial {:?} starts at byte {}", partial.text, partial.start);
        }
        let partial_len = partial.as_ref().map_or(0, |partial| partial.text.len());
        let partial_len = i32::try_from(partial_len).unwrap_or(i32::MAX);
        let empty = CompletionResponse { partial: partial_len, proposals: Vec::new() };

        let file = Path::new(&request.filename);
        if !self.refresh(file, &request.filename, flags, &request.buffer) {
            return empty;
        }
        let Some(entry) = self.entry.as_mut() else {
            return empty;
        };

        let query = Query {
            file,
            buffer: &request.buffer,
            line: request.line,
            column: request.column - partial_len,
        };
        let completion = match self.engine.complete(&mut entry.unit, &query) {
            Ok(completion) => completion,
            Err(err) => {
                tracing::warn!("Completion failed for {}: {err:#}", request.filename);
                return empty;
            }
        };

        for diagnostic in &completion.diagnostics {
            tracing::debug!("{}:{diagnostic}", request.filename);
        }

        let proposals = build_proposals(
            completion.candidates,
            partial.as_ref().map(|partial| partial.text.as_str()),
        );
        tracing::debug!(
            "{}:{}:{}: {} proposal(s)",
            request.filename,
            request.line,
            request.column,
            proposals.len()
        );

        CompletionResponse { partial: partial_len, proposals }
    }

    /// Make sure the cached unit matches `(filename, flags)`, rebuilding it if
    /// not. Returns `false` when no usable unit exists afterwards.
    fn refresh(&mut self, file: &Path, filename: &str, flags: Vec<String>, buffer: &[u8]) -> bool {
        if self.entry.as_ref().is_some_and(|entry| entry.matches(filename, &flags)) {
            return true;
        }

        // the old unit must be gone before the new one is built
        self.dispose();
        self.rebuilds += 1;
        tracing::debug!("Parse #{} of {filename} with {} flag(s)", self.rebuilds, flags.len());

        match self.engine.parse(file, &flags, buffer) {
            Ok(unit) => {
                self.entry = Some(CacheEntry { file: filename.to_string(), flags, unit });
                true
            }
            Err(err) => {
                tracing::warn!("Failed to parse {filename}: {err:#}");
                false
            }
        }
    }

    /// Drop the cached unit, if any.
    pub fn dispose(&mut self) {
        if let Some(entry) = self.entry.take() {
            tracing::debug!("Disposing parsed state for {}", entry.file);
        }
    }

    /// Number of parses performed so far.
    #[cfg(test)]
    pub const fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// File the cached unit was built for.
    #[cfg(test)]
    pub fn cached_file(&self) -> Option<&str> {
        self.entry.as_ref().map(|entry| entry.file.as_str())
    }

    #[cfg(test)]
    pub const fn engine(&self) -> &E {
        &self.engine
    }
}
