//! Scriptable engine for exercising the session cache and the server loop.

use anyhow::{bail, Result};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use super::{Candidate, ChunkKind, Completion, CompletionEngine, Query};

/// Everything a [`RecordingEngine`] was asked to do, in order.
pub type EventLog = Rc<RefCell<Vec<Event>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Parse { file: String, flags: Vec<String> },
    Complete { file: String, line: i32, column: i32 },
    Dispose { file: String },
}

/// Engine that returns fixed candidates and logs every call.
pub struct RecordingEngine {
    events: EventLog,
    candidates: Vec<Candidate>,
    fail_parse: bool,
}

/// Parsed state that logs its own disposal.
pub struct RecordingUnit {
    file: String,
    events: EventLog,
}

impl Drop for RecordingUnit {
    fn drop(&mut self) {
        self.events.borrow_mut().push(Event::Dispose { file: self.file.clone() });
    }
}

impl RecordingEngine {
    /// Engine offering `foo`, `bar` and `foobar`.
    pub fn new() -> Self {
        Self::with_candidates(vec![
            candidate("int", "foo", 10),
            candidate("char *", "bar", 5),
            candidate("long", "foobar", 10),
        ])
    }

    pub fn with_candidates(candidates: Vec<Candidate>) -> Self {
        Self { events: EventLog::default(), candidates, fail_parse: false }
    }

    /// Every parse fails from now on.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail_parse = true;
        self
    }

    pub fn events(&self) -> EventLog {
        Rc::clone(&self.events)
    }
}

pub fn candidate(result_type: &str, word: &str, priority: u32) -> Candidate {
    Candidate::new(priority)
        .with_chunk(ChunkKind::ResultType, result_type)
        .with_chunk(ChunkKind::TypedText, word)
}

impl CompletionEngine for RecordingEngine {
    type Unit = RecordingUnit;

    fn parse(&mut self, file: &Path, flags: &[String], _buffer: &[u8]) -> Result<RecordingUnit> {
        let file = file.display().to_string();
        self.events
            .borrow_mut()
            .push(Event::Parse { file: file.clone(), flags: flags.to_vec() });

        if self.fail_parse {
            bail!("cannot parse {file}");
        }
        Ok(RecordingUnit { file, events: Rc::clone(&self.events) })
    }

    fn complete(&mut self, unit: &mut RecordingUnit, query: &Query<'_>) -> Result<Completion> {
        self.events.borrow_mut().push(Event::Complete {
            file: unit.file.clone(),
            line: query.line,
            column: query.column,
        });
        Ok(Completion { candidates: self.candidates.clone(), diagnostics: Vec::new() })
    }
}
