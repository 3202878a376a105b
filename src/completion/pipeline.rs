//! Turning raw engine candidates into ranked, display-ready proposals.
//!
//! The pipeline runs in four steps: filter by the partial identifier, rank by
//! priority then insertion text, truncate, and format each survivor into a
//! `(word, abbr)` pair whose result types line up in one column.

use crate::daemon::protocol::Proposal;
use crate::engine::{Candidate, ChunkKind};

/// Ceiling on the number of proposals returned for one request.
pub const MAX_RESULTS: usize = 999_999;

/// Widest result-type column, in characters.
pub const MAX_TYPE_WIDTH: usize = 20;

/// Above this many proposals the type column is not measured; it is simply
/// [`MAX_TYPE_WIDTH`] wide.
pub const WIDTH_SIGNIFICANCE_THRESHOLD: usize = 100;

const ELLIPSIS: char = '…';

/// Run the whole pipeline.
pub fn build_proposals(mut candidates: Vec<Candidate>, partial: Option<&str>) -> Vec<Proposal> {
    filter(&mut candidates, partial);
    rank(&mut candidates);
    candidates.truncate(MAX_RESULTS);

    let width = type_column_width(&candidates);
    candidates.iter().map(|candidate| format_proposal(candidate, width)).collect()
}

/// Keep candidates whose insertion text starts with `partial` (byte-wise).
///
/// With no partial identifier everything is kept.
pub fn filter(candidates: &mut Vec<Candidate>, partial: Option<&str>) {
    let Some(partial) = partial else {
        return;
    };
    candidates.retain(|candidate| {
        candidate.typed_text().is_some_and(|text| text.as_bytes().starts_with(partial.as_bytes()))
    });
}

/// Sort by priority ascending, then by insertion text ascending.
///
/// The sort is stable, so candidates equal on both keys keep engine order.
pub fn rank(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.typed_text().unwrap_or_default().cmp(b.typed_text().unwrap_or_default()))
    });
}

/// Width of the result-type column for a batch of candidates.
pub fn type_column_width(candidates: &[Candidate]) -> usize {
    if candidates.len() > WIDTH_SIGNIFICANCE_THRESHOLD {
        return MAX_TYPE_WIDTH;
    }
    candidates.iter().map(Candidate::result_type_width).max().unwrap_or(0).min(MAX_TYPE_WIDTH)
}

/// Render one candidate.
///
/// `abbr` is the result type right-justified to `width`, a space, then every
/// other fragment (insertion text included) in engine order. Result types
/// longer than [`MAX_TYPE_WIDTH`] are cut and end in an ellipsis.
pub fn format_proposal(candidate: &Candidate, width: usize) -> Proposal {
    let mut word = String::new();
    let mut result_type = String::new();
    let mut text = String::new();

    for chunk in &candidate.chunks {
        match chunk.kind {
            ChunkKind::ResultType => result_type.push_str(&chunk.text),
            ChunkKind::TypedText => {
                word.push_str(&chunk.text);
                text.push_str(&chunk.text);
            }
            ChunkKind::Other => text.push_str(&chunk.text),
        }
    }

    if result_type.chars().count() > MAX_TYPE_WIDTH {
        result_type = result_type.chars().take(MAX_TYPE_WIDTH - 1).collect();
        result_type.push(ELLIPSIS);
    }

    Proposal { word, abbr: format!("{result_type:>width$} {text}") }
}
