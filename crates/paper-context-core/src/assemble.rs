//! Context assembly: selecting scored segments into a bounded block.
//!
//! # Algorithm
//!
//! 1. Order candidates by score descending, breaking ties by the lower
//!    sequence index (a stable sort, so equal keys keep input order).
//! 2. Optionally diversify: the best segment of every document is offered
//!    first, then the remaining segments in the same order.
//! 3. Walk the order greedily. A segment is accepted while the running
//!    total, plus [`SEGMENT_SEPARATOR`] for every segment after the first,
//!    stays within `max_length`. A segment that does not fit is skipped.
//! 4. If the block is still empty when a segment does not fit, that segment
//!    is cut at the last word boundary before the limit and accepted.
//! 5. The accepted segments are returned best-first.

use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

use crate::chunk::content_hash;
use crate::models::{char_len, ContextBlock, ScoredSegment, SEGMENT_SEPARATOR};

/// Limits applied by [`assemble_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssembleOptions {
    /// Maximum characters in the rendered block, separators included.
    pub max_length: usize,
    /// Optional cap on the number of accepted segments.
    pub max_segments: Option<usize>,
    pub diversify_documents: bool,
}

impl AssembleOptions {
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            max_segments: None,
            diversify_documents: false,
        }
    }
}

/// Best-first ordering: score descending, then sequence ascending.
pub fn rank_order(a: &ScoredSegment, b: &ScoredSegment) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then(a.segment.sequence.cmp(&b.segment.sequence))
}

/// Assemble a context block bounded by `max_length` characters.
pub fn assemble(scored: &[ScoredSegment], max_length: usize) -> ContextBlock {
    assemble_with(scored, &AssembleOptions::new(max_length))
}

pub fn assemble_with(scored: &[ScoredSegment], options: &AssembleOptions) -> ContextBlock {
    let mut ranked: Vec<&ScoredSegment> = scored.iter().collect();
    ranked.sort_by(|a, b| rank_order(a, b));

    let order = if options.diversify_documents {
        diversify(ranked)
    } else {
        ranked
    };

    let separator = char_len(SEGMENT_SEPARATOR);
    let limit = options.max_segments.unwrap_or(usize::MAX);
    let mut accepted: Vec<ScoredSegment> = Vec::new();
    let mut total = 0usize;
    let mut truncated = false;

    for candidate in order {
        if accepted.len() >= limit {
            break;
        }
        let overhead = if accepted.is_empty() { 0 } else { separator };
        let len = candidate.segment.char_len();

        if total + overhead + len <= options.max_length {
            total += overhead + len;
            accepted.push(candidate.clone());
        } else if accepted.is_empty() {
            if let Some(cut) = truncate_to_fit(candidate, options.max_length) {
                debug!(
                    segment = %candidate.segment.reference(),
                    from = len,
                    to = cut.segment.char_len(),
                    "truncated leading segment to fit context"
                );
                total = cut.segment.char_len();
                truncated = true;
                accepted.push(cut);
            }
        } else {
            debug!(
                segment = %candidate.segment.reference(),
                chars = len,
                remaining = options.max_length.saturating_sub(total + overhead),
                "segment does not fit, skipped"
            );
        }
    }

    if options.diversify_documents {
        accepted.sort_by(rank_order);
    }

    debug!(
        candidates = scored.len(),
        accepted = accepted.len(),
        total_chars = total,
        max_length = options.max_length,
        "assembled context block"
    );

    ContextBlock {
        segment_count: accepted.len(),
        segments: accepted,
        total_chars: total,
        truncated,
    }
}

/// One best segment per document first, then the rest, both in rank order.
fn diversify(ranked: Vec<&ScoredSegment>) -> Vec<&ScoredSegment> {
    let mut seen: HashSet<String> = HashSet::new();
    let (firsts, rest): (Vec<_>, Vec<_>) = ranked
        .into_iter()
        .partition(|s| seen.insert(s.segment.document_id.clone()));
    firsts.into_iter().chain(rest).collect()
}

/// Cut a segment to at most `max_chars`, preferring a word boundary.
///
/// The cut keeps the segment's start offset and moves its end so the text
/// still equals its span in the source document. Returns `None` when
/// nothing can be kept.
fn truncate_to_fit(candidate: &ScoredSegment, max_chars: usize) -> Option<ScoredSegment> {
    let text = &candidate.segment.text;
    // Byte offset just past the `max_chars`-th character.
    let limit = text
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());

    // The character right after the limit may itself be the boundary.
    let window_end = text[limit..]
        .chars()
        .next()
        .map(|c| limit + c.len_utf8())
        .unwrap_or(limit);
    let at_word_boundary = text[..window_end]
        .char_indices()
        .rev()
        .filter(|(_, c)| c.is_whitespace())
        .map(|(i, _)| text[..i].trim_end().len())
        .find(|&end| end > 0);

    let end = at_word_boundary.unwrap_or(limit);
    if end == 0 {
        return None;
    }

    let mut cut = candidate.clone();
    cut.segment.text = text[..end].to_string();
    cut.segment.end = cut.segment.start + end;
    cut.segment.hash = content_hash(&cut.segment.text);
    cut.segment.oversized = false;
    Some(cut)
}
