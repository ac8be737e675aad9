//! Relevance scoring of segments against a query.
//!
//! A segment's score combines a similarity component with a structural
//! signal:
//!
//! ```text
//! score = clamp(similarity + header_bonus, 0, 1)
//! ```
//!
//! The similarity comes from the vector-search collaborator when one was
//! supplied for the segment, otherwise from a lexical overlap fallback.
//! The header bonus applies when the segment's section label matches what
//! the query asks about ("how does the method work" favours "Methods").
//!
//! Scoring is deterministic and monotonic: raising either signal never
//! lowers the score.

use std::collections::HashSet;
use tracing::debug;

use crate::models::{ScoreBreakdown, ScoredSegment, Segment, SimilarityMap, SimilaritySource};

/// Default header-match bonus.
pub const DEFAULT_HEADER_BONUS: f64 = 0.1;

/// Query keywords that signal interest in particular sections.
#[derive(Debug, Clone, Copy)]
pub struct IntentRule {
    /// Prefixes matched against query tokens.
    pub query_keywords: &'static [&'static str],
    /// Substrings matched against the lowercased section label.
    pub section_stems: &'static [&'static str],
}

pub const INTENT_RULES: &[IntentRule] = &[
    IntentRule {
        query_keywords: &["method", "approach", "technique", "architecture", "algorithm"],
        section_stems: &["method", "approach", "model", "architecture", "algorithm"],
    },
    IntentRule {
        query_keywords: &["result", "performance", "accuracy", "benchmark", "evaluat", "score"],
        section_stems: &["result", "experiment", "evaluation"],
    },
    IntentRule {
        query_keywords: &["conclu", "takeaway", "finding", "summar"],
        section_stems: &["conclusion", "discussion", "summary"],
    },
    IntentRule {
        query_keywords: &["limitation", "weakness", "drawback", "discuss", "future"],
        section_stems: &["discussion", "limitation", "future work"],
    },
    IntentRule {
        query_keywords: &["related", "prior", "previous", "background", "literature"],
        section_stems: &["related", "background", "literature"],
    },
    IntentRule {
        query_keywords: &["overview", "abstract", "about", "tldr"],
        section_stems: &["abstract", "introduction", "overview"],
    },
    IntentRule {
        query_keywords: &["motivation", "introduc", "problem"],
        section_stems: &["introduction", "motivation"],
    },
    IntentRule {
        query_keywords: &["dataset", "data", "corpus"],
        section_stems: &["data", "corpus", "experiment"],
    },
];

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "do", "does", "for", "from", "how",
    "in", "into", "is", "it", "its", "of", "on", "or", "that", "the", "their", "this", "to",
    "was", "were", "what", "when", "where", "which", "who", "why", "with",
];

/// Lowercased alphanumeric tokens, stop-words and single characters removed.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .map(|t| t.to_lowercase())
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Share of the query's distinct tokens that appear in `text`.
///
/// Returns a value in `[0.0, 1.0]`; `0.0` when the query has no content
/// tokens.
pub fn lexical_similarity(query: &str, text: &str) -> f64 {
    let query_tokens: HashSet<String> = tokenize(query).into_iter().collect();
    if query_tokens.is_empty() {
        return 0.0;
    }
    let text_tokens: HashSet<String> = tokenize(text).into_iter().collect();
    let hits = query_tokens
        .iter()
        .filter(|t| text_tokens.contains(*t))
        .count();
    hits as f64 / query_tokens.len() as f64
}

/// Whether a section label matches the intent of the query.
pub fn header_matches(section: &str, query: &str) -> bool {
    let label = section.to_lowercase();
    let query_tokens = tokenize(query);

    let by_intent = INTENT_RULES.iter().any(|rule| {
        rule.section_stems.iter().any(|stem| label.contains(stem))
            && query_tokens
                .iter()
                .any(|q| rule.query_keywords.iter().any(|k| q.starts_with(k)))
    });
    if by_intent {
        return true;
    }

    let label_tokens = tokenize(&label);
    query_tokens.iter().filter(|q| q.len() >= 4).any(|q| {
        label_tokens.iter().any(|l| {
            l == q || (l.len() >= 4 && (l.starts_with(q.as_str()) || q.starts_with(l.as_str())))
        })
    })
}

/// Clamp to `[0.0, 1.0]`, mapping NaN to `0.0`.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Scores segments against a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelevanceScorer {
    header_bonus: f64,
}

impl Default for RelevanceScorer {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER_BONUS)
    }
}

impl RelevanceScorer {
    pub fn new(header_bonus: f64) -> Self {
        Self {
            header_bonus: clamp_unit(header_bonus),
        }
    }

    pub fn header_bonus(&self) -> f64 {
        self.header_bonus
    }

    /// Score one segment.
    ///
    /// `external` is the vector-search similarity for this segment, if the
    /// collaborator returned one; it is clamped to `[0, 1]`.
    pub fn score(&self, segment: &Segment, query: &str, external: Option<f64>) -> ScoredSegment {
        let (similarity, source) = match external {
            Some(s) => (clamp_unit(s), SimilaritySource::External),
            None => (
                lexical_similarity(query, &segment.text),
                SimilaritySource::Lexical,
            ),
        };

        let header_bonus = match segment.section.as_deref() {
            Some(label) if header_matches(label, query) => self.header_bonus,
            _ => 0.0,
        };

        ScoredSegment {
            segment: segment.clone(),
            score: clamp_unit(similarity + header_bonus),
            breakdown: ScoreBreakdown {
                similarity,
                header_bonus,
                source,
            },
        }
    }

    /// Score a batch of segments, in input order.
    ///
    /// With a similarity map only segments the vector search returned become
    /// candidates. Without one every segment is scored lexically.
    pub fn score_segments(
        &self,
        segments: &[Segment],
        query: &str,
        similarities: Option<&SimilarityMap>,
    ) -> Vec<ScoredSegment> {
        let scored: Vec<ScoredSegment> = match similarities {
            Some(map) => segments
                .iter()
                .filter_map(|seg| {
                    map.get(&seg.reference())
                        .map(|s| self.score(seg, query, Some(*s)))
                })
                .collect(),
            None => segments
                .iter()
                .map(|seg| self.score(seg, query, None))
                .collect(),
        };

        debug!(
            segments = segments.len(),
            candidates = scored.len(),
            external = similarities.is_some(),
            "scored segments"
        );
        scored
    }
}

/// Score one segment with the default header bonus.
pub fn score(segment: &Segment, query: &str, external: Option<f64>) -> ScoredSegment {
    RelevanceScorer::default().score(segment, query, external)
}
