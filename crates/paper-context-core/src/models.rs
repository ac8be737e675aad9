//! Core data models that flow through the retrieval-preparation pipeline.
//!
//! Documents are owned by the caller and only read here. Everything else is
//! created per query and dropped once a prompt payload has been produced.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Separator placed between segments when a [`ContextBlock`] is rendered.
pub const SEGMENT_SEPARATOR: &str = "\n\n---\n\n";

/// Number of characters in a string (limits are measured in characters).
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// A source paper as plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    /// Section labels known ahead of time (e.g. from a table of contents).
    #[serde(default)]
    pub section_labels: Vec<String>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            title: None,
            authors: Vec::new(),
            section_labels: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_authors(mut self, authors: Vec<String>) -> Self {
        self.authors = authors;
        self
    }

    pub fn with_section_labels(mut self, labels: Vec<String>) -> Self {
        self.section_labels = labels;
        self
    }
}

/// A contiguous span of a document treated as one retrieval unit.
///
/// `start`/`end` are UTF-8 byte offsets into [`Document::text`] and
/// `text == document.text[start..end]` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Deterministic UUID derived from the document id and sequence.
    pub id: String,
    pub document_id: String,
    /// Position in the document's segment sequence, starting at 0.
    pub sequence: usize,
    pub text: String,
    pub start: usize,
    pub end: usize,
    /// Heading label that opened this section, `None` for leading text.
    pub section: Option<String>,
    /// Heading depth: 0 for leading text, 1 for top-level sections.
    pub level: u8,
    /// Set when the segment exceeds the configured maximum length.
    pub oversized: bool,
    /// SHA-256 of `text`.
    pub hash: String,
}

impl Segment {
    pub fn char_len(&self) -> usize {
        char_len(&self.text)
    }

    pub fn reference(&self) -> SegmentRef {
        SegmentRef::new(self.document_id.clone(), self.sequence)
    }
}

/// Names a segment across the collaborator boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentRef {
    pub document_id: String,
    pub sequence: usize,
}

impl SegmentRef {
    pub fn new(document_id: impl Into<String>, sequence: usize) -> Self {
        Self {
            document_id: document_id.into(),
            sequence,
        }
    }
}

impl fmt::Display for SegmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.document_id, self.sequence)
    }
}

/// Externally computed similarities, keyed by segment.
pub type SimilarityMap = HashMap<SegmentRef, f64>;

/// Where the similarity component of a score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilaritySource {
    External,
    Lexical,
}

/// Scoring breakdown for a [`ScoredSegment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Similarity component in `[0.0, 1.0]`.
    pub similarity: f64,
    /// Header-match bonus (0.0 when the section label did not match).
    pub header_bonus: f64,
    pub source: SimilaritySource,
}

/// A segment with its relevance to the current query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSegment {
    pub segment: Segment,
    /// Relevance in `[0.0, 1.0]`.
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// The bounded, ordered set of segments that accompanies a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextBlock {
    /// Accepted segments, best first.
    pub segments: Vec<ScoredSegment>,
    /// Characters in [`ContextBlock::render`], separators included.
    pub total_chars: usize,
    pub segment_count: usize,
    /// True when the first segment had to be cut to fit.
    pub truncated: bool,
}

impl ContextBlock {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Concatenate segment texts with [`SEGMENT_SEPARATOR`].
    pub fn render(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.segment.text.as_str())
            .collect::<Vec<_>>()
            .join(SEGMENT_SEPARATOR)
    }
}

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Assistant => write!(f, "Assistant"),
        }
    }
}

/// One prior message of the conversation, supplied per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
