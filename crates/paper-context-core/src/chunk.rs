//! Section-aware chunker for academic papers.
//!
//! Splits a [`Document`]'s text into [`Segment`]s that follow the paper's
//! own structure. Each detected heading opens a new section; sections that
//! are too long are split, sections that are too short are merged or
//! dropped.
//!
//! # Algorithm
//!
//! 1. Walk the text line by line and ask each heading detector, in
//!    priority order, whether the line is a heading. The first detector
//!    that answers wins; the line's start offset becomes a boundary.
//! 2. Text before the first heading forms a leading section with no label.
//! 3. A section longer than `max_chunk_size` characters is split
//!    recursively: at the paragraph break closest to its midpoint, else at
//!    the sentence boundary closest to its midpoint, else at the character
//!    limit. Only cuts that leave both halves at least `min_chunk_size`
//!    characters long are considered.
//! 4. A piece shorter than `min_chunk_size` merges into the following
//!    piece of the same section, else into the preceding one. A short piece
//!    alone in its section is dropped.
//! 5. Segments are emitted in document order and their offsets are
//!    re-validated against the source text.
//!
//! # Example
//!
//! ```rust
//! use paper_context_core::chunk::chunk;
//! use paper_context_core::models::Document;
//! use paper_context_core::params::ChunkParams;
//!
//! let text = "1. Introduction\nTransformers replace recurrence with attention over all positions.\n\
//!             2. Methods\nWe train an encoder-decoder model with multi-head self-attention layers.\n";
//! let segments = chunk(&Document::new("doc", text), &ChunkParams::default()).unwrap();
//! assert_eq!(segments.len(), 2);
//! assert_eq!(segments[1].section.as_deref(), Some("Methods"));
//! ```

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::models::{char_len, Document, Segment};
use crate::params::ChunkParams;

/// A heading recognised by a detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub label: String,
    pub level: u8,
}

/// A heading located in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingMatch {
    /// Byte offset of the heading line: the boundary it opens.
    pub offset: usize,
    pub label: String,
    pub level: u8,
    /// Name of the detector that recognised it.
    pub detector: &'static str,
}

/// A heading detector: a pure predicate over one trimmed line.
///
/// `known` holds the document's known section labels. The chunker turns a
/// `Some` answer into a boundary at the line's start offset.
pub type Detector = fn(line: &str, known: &[String]) -> Option<Heading>;

/// Built-in detectors, highest priority first.
pub const DETECTORS: [(&str, Detector); 3] = [
    ("numbered", numbered_heading as Detector),
    ("vocabulary", vocabulary_heading as Detector),
    ("known", known_label_heading as Detector),
];

/// Common academic section names, matched case-insensitively.
const SECTION_VOCABULARY: &[&str] = &[
    "abstract",
    "introduction",
    "background",
    "related work",
    "method",
    "methods",
    "methodology",
    "materials and methods",
    "approach",
    "experiments",
    "results",
    "evaluation",
    "discussion",
    "limitations",
    "conclusion",
    "conclusions",
    "future work",
    "references",
    "bibliography",
    "acknowledgments",
    "acknowledgements",
    "appendix",
];

const MAX_HEADING_CHARS: usize = 120;
const MAX_HEADING_WORDS: usize = 12;

static NUMBERED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}(?:\.\d{1,2})*)\.?\s+(\p{Lu}.*)$").expect("numbered heading regex")
});

static PARAGRAPH_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t\r]*\n\s*").expect("paragraph break regex"));

static SENTENCE_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[.!?]["')\]]?\s+"#).expect("sentence end regex"));

/// "1. Introduction", "2.1 Background", "3 Model Architecture".
pub fn numbered_heading(line: &str, _known: &[String]) -> Option<Heading> {
    let caps = NUMBERED_RE.captures(line)?;
    let number = caps.get(1)?.as_str();
    let title = caps.get(2)?.as_str().trim();

    if char_len(title) > MAX_HEADING_CHARS || title.split_whitespace().count() > MAX_HEADING_WORDS
    {
        return None;
    }
    if title.ends_with(['.', '!', '?', ',', ';']) {
        return None;
    }

    let level = number.split('.').filter(|p| !p.is_empty()).count();
    Some(Heading {
        label: title.to_string(),
        level: level.min(u8::MAX as usize) as u8,
    })
}

/// A standalone line naming a common section ("Abstract", "Related Work:").
pub fn vocabulary_heading(line: &str, _known: &[String]) -> Option<Heading> {
    let label = line.trim_end_matches([':', '.']).trim();
    let lowered = label.to_lowercase();
    SECTION_VOCABULARY
        .iter()
        .any(|name| *name == lowered)
        .then(|| Heading {
            label: label.to_string(),
            level: 1,
        })
}

/// A line equal to one of the document's known section labels.
pub fn known_label_heading(line: &str, known: &[String]) -> Option<Heading> {
    let label = line.trim_end_matches(':').trim();
    known
        .iter()
        .any(|k| !k.trim().is_empty() && k.trim().eq_ignore_ascii_case(label))
        .then(|| Heading {
            label: label.to_string(),
            level: 1,
        })
}

/// A span of the source text on its way to becoming a [`Segment`].
#[derive(Debug, Clone)]
struct Piece {
    start: usize,
    end: usize,
    /// Index of the section this piece belongs to.
    group: usize,
    section: Option<String>,
    level: u8,
}

/// Splits documents into section-aware segments.
#[derive(Debug, Clone)]
pub struct SectionChunker {
    params: ChunkParams,
    detectors: Vec<(&'static str, Detector)>,
}

impl SectionChunker {
    /// Create a chunker with the built-in [`DETECTORS`].
    pub fn new(params: ChunkParams) -> Self {
        Self {
            params,
            detectors: DETECTORS.to_vec(),
        }
    }

    /// Append a detector after the existing ones.
    pub fn with_detector(mut self, name: &'static str, detector: Detector) -> Self {
        self.detectors.push((name, detector));
        self
    }

    pub fn detectors(&self) -> &[(&'static str, Detector)] {
        &self.detectors
    }

    pub fn params(&self) -> &ChunkParams {
        &self.params
    }

    /// Locate every heading line in the document, in order.
    pub fn detect_headings(&self, doc: &Document) -> Vec<HeadingMatch> {
        let mut headings = Vec::new();
        let mut offset = 0;

        for line in doc.text.split_inclusive('\n') {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                for (name, detect) in &self.detectors {
                    if let Some(h) = detect(trimmed, &doc.section_labels) {
                        headings.push(HeadingMatch {
                            offset,
                            label: h.label,
                            level: h.level,
                            detector: *name,
                        });
                        break;
                    }
                }
            }
            offset += line.len();
        }

        headings
    }

    /// Split a document into segments.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidInput`] when the chunk limits are inconsistent.
    /// - [`CoreError::CorruptSegment`] if the produced offsets fail
    ///   re-validation (an internal bug, never expected).
    pub fn chunk(&self, doc: &Document) -> Result<Vec<Segment>> {
        self.params.validate()?;

        if doc.text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let headings = self.detect_headings(doc);
        let sections = section_pieces(&doc.text, &headings);

        let mut pieces = Vec::new();
        for piece in sections {
            self.split_piece(&doc.text, piece, &mut pieces);
        }

        let merged = self.merge_short(&doc.text, pieces);
        let segments: Vec<Segment> = merged
            .into_iter()
            .enumerate()
            .map(|(sequence, p)| self.make_segment(doc, sequence, p))
            .collect();

        validate_segments(doc, &segments)?;

        debug!(
            document_id = %doc.id,
            headings = headings.len(),
            segments = segments.len(),
            oversized = segments.iter().filter(|s| s.oversized).count(),
            "chunked document"
        );

        Ok(segments)
    }

    /// Recursively split a piece until every part fits `max_chunk_size`.
    fn split_piece(&self, text: &str, piece: Piece, out: &mut Vec<Piece>) {
        let (start, end) = trimmed_span(text, piece.start, piece.end);
        if start == end {
            return;
        }

        let body = &text[start..end];
        if char_len(body) <= self.params.max_chunk_size {
            out.push(Piece { start, end, ..piece });
            return;
        }

        let cut = start + self.find_split(body);
        let left = Piece {
            start,
            end: cut,
            ..piece.clone()
        };
        let right = Piece {
            start: cut,
            end,
            ..piece
        };
        self.split_piece(text, left, out);
        self.split_piece(text, right, out);
    }

    /// Byte offset inside `body` at which to cut an oversized piece.
    ///
    /// Always strictly inside the body, so recursion terminates.
    fn find_split(&self, body: &str) -> usize {
        let min = self.params.min_chunk_size;
        let char_starts: Vec<usize> = body.char_indices().map(|(i, _)| i).collect();
        let total = char_starts.len();
        let chars_before = |byte: usize| char_starts.partition_point(|&b| b < byte);

        let admissible = |cut: usize| {
            let left_end = body[..cut].trim_end().len();
            let right_start = cut + (body[cut..].len() - body[cut..].trim_start().len());
            chars_before(left_end) >= min && total - chars_before(right_start) >= min
        };
        let nearest_to_middle = |cuts: Vec<usize>| {
            let middle = total / 2;
            cuts.into_iter()
                .filter(|&c| c > 0 && c < body.len() && admissible(c))
                .min_by_key(|&c| chars_before(c).abs_diff(middle))
        };

        let paragraph_cuts: Vec<usize> =
            PARAGRAPH_BREAK_RE.find_iter(body).map(|m| m.end()).collect();
        if let Some(cut) = nearest_to_middle(paragraph_cuts) {
            return cut;
        }

        let sentence_cuts: Vec<usize> = SENTENCE_END_RE.find_iter(body).map(|m| m.end()).collect();
        if let Some(cut) = nearest_to_middle(sentence_cuts) {
            return cut;
        }

        // Character limit; moved earlier when the remainder would be too short.
        let max = self.params.max_chunk_size;
        let preferred = if total - max < min { total - min } else { max };
        (min..=preferred)
            .rev()
            .map(|c| char_starts[c])
            .find(|&cut| admissible(cut))
            .unwrap_or(char_starts[preferred])
    }

    /// Fold pieces shorter than `min_chunk_size` into a neighbour of the
    /// same section, or drop them when they have none.
    fn merge_short(&self, text: &str, pieces: Vec<Piece>) -> Vec<Piece> {
        let min = self.params.min_chunk_size;
        let mut merged: Vec<Piece> = Vec::with_capacity(pieces.len());
        let mut carry: Option<Piece> = None;

        for i in 0..pieces.len() {
            let mut piece = pieces[i].clone();
            if let Some(short) = carry.take() {
                piece.start = short.start;
            }

            if char_len(&text[piece.start..piece.end]) >= min {
                merged.push(piece);
                continue;
            }

            let next_same_section = pieces.get(i + 1).is_some_and(|n| n.group == piece.group);
            if next_same_section {
                carry = Some(piece);
                continue;
            }

            match merged.last_mut() {
                Some(prev) if prev.group == piece.group => prev.end = piece.end,
                _ => debug!(
                    section = piece.section.as_deref().unwrap_or("(leading)"),
                    chars = char_len(&text[piece.start..piece.end]),
                    "dropping short segment with no merge target"
                ),
            }
        }

        merged
    }

    fn make_segment(&self, doc: &Document, sequence: usize, piece: Piece) -> Segment {
        let text = doc.text[piece.start..piece.end].to_string();
        let oversized = char_len(&text) > self.params.max_chunk_size;

        let hash = content_hash(&text);
        let id = Uuid::new_v5(
            &Uuid::NAMESPACE_OID,
            format!("{}:{}", doc.id, sequence).as_bytes(),
        );

        Segment {
            id: id.to_string(),
            document_id: doc.id.clone(),
            sequence,
            text,
            start: piece.start,
            end: piece.end,
            section: piece.section,
            level: piece.level,
            oversized,
            hash,
        }
    }
}

/// Hex SHA-256 of a segment's text.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Chunk one document with the built-in detectors.
pub fn chunk(doc: &Document, params: &ChunkParams) -> Result<Vec<Segment>> {
    SectionChunker::new(*params).chunk(doc)
}

/// Chunk every document of a corpus, in input order.
///
/// # Errors
///
/// [`CoreError::ChunkingDegenerate`] when no document yields a segment,
/// plus anything [`SectionChunker::chunk`] returns.
pub fn segment_corpus(documents: &[Document], params: &ChunkParams) -> Result<Vec<Segment>> {
    let chunker = SectionChunker::new(*params);
    let mut all = Vec::new();
    for doc in documents {
        all.extend(chunker.chunk(doc)?);
    }

    if all.is_empty() {
        return Err(CoreError::ChunkingDegenerate {
            documents: documents.len(),
        });
    }
    Ok(all)
}

/// Check that segments are consistent with their source document.
///
/// Offsets must lie inside the text on character boundaries, the segment
/// text must equal the span it claims, sequences must be contiguous from
/// zero, and spans must be monotonic and non-overlapping.
pub fn validate_segments(doc: &Document, segments: &[Segment]) -> Result<()> {
    let mut prev_end = 0;
    for (i, seg) in segments.iter().enumerate() {
        let label = format!("#{}", seg.sequence);
        if seg.document_id != doc.id {
            return Err(CoreError::corrupt(
                &doc.id,
                label,
                format!("belongs to document '{}'", seg.document_id),
            ));
        }
        if seg.sequence != i {
            return Err(CoreError::corrupt(
                &doc.id,
                label,
                format!("expected sequence {i}"),
            ));
        }
        check_span(doc, seg)?;
        if seg.start < prev_end {
            return Err(CoreError::corrupt(
                &doc.id,
                label,
                format!("starts at {} before previous end {}", seg.start, prev_end),
            ));
        }
        prev_end = seg.end;
    }
    Ok(())
}

/// Check one segment's span against its source document.
pub fn check_span(doc: &Document, seg: &Segment) -> Result<()> {
    let label = format!("#{}", seg.sequence);
    if seg.start > seg.end || seg.end > doc.text.len() {
        return Err(CoreError::corrupt(
            &doc.id,
            label,
            format!(
                "span {}..{} outside text of length {}",
                seg.start,
                seg.end,
                doc.text.len()
            ),
        ));
    }
    if !doc.text.is_char_boundary(seg.start) || !doc.text.is_char_boundary(seg.end) {
        return Err(CoreError::corrupt(
            &doc.id,
            label,
            "span is not on character boundaries",
        ));
    }
    if doc.text[seg.start..seg.end] != seg.text {
        return Err(CoreError::corrupt(
            &doc.id,
            label,
            "text does not match its span",
        ));
    }
    Ok(())
}

/// One piece per section: leading text plus one per heading.
fn section_pieces(text: &str, headings: &[HeadingMatch]) -> Vec<Piece> {
    let mut pieces = Vec::with_capacity(headings.len() + 1);
    let first = headings.first().map(|h| h.offset).unwrap_or(text.len());
    if first > 0 {
        pieces.push(Piece {
            start: 0,
            end: first,
            group: 0,
            section: None,
            level: 0,
        });
    }

    for (i, h) in headings.iter().enumerate() {
        let end = headings.get(i + 1).map(|n| n.offset).unwrap_or(text.len());
        pieces.push(Piece {
            start: h.offset,
            end,
            group: i + 1,
            section: Some(h.label.clone()),
            level: h.level,
        });
    }
    pieces
}

/// Shrink `start..end` to exclude surrounding whitespace.
fn trimmed_span(text: &str, start: usize, end: usize) -> (usize, usize) {
    let slice = &text[start..end];
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        return (start, start);
    }
    let lead = slice.len() - slice.trim_start().len();
    (start + lead, start + lead + trimmed.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prose(chars: usize) -> String {
        let words = "attention layers relate every position of a sequence to every other position ";
        words.repeat(chars / words.len() + 1)[..chars].trim_end().to_string()
    }

    fn sentences(chars: usize) -> String {
        let s = "Attention relates every position to every other position. ";
        s.repeat(chars / s.len() + 1)[..chars].trim_end().to_string()
    }

    fn params(max: usize, min: usize) -> ChunkParams {
        ChunkParams {
            max_chunk_size: max,
            min_chunk_size: min,
        }
    }

    #[test]
    fn test_empty_document() {
        let doc = Document::new("d", "");
        assert!(chunk(&doc, &ChunkParams::default()).unwrap().is_empty());
        let doc = Document::new("d", "  \n\n\t ");
        assert!(chunk(&doc, &ChunkParams::default()).unwrap().is_empty());
    }

    #[test]
    fn test_no_headings_single_leading_segment() {
        let body = prose(300);
        let doc = Document::new("d", format!("\n  {}\n", body));
        let segs = chunk(&doc, &ChunkParams::default()).unwrap();
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].section, None);
        assert_eq!(segs[0].level, 0);
        assert_eq!(segs[0].text, body);
        assert_eq!(&doc.text[segs[0].start..segs[0].end], body);
    }

    #[test]
    fn test_numbered_heading_detector() {
        let h = numbered_heading("1. Introduction", &[]).unwrap();
        assert_eq!(h.label, "Introduction");
        assert_eq!(h.level, 1);

        let h = numbered_heading("2.1 Background", &[]).unwrap();
        assert_eq!(h.label, "Background");
        assert_eq!(h.level, 2);

        let h = numbered_heading("3 Model Architecture", &[]).unwrap();
        assert_eq!(h.label, "Model Architecture");
    }

    #[test]
    fn test_numbered_detector_rejects_sentences() {
        assert!(numbered_heading("1. We propose a new method for translation.", &[]).is_none());
        assert!(numbered_heading("2. lowercase start", &[]).is_none());
        assert!(numbered_heading("2017 Conference on Neural Systems", &[]).is_none());
        assert!(numbered_heading("Introduction", &[]).is_none());
    }

    #[test]
    fn test_vocabulary_heading_detector() {
        assert_eq!(vocabulary_heading("Abstract", &[]).unwrap().label, "Abstract");
        assert_eq!(
            vocabulary_heading("RELATED WORK:", &[]).unwrap().label,
            "RELATED WORK"
        );
        assert!(vocabulary_heading("Acknowledgments", &[]).is_some());
        assert!(vocabulary_heading("Results are shown below", &[]).is_none());
    }

    #[test]
    fn test_known_label_detector() {
        let known = vec!["Scaled Dot-Product Attention".to_string()];
        let h = known_label_heading("scaled dot-product attention", &known).unwrap();
        assert_eq!(h.level, 1);
        assert!(known_label_heading("Something else", &known).is_none());
    }

    #[test]
    fn test_known_section_labels_open_segments() {
        let text = format!(
            "{}\nScaled Dot-Product Attention\n{}\n",
            prose(100),
            prose(100)
        );
        let plain = Document::new("d", text.clone());
        assert_eq!(chunk(&plain, &ChunkParams::default()).unwrap().len(), 1);

        let doc = Document::new("d", text)
            .with_section_labels(vec!["scaled dot-product attention".to_string()]);
        let segs = chunk(&doc, &ChunkParams::default()).unwrap();
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].section, None);
        assert_eq!(segs[1].section.as_deref(), Some("Scaled Dot-Product Attention"));
        assert_eq!(segs[1].level, 1);
        assert!(segs[1].text.starts_with("Scaled Dot-Product Attention\n"));
    }

    #[test]
    fn test_detector_priority_numbered_first() {
        let chunker = SectionChunker::new(ChunkParams::default());
        let doc = Document::new("d", format!("1. Results\n{}\n", prose(100)));
        let headings = chunker.detect_headings(&doc);
        assert_eq!(headings.len(), 1);
        assert_eq!(headings[0].detector, "numbered");
        assert_eq!(headings[0].label, "Results");
        assert_eq!(headings[0].offset, 0);
    }

    #[test]
    fn test_custom_detector_appended() {
        fn roman(line: &str, _known: &[String]) -> Option<Heading> {
            line.strip_prefix("IV. ").map(|rest| Heading {
                label: rest.to_string(),
                level: 1,
            })
        }
        let chunker = SectionChunker::new(ChunkParams::default()).with_detector("roman", roman);
        assert_eq!(chunker.detectors().len(), DETECTORS.len() + 1);

        let doc = Document::new("d", format!("{}\nIV. Experiments Setup\n{}\n", prose(80), prose(80)));
        let segs = chunker.chunk(&doc).unwrap();
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[1].section.as_deref(), Some("Experiments Setup"));
    }

    #[test]
    fn test_intro_methods_scenario_exact_limit() {
        let intro = prose(180);
        let methods = prose(2500);
        let text = format!("1. Introduction\n{}\n2. Methods\n{}", intro, methods);
        let doc = Document::new("paper", text);
        let segs = chunk(&doc, &params(2000, 50)).unwrap();

        assert_eq!(segs.len(), 3);
        assert_eq!(segs[0].section.as_deref(), Some("Introduction"));
        assert!(segs[0].char_len() >= 180 && segs[0].char_len() < 220);
        assert_eq!(segs[1].section.as_deref(), Some("Methods"));
        assert_eq!(segs[2].section.as_deref(), Some("Methods"));
        assert!(segs[1].char_len() <= 2000);
        assert!(segs[2].char_len() >= 50);
        assert!(segs.iter().all(|s| !s.oversized));
    }

    #[test]
    fn test_intro_methods_scenario_sentence_split() {
        let text = format!(
            "1. Introduction\n{}\n2. Methods\n{}",
            sentences(180),
            sentences(2500)
        );
        let doc = Document::new("paper", text);
        let segs = chunk(&doc, &params(2000, 50)).unwrap();

        assert_eq!(segs.len(), 3);
        assert!(segs[1].text.ends_with('.'));
        assert!(segs[1].char_len() <= 2000);
        assert!(segs[2].char_len() <= 2000);
        assert_eq!(segs[1].section, segs[2].section);
    }

    #[test]
    fn test_split_prefers_paragraph_break_near_middle() {
        let text = format!(
            "{}\n\n{}\n\n{}\n\n{}",
            sentences(100),
            sentences(150),
            sentences(150),
            sentences(100)
        );
        let doc = Document::new("d", text);
        let segs = chunk(&doc, &params(400, 50)).unwrap();
        assert_eq!(segs.len(), 2);
        // The middle break sits between the two 150-char paragraphs.
        assert!(segs[0].text.ends_with(&sentences(150)));
        assert!(segs[1].text.starts_with(&sentences(150)));
    }

    #[test]
    fn test_short_heading_only_section_dropped() {
        let text = format!("Abstract\n1. Introduction\n{}\n", prose(200));
        let doc = Document::new("d", text);
        let segs = chunk(&doc, &ChunkParams::default()).unwrap();
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].section.as_deref(), Some("Introduction"));
        assert_eq!(segs[0].sequence, 0);
    }

    #[test]
    fn test_short_leading_title_dropped() {
        let text = format!("Attention Is All You Need\n\nAbstract\n{}\n", prose(200));
        let doc = Document::new("d", text);
        let segs = chunk(&doc, &ChunkParams::default()).unwrap();
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].section.as_deref(), Some("Abstract"));
    }

    #[test]
    fn test_offsets_match_text_and_are_monotonic() {
        let text = format!(
            "Title line of the paper that is long enough to stay as leading text\n\n\
             Abstract\n{}\n\n1. Introduction\n{}\n\n2. Related Work\n{}\n",
            sentences(300),
            sentences(900),
            prose(700)
        );
        let doc = Document::new("d", text);
        let segs = chunk(&doc, &params(500, 50)).unwrap();
        assert!(validate_segments(&doc, &segs).is_ok());
        for pair in segs.windows(2) {
            assert!(pair[0].end <= pair[1].start);
            assert!(doc.text[pair[0].end..pair[1].start].trim().is_empty());
        }
    }

    #[test]
    fn test_ids_and_hashes_deterministic() {
        let doc = Document::new("d", format!("1. Introduction\n{}\n", sentences(900)));
        let a = chunk(&doc, &params(400, 50)).unwrap();
        let b = chunk(&doc, &params(400, 50)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a[0].id, a[1].id);
        assert_eq!(a[0].hash.len(), 64);
    }

    #[test]
    fn test_multibyte_text() {
        let body = "Ünïcödé attention über alle Positionen ∑ ".repeat(30);
        let doc = Document::new("d", format!("1. Einleitung\n{}", body));
        let segs = chunk(&doc, &params(200, 50)).unwrap();
        assert!(segs.len() > 1);
        assert!(validate_segments(&doc, &segs).is_ok());
        for s in &segs {
            assert!(s.char_len() <= 200);
        }
    }

    #[test]
    fn test_invalid_params_rejected() {
        let doc = Document::new("d", "text");
        let err = chunk(&doc, &params(60, 50)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput { .. }));
    }

    #[test]
    fn test_segment_corpus_degenerate() {
        let docs = vec![Document::new("a", "tiny"), Document::new("b", "")];
        let err = segment_corpus(&docs, &ChunkParams::default()).unwrap_err();
        assert_eq!(err, CoreError::ChunkingDegenerate { documents: 2 });
    }

    #[test]
    fn test_segment_corpus_keeps_document_order() {
        let docs = vec![
            Document::new("a", prose(120)),
            Document::new("b", prose(130)),
        ];
        let segs = segment_corpus(&docs, &ChunkParams::default()).unwrap();
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].document_id, "a");
        assert_eq!(segs[1].document_id, "b");
    }

    #[test]
    fn test_check_span_detects_corruption() {
        let doc = Document::new("d", prose(120));
        let mut segs = chunk(&doc, &ChunkParams::default()).unwrap();
        segs[0].end = doc.text.len() + 10;
        assert!(matches!(
            check_span(&doc, &segs[0]),
            Err(CoreError::CorruptSegment { .. })
        ));
    }
}
