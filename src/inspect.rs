//! `pctx chunk`: show how a paper is segmented.
//!
//! Prints the detected headings and the resulting segments, or the segments
//! as JSON with `--json`. Useful for tuning chunk sizes and checking that
//! a paper's section structure survived extraction.

use anyhow::Result;
use paper_context_core::chunk::{HeadingMatch, SectionChunker};
use paper_context_core::models::{Document, Segment};
use serde::Serialize;
use std::path::Path;

use crate::config::Config;
use crate::documents::load_document;

/// Characters of each segment shown in the text listing.
const PREVIEW_CHARS: usize = 72;

#[derive(Debug, Serialize)]
pub struct ChunkReport {
    pub document_id: String,
    pub title: Option<String>,
    pub chars: usize,
    pub headings: Vec<HeadingReport>,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Serialize)]
pub struct HeadingReport {
    pub offset: usize,
    pub label: String,
    pub level: u8,
    pub detector: &'static str,
}

impl From<HeadingMatch> for HeadingReport {
    fn from(h: HeadingMatch) -> Self {
        Self {
            offset: h.offset,
            label: h.label,
            level: h.level,
            detector: h.detector,
        }
    }
}

pub fn chunk_report(cfg: &Config, doc: &Document) -> Result<ChunkReport> {
    let params = cfg.pipeline_params(Default::default());
    let chunker = SectionChunker::new(params.chunking);
    let headings = chunker
        .detect_headings(doc)
        .into_iter()
        .map(HeadingReport::from)
        .collect();
    let segments = chunker.chunk(doc)?;

    Ok(ChunkReport {
        document_id: doc.id.clone(),
        title: doc.title.clone(),
        chars: doc.text.chars().count(),
        headings,
        segments,
    })
}

pub fn run_chunk(cfg: &Config, path: &Path, json: bool) -> Result<()> {
    let doc = load_document(path, &path.to_string_lossy())?;
    let report = chunk_report(cfg, &doc)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Document: {} ({} chars)", report.document_id, report.chars);
    if let Some(title) = &report.title {
        println!("Title: {}", title);
    }

    println!("Headings: {}", report.headings.len());
    for h in &report.headings {
        println!(
            "  @{:<7} L{} {:<10} {}",
            h.offset, h.level, h.detector, h.label
        );
    }

    println!("Segments: {}", report.segments.len());
    for seg in &report.segments {
        let preview: String = seg
            .text
            .chars()
            .take(PREVIEW_CHARS)
            .map(|c| if c.is_whitespace() { ' ' } else { c })
            .collect();
        println!(
            "  #{} {} [{}..{}] {} chars{}",
            seg.sequence,
            seg.section.as_deref().unwrap_or("(leading text)"),
            seg.start,
            seg.end,
            seg.char_len(),
            if seg.oversized { " OVERSIZED" } else { "" }
        );
        println!("      {}", preview);
    }
    Ok(())
}
