//! Loading papers from disk into core [`Document`]s.
//!
//! Papers come either from explicit file paths (`--doc`) or from a corpus
//! directory filtered by include/exclude globs. A document's id is its
//! path relative to the corpus root (or the path as given), and its title
//! is the first non-empty line of the extracted text.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use paper_context_core::collab::TextExtractor;
use paper_context_core::models::Document;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::CorpusConfig;
use crate::extract::{content_type_for_path, FileTextExtractor};

/// Titles longer than this are cut at a character boundary.
const MAX_TITLE_CHARS: usize = 200;

/// Load one file as a document with the given id.
pub fn load_document(path: &Path, id: &str) -> Result<Document> {
    load_document_with(path, id, &FileTextExtractor)
}

/// Load one file, turning its bytes into text with `extractor`.
pub fn load_document_with(
    path: &Path,
    id: &str,
    extractor: &dyn TextExtractor,
) -> Result<Document> {
    let Some(content_type) = content_type_for_path(path) else {
        bail!("Unsupported file type: {}", path.display());
    };
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let text = extractor
        .extract(&bytes, content_type)
        .with_context(|| format!("Failed to extract text from {}", path.display()))?;

    let mut doc = Document::new(id, text);
    doc.title = title_of(&doc.text);
    Ok(doc)
}

/// Load explicitly named files. Any failure is an error.
pub fn load_files(paths: &[PathBuf]) -> Result<Vec<Document>> {
    paths
        .iter()
        .map(|path| load_document(path, &path.to_string_lossy()))
        .collect()
}

/// Load every matching file under `root`, sorted by id.
///
/// Files that fail to extract are skipped with a warning.
pub fn scan_corpus(root: &Path, corpus: &CorpusConfig) -> Result<Vec<Document>> {
    if !root.is_dir() {
        bail!("Corpus directory does not exist: {}", root.display());
    }

    let include_set = build_globset(&corpus.include_globs)?;
    let mut excludes = vec!["**/.git/**".to_string()];
    excludes.extend(corpus.exclude_globs.iter().cloned());
    let exclude_set = build_globset(&excludes)?;

    let mut documents = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        match load_document(path, &rel_str) {
            Ok(doc) if doc.text.trim().is_empty() => {
                warn!(path = %rel_str, "skipping file with no extractable text");
            }
            Ok(doc) => documents.push(doc),
            Err(e) => warn!(path = %rel_str, error = %format!("{e:#}"), "skipping file"),
        }
    }

    documents.sort_by(|a, b| a.id.cmp(&b.id));
    debug!(root = %root.display(), documents = documents.len(), "scanned corpus");
    Ok(documents)
}

fn title_of(text: &str) -> Option<String> {
    let line = text.lines().map(str::trim).find(|l| !l.is_empty())?;
    Some(line.chars().take(MAX_TITLE_CHARS).collect())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {pattern}"))?);
    }
    Ok(builder.build()?)
}
