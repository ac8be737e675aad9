//! Precomputed vector-search results read from a JSON file.
//!
//! Embeddings are computed elsewhere; `pctx` only consumes their output:
//!
//! ```json
//! [
//!   { "document_id": "attention.pdf", "sequence": 2, "similarity": 0.83 },
//!   { "document_id": "attention.pdf", "sequence": 0, "similarity": 0.41 }
//! ]
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use paper_context_core::collab::{SimilarityHit, VectorSearch};
use paper_context_core::models::Document;
use std::path::Path;

/// [`VectorSearch`] over a fixed list of hits.
#[derive(Debug, Clone, Default)]
pub struct JsonVectorSearch {
    hits: Vec<SimilarityHit>,
}

impl JsonVectorSearch {
    pub fn new(hits: Vec<SimilarityHit>) -> Self {
        Self { hits }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read similarity file: {}", path.display()))?;
        let hits: Vec<SimilarityHit> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse similarity file: {}", path.display()))?;
        Ok(Self::new(hits))
    }
}

#[async_trait]
impl VectorSearch for JsonVectorSearch {
    /// Hits for documents in `corpus`, best first, at most `limit`.
    async fn search(
        &self,
        _query: &str,
        corpus: &[Document],
        limit: usize,
    ) -> Result<Vec<SimilarityHit>> {
        let mut hits: Vec<SimilarityHit> = self
            .hits
            .iter()
            .filter(|h| corpus.iter().any(|d| d.id == h.segment.document_id))
            .cloned()
            .collect();
        hits.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.segment.cmp(&b.segment))
        });
        hits.truncate(limit);
        Ok(hits)
    }
}
