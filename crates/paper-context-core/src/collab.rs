//! Collaborator interfaces implemented by the calling application.
//!
//! The core never performs I/O. Vector search, paper discovery, text
//! extraction and generation live behind these traits so the application
//! can plug in its own backends, and tests can use in-memory ones.
//! Waiting, timeouts and retries are the implementor's concern.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{Document, SegmentRef, SimilarityMap};
use crate::prompt::PromptPayload;

/// One result of a vector search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityHit {
    #[serde(flatten)]
    pub segment: SegmentRef,
    pub similarity: f64,
}

/// Collect hits into a [`SimilarityMap`], keeping the highest similarity
/// when a segment is reported more than once.
pub fn similarity_map(hits: &[SimilarityHit]) -> SimilarityMap {
    let mut map = SimilarityMap::new();
    for hit in hits {
        map.entry(hit.segment.clone())
            .and_modify(|s: &mut f64| *s = s.max(hit.similarity))
            .or_insert(hit.similarity);
    }
    map
}

/// Similarity search over segments of a corpus.
///
/// Segments are named by `(document_id, sequence)` as produced by
/// [`crate::chunk::chunk`] with the same parameters.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    async fn search(&self, query: &str, corpus: &[Document], limit: usize)
        -> Result<Vec<SimilarityHit>>;
}

/// Finds papers for a query when vector search has too little to offer.
#[async_trait]
pub trait PaperDiscovery: Send + Sync {
    async fn discover(&self, query: &str, limit: usize) -> Result<Vec<Document>>;
}

/// Turns a stored file into plain text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8], content_type: &str) -> Result<String>;
}

/// Produces an answer from a prompt payload. The answer is returned to the
/// user unparsed.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &PromptPayload) -> Result<String>;
}
