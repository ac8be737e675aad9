//! Paper discovery over a local directory of papers.
//!
//! Used as the fallback when vector search returns too few hits: every
//! paper under the root is ranked by how many of the query's terms it
//! contains, and the best matches join the corpus for this query.

use anyhow::Result;
use async_trait::async_trait;
use paper_context_core::collab::PaperDiscovery;
use paper_context_core::models::Document;
use paper_context_core::score::lexical_similarity;
use std::path::PathBuf;
use tracing::debug;

use crate::config::CorpusConfig;
use crate::documents::scan_corpus;

#[derive(Debug, Clone)]
pub struct DirectoryDiscovery {
    root: PathBuf,
    corpus: CorpusConfig,
}

impl DirectoryDiscovery {
    pub fn new(root: PathBuf, corpus: CorpusConfig) -> Self {
        Self { root, corpus }
    }
}

/// Documents with at least one query term, best match first.
pub fn rank_documents(query: &str, documents: Vec<Document>, limit: usize) -> Vec<Document> {
    let mut ranked: Vec<(f64, Document)> = documents
        .into_iter()
        .map(|d| (lexical_similarity(query, &d.text), d))
        .filter(|(score, _)| *score > 0.0)
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));
    ranked.into_iter().take(limit).map(|(_, d)| d).collect()
}

#[async_trait]
impl PaperDiscovery for DirectoryDiscovery {
    async fn discover(&self, query: &str, limit: usize) -> Result<Vec<Document>> {
        let root = self.root.clone();
        let corpus = self.corpus.clone();
        let documents = tokio::task::spawn_blocking(move || scan_corpus(&root, &corpus)).await??;

        let found = rank_documents(query, documents, limit);
        debug!(
            root = %self.root.display(),
            found = found.len(),
            "discovered papers"
        );
        Ok(found)
    }
}
