//! Single entry point tying chunking, scoring, routing, assembly and prompt
//! building together.
//!
//! # Algorithm
//!
//! 1. Reject an empty query, then invalid parameters (`InvalidInput`).
//! 2. Chunk every document. A corpus with no usable segment is not an
//!    error here: the query routes direct with "no usable context".
//! 3. Check external similarity references against the segments
//!    (`CorruptSegment` for an unknown document or sequence).
//! 4. Score, decide, assemble the admitted candidates (RAG only), and
//!    build the prompt.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::assemble::{assemble_with, AssembleOptions};
use crate::chunk::segment_corpus;
use crate::error::{CoreError, Result};
use crate::models::{ContextBlock, Document, Segment, SimilarityMap, Turn};
use crate::params::PipelineParams;
use crate::prompt::{build_prompt, PromptPayload};
use crate::route::{decide, RoutingDecision};
use crate::score::RelevanceScorer;

/// Inputs of one query.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub query: String,
    pub documents: Vec<Document>,
    /// Similarities from the vector-search collaborator. When absent every
    /// segment is scored lexically.
    pub similarities: Option<SimilarityMap>,
    pub history: Vec<Turn>,
    pub params: PipelineParams,
}

impl PipelineRequest {
    pub fn new(query: impl Into<String>, documents: Vec<Document>) -> Self {
        Self {
            query: query.into(),
            documents,
            similarities: None,
            history: Vec::new(),
            params: PipelineParams::default(),
        }
    }

    pub fn with_similarities(mut self, similarities: SimilarityMap) -> Self {
        self.similarities = Some(similarities);
        self
    }

    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_params(mut self, params: PipelineParams) -> Self {
        self.params = params;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub routing: RoutingDecision,
    pub prompt: PromptPayload,
    /// Present only for RAG routes.
    pub context: Option<ContextBlock>,
    /// Segments produced from the corpus.
    pub segment_count: usize,
}

/// Run one query through the pipeline.
pub fn run(request: &PipelineRequest) -> Result<PipelineOutcome> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err(CoreError::invalid_input("query is empty"));
    }
    let params = &request.params;
    params.validate()?;

    let segments = match segment_corpus(&request.documents, &params.chunking) {
        Ok(segments) => segments,
        Err(CoreError::ChunkingDegenerate { documents }) => {
            debug!(documents, "corpus has no usable segments, answering directly");
            let prompt = build_prompt(
                query,
                None,
                &request.history,
                &params.prompt,
                &request.documents,
            )?;
            return Ok(PipelineOutcome {
                routing: RoutingDecision::no_usable_context(),
                prompt,
                context: None,
                segment_count: 0,
            });
        }
        Err(e) => return Err(e),
    };

    if let Some(map) = &request.similarities {
        check_references(map, &segments, &request.documents)?;
    }

    let scorer = RelevanceScorer::new(params.header_bonus);
    let scored = scorer.score_segments(&segments, query, request.similarities.as_ref());
    let routing = decide(query, &scored, &params.thresholds)?;

    let context = if routing.is_rag() {
        let options = AssembleOptions {
            max_length: params.max_context_length,
            max_segments: params.max_segments,
            diversify_documents: params.diversify_documents,
        };
        Some(assemble_with(&routing.admitted, &options)).filter(|block| !block.is_empty())
    } else {
        None
    };

    let prompt = build_prompt(
        query,
        context.as_ref(),
        &request.history,
        &params.prompt,
        &request.documents,
    )?;

    debug!(
        route = %routing.route,
        reason = %routing.reason,
        segments = segments.len(),
        context_segments = context.as_ref().map_or(0, |c| c.segment_count),
        "pipeline complete"
    );

    Ok(PipelineOutcome {
        routing,
        prompt,
        context,
        segment_count: segments.len(),
    })
}

/// Every similarity reference must name an existing document and segment.
fn check_references(
    map: &SimilarityMap,
    segments: &[Segment],
    documents: &[Document],
) -> Result<()> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for seg in segments {
        *counts.entry(seg.document_id.as_str()).or_insert(0) += 1;
    }

    let mut refs: Vec<_> = map.keys().collect();
    refs.sort();
    for r in refs {
        if !documents.iter().any(|d| d.id == r.document_id) {
            return Err(CoreError::corrupt(&r.document_id, r, "unknown document"));
        }
        let count = counts.get(r.document_id.as_str()).copied().unwrap_or(0);
        if r.sequence >= count {
            return Err(CoreError::corrupt(
                &r.document_id,
                r,
                format!("document has {count} segment(s)"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SegmentRef;
    use crate::route::{Route, RoutingReason};

    fn paper() -> Document {
        let intro = "Recurrent networks process tokens sequentially which limits parallel \
                     training on long sequences of text.";
        let methods = "The transformer relies entirely on attention. Multi-head attention \
                       lets the model attend to information from different subspaces.";
        Document::new(
            "vaswani",
            format!("1. Introduction\n{intro}\n2. Methods\n{methods}\n"),
        )
        .with_title("Attention Is All You Need")
    }

    #[test]
    fn test_empty_query_is_invalid_input() {
        let err = run(&PipelineRequest::new("", vec![paper()])).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput { .. }));
    }

    #[test]
    fn test_rag_route_with_external_similarities() {
        let mut map = SimilarityMap::new();
        map.insert(SegmentRef::new("vaswani", 1), 0.85);
        map.insert(SegmentRef::new("vaswani", 0), 0.2);
        let request =
            PipelineRequest::new("How does multi-head attention work?", vec![paper()])
                .with_similarities(map);

        let outcome = run(&request).unwrap();
        assert_eq!(outcome.routing.route, Route::Rag);
        let context = outcome.context.unwrap();
        assert_eq!(context.segment_count, 1);
        assert_eq!(context.segments[0].segment.section.as_deref(), Some("Methods"));
        assert!(outcome.prompt.render().contains("Multi-head attention lets"));
        assert_eq!(outcome.segment_count, 2);
    }

    #[test]
    fn test_low_similarities_route_direct() {
        let mut map = SimilarityMap::new();
        map.insert(SegmentRef::new("vaswani", 1), 0.3);
        let request = PipelineRequest::new("Unrelated question about cooking", vec![paper()])
            .with_similarities(map);
        let outcome = run(&request).unwrap();
        assert_eq!(outcome.routing.route, Route::Direct);
        assert!(outcome.context.is_none());
        assert!(outcome.prompt.context.is_none());
    }

    #[test]
    fn test_empty_corpus_routes_direct_without_error() {
        let outcome = run(&PipelineRequest::new("What is attention?", vec![])).unwrap();
        assert_eq!(outcome.routing.reason, RoutingReason::NoUsableContext);
        assert_eq!(outcome.segment_count, 0);
    }

    #[test]
    fn test_unknown_similarity_reference_is_corrupt() {
        let mut map = SimilarityMap::new();
        map.insert(SegmentRef::new("vaswani", 9), 0.9);
        let request = PipelineRequest::new("q", vec![paper()]).with_similarities(map);
        assert!(matches!(
            run(&request),
            Err(CoreError::CorruptSegment { .. })
        ));

        let mut map = SimilarityMap::new();
        map.insert(SegmentRef::new("missing", 0), 0.9);
        let request = PipelineRequest::new("q", vec![paper()]).with_similarities(map);
        assert!(matches!(
            run(&request),
            Err(CoreError::CorruptSegment { .. })
        ));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let mut params = PipelineParams::default();
        params.chunking.min_chunk_size = 0;
        let request = PipelineRequest::new("q", vec![paper()]).with_params(params);
        assert!(matches!(
            run(&request),
            Err(CoreError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_history_passes_through() {
        let request = PipelineRequest::new("And the results?", vec![paper()])
            .with_history(vec![Turn::user("What is the paper about?")]);
        let outcome = run(&request).unwrap();
        assert_eq!(outcome.prompt.history.len(), 1);
    }
}
