//! Per-call tuning parameters, decoupled from application config.
//!
//! The application builds a [`PipelineParams`] from its TOML config for
//! every query. Nothing in the core reads process-wide settings, so a
//! caller can override any value for a single query.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::prompt::PromptTemplate;

/// Size limits for the section chunker, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChunkParams {
    pub max_chunk_size: usize,
    pub min_chunk_size: usize,
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            max_chunk_size: 2000,
            min_chunk_size: 50,
        }
    }
}

impl ChunkParams {
    pub fn validate(&self) -> Result<()> {
        if self.min_chunk_size == 0 {
            return Err(CoreError::invalid_input("min_chunk_size must be > 0"));
        }
        if self.max_chunk_size < 2 * self.min_chunk_size {
            return Err(CoreError::invalid_input(format!(
                "max_chunk_size ({}) must be at least twice min_chunk_size ({})",
                self.max_chunk_size, self.min_chunk_size
            )));
        }
        Ok(())
    }
}

/// Caller override of the routing decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteOverride {
    #[default]
    Auto,
    ForceRag,
    ForceDirect,
}

/// Similarity thresholds for routing and admission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// The best candidate must reach this score to route to RAG.
    pub rag_similarity_threshold: f64,
    /// Admission cut: candidates below this never enter a context block.
    pub default_similarity_threshold: f64,
    pub route_override: RouteOverride,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            rag_similarity_threshold: 0.7,
            default_similarity_threshold: 0.4,
            route_override: RouteOverride::Auto,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("rag_similarity_threshold", self.rag_similarity_threshold),
            (
                "default_similarity_threshold",
                self.default_similarity_threshold,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CoreError::invalid_input(format!(
                    "{name} must be in [0.0, 1.0], got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Everything one pipeline run needs besides its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineParams {
    pub chunking: ChunkParams,
    /// Maximum characters in the assembled context block.
    pub max_context_length: usize,
    /// Optional cap on the number of segments in a context block.
    pub max_segments: Option<usize>,
    /// Give every document a chance at a slot before a second segment
    /// from the same document is considered.
    pub diversify_documents: bool,
    pub thresholds: Thresholds,
    /// Bonus added when a section label matches the query intent.
    pub header_bonus: f64,
    pub prompt: PromptTemplate,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            chunking: ChunkParams::default(),
            max_context_length: 4000,
            max_segments: None,
            diversify_documents: false,
            thresholds: Thresholds::default(),
            header_bonus: 0.1,
            prompt: PromptTemplate::default(),
        }
    }
}

impl PipelineParams {
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        self.thresholds.validate()?;
        if self.max_context_length == 0 {
            return Err(CoreError::invalid_input("max_context_length must be > 0"));
        }
        if self.max_segments == Some(0) {
            return Err(CoreError::invalid_input("max_segments must be >= 1 when set"));
        }
        if !(0.0..=1.0).contains(&self.header_bonus) {
            return Err(CoreError::invalid_input(format!(
                "header_bonus must be in [0.0, 1.0], got {}",
                self.header_bonus
            )));
        }
        Ok(())
    }
}
