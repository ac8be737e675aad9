//! Error types for the Paper Context core.
//!
//! All failures are local and synchronous. The core never retries; the
//! caller decides whether to recover (for example by answering directly
//! when a corpus produced no usable segments).

/// Errors returned by the core pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    /// Empty or malformed query, or an inconsistent configuration.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// A segment or segment reference disagrees with its source document.
    #[error("corrupt segment {segment} in document '{document_id}': {reason}")]
    CorruptSegment {
        document_id: String,
        segment: String,
        reason: String,
    },

    /// Chunking produced no usable segment for any input document.
    #[error("chunking produced no usable segments from {documents} document(s)")]
    ChunkingDegenerate { documents: usize },
}

impl CoreError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn corrupt(
        document_id: impl Into<String>,
        segment: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        Self::CorruptSegment {
            document_id: document_id.into(),
            segment: segment.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the core.
pub type Result<T> = std::result::Result<T, CoreError>;
