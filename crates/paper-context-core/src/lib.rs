//! # Paper Context Core
//!
//! Pure retrieval-preparation logic for Paper Context: section-aware
//! chunking, relevance scoring, context assembly, RAG-vs-direct routing,
//! and prompt construction.
//!
//! This crate contains no tokio, filesystem, or network code. Every
//! function is a synchronous transformation over in-memory data, so
//! independent queries can run concurrently without coordination. The
//! [`collab`] module only declares the traits the calling application
//! implements for vector search, paper discovery, text extraction, and
//! generation.
//!
//! ## Pipeline
//!
//! ```text
//! Document ─▶ chunk ─▶ Segment ─▶ score ─▶ ScoredSegment ─▶ route ─┬─▶ assemble ─▶ ContextBlock ─┐
//!                                                                   │                              ▼
//!                                                                   └──────────────────────▶ build_prompt ─▶ PromptPayload
//! ```
//!
//! ## Example
//!
//! ```rust
//! use paper_context_core::models::Document;
//! use paper_context_core::pipeline::{run, PipelineRequest};
//!
//! let doc = Document::new(
//!     "attention",
//!     "1. Introduction\nRecurrent models process tokens one at a time, which limits parallelism.\n",
//! );
//! let request = PipelineRequest::new("Why are recurrent models slow?", vec![doc]);
//! let outcome = run(&request).unwrap();
//! assert!(outcome.prompt.render().contains("Why are recurrent models slow?"));
//! ```

pub mod assemble;
pub mod chunk;
pub mod collab;
pub mod error;
pub mod models;
pub mod params;
pub mod pipeline;
pub mod prompt;
pub mod route;
pub mod score;

pub use error::{CoreError, Result};
