//! # Paper Context
//!
//! Retrieval preparation for questions about academic papers.
//!
//! The heavy lifting lives in [`paper_context_core`]: section-aware
//! chunking, relevance scoring, context assembly and RAG routing. This crate
//! wraps it with the parts that touch the outside world: reading PDF, DOCX
//! and plain-text papers, TOML configuration, a corpus scanner used for
//! paper discovery, precomputed similarity files, and an optional Ollama
//! generator.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────────────────┐   ┌───────────┐
//! │  Papers      │──▶│  Core pipeline               │──▶│  Prompt   │
//! │ PDF/DOCX/TXT │   │ chunk ▸ score ▸ route ▸ pack │   │ (+answer) │
//! └──────────────┘   └──────────────────────────────┘   └───────────┘
//!        ▲                        ▲
//!   discovery              similarity file
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! pctx init                                  # write ./config/pctx.toml
//! pctx chunk paper.pdf                       # inspect segmentation
//! pctx ask "What optimizer was used?" --doc paper.pdf
//! pctx ask "..." --doc paper.pdf --similarities hits.json --generate
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`extract`] | PDF/DOCX/text extraction and cleanup |
//! | [`documents`] | Loading papers and scanning a corpus |
//! | [`similarity`] | Vector search over a precomputed hits file |
//! | [`discovery`] | Lexical paper discovery in a corpus directory |
//! | [`history`] | Conversation history files |
//! | [`generation`] | Answer generation backends |
//! | [`ask`] | The `ask` command |
//! | [`inspect`] | The `chunk` command |
//! | [`logging`] | Tracing subscriber setup |

pub mod ask;
pub mod config;
pub mod discovery;
pub mod documents;
pub mod extract;
pub mod generation;
pub mod history;
pub mod inspect;
pub mod logging;
pub mod similarity;
