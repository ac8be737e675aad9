//! `pctx ask`: prepare (and optionally generate) an answer to one question.
//!
//! # Retrieval policy
//!
//! 1. Load the explicitly named papers (`--doc`).
//! 2. If a similarity file is given, ask the vector-search collaborator for
//!    hits over those papers.
//! 3. When vector search returned fewer than `retrieval.min_vector_hits`
//!    hits and a corpus directory is known, ask the discovery collaborator
//!    for more papers. A discovered paper whose text matches one already
//!    loaded is skipped. Discovered papers carry no similarities, so the
//!    query is then scored lexically over all papers.
//! 4. Run the core pipeline and print the routing decision, the context
//!    block and the prompt. With `--generate` the prompt is sent to the
//!    configured generator and the answer printed as well.

use anyhow::Result;
use paper_context_core::chunk::content_hash;
use paper_context_core::collab::{similarity_map, Generator, PaperDiscovery, VectorSearch};
use paper_context_core::models::{ContextBlock, Document, Turn};
use paper_context_core::params::RouteOverride;
use paper_context_core::pipeline::{run, PipelineRequest};
use paper_context_core::prompt::PromptPayload;
use paper_context_core::route::{CandidateStats, Route, RoutingReason};
use paper_context_core::CoreError;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::Config;
use crate::discovery::DirectoryDiscovery;
use crate::documents::load_files;
use crate::generation::create_generator;
use crate::history::load_history;
use crate::similarity::JsonVectorSearch;

/// Caller override of the routing decision (`--force`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ForceRoute {
    Rag,
    Direct,
}

pub fn route_override(force: Option<ForceRoute>) -> RouteOverride {
    match force {
        None => RouteOverride::Auto,
        Some(ForceRoute::Rag) => RouteOverride::ForceRag,
        Some(ForceRoute::Direct) => RouteOverride::ForceDirect,
    }
}

#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    pub query: String,
    pub docs: Vec<PathBuf>,
    pub corpus: Option<PathBuf>,
    pub similarities: Option<PathBuf>,
    pub history: Option<PathBuf>,
    pub force: Option<ForceRoute>,
}

/// Everything `pctx ask` reports about one question.
#[derive(Debug, Clone, Serialize)]
pub struct AskReport {
    pub query: String,
    pub route: Route,
    pub reason: RoutingReason,
    pub stats: CandidateStats,
    pub documents: Vec<String>,
    pub segments: usize,
    pub vector_hits: usize,
    pub discovered: usize,
    pub context: Option<ContextBlock>,
    pub prompt: PromptPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

/// Gather inputs through the given collaborators and run the pipeline.
pub async fn prepare(
    cfg: &Config,
    query: &str,
    documents: Vec<Document>,
    history: Vec<Turn>,
    override_route: RouteOverride,
    search: Option<&dyn VectorSearch>,
    discovery: Option<&dyn PaperDiscovery>,
) -> Result<AskReport> {
    ensure_query(query)?;
    let mut documents = documents;

    let hits = match search {
        Some(search) => {
            search
                .search(query, &documents, cfg.retrieval.search_limit)
                .await?
        }
        None => Vec::new(),
    };
    let mut similarities = search.map(|_| similarity_map(&hits));

    let mut discovered = 0;
    if hits.len() < cfg.retrieval.min_vector_hits {
        if let Some(discovery) = discovery {
            let found = discovery
                .discover(query, cfg.retrieval.discovery_limit)
                .await?;
            let mut known: HashSet<String> =
                documents.iter().map(|d| content_hash(&d.text)).collect();
            for doc in found {
                let duplicate = documents.iter().any(|d| d.id == doc.id)
                    || !known.insert(content_hash(&doc.text));
                if duplicate {
                    debug!(document = %doc.id, "discovered paper already loaded");
                    continue;
                }
                documents.push(doc);
                discovered += 1;
            }
            if discovered > 0 && similarities.is_some() {
                debug!(
                    discarded_hits = hits.len(),
                    "discovered papers have no similarities, scoring lexically"
                );
                similarities = None;
            }
            debug!(
                vector_hits = hits.len(),
                discovered, "vector search insufficient, ran discovery"
            );
        }
    }

    let mut request = PipelineRequest::new(query, documents)
        .with_history(history)
        .with_params(cfg.pipeline_params(override_route));
    request.similarities = similarities;

    let outcome = run(&request)?;
    info!(
        route = %outcome.routing.route,
        reason = %outcome.routing.reason,
        candidates = outcome.routing.stats.count,
        admitted = outcome.routing.stats.admitted,
        "routed query"
    );

    Ok(AskReport {
        query: request.query.trim().to_string(),
        route: outcome.routing.route,
        reason: outcome.routing.reason,
        stats: outcome.routing.stats,
        documents: request.documents.iter().map(|d| d.id.clone()).collect(),
        segments: outcome.segment_count,
        vector_hits: hits.len(),
        discovered,
        context: outcome.context,
        prompt: outcome.prompt,
        answer: None,
    })
}

/// Send the report's prompt to a generator and attach the answer.
pub async fn answer(report: &mut AskReport, generator: &dyn Generator) -> Result<()> {
    report.answer = Some(generator.generate(&report.prompt).await?);
    Ok(())
}

/// An empty question fails before any paper is read or collaborator called.
fn ensure_query(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(CoreError::invalid_input("query is empty").into());
    }
    Ok(())
}

pub async fn run_ask(cfg: &Config, opts: AskOptions, json: bool, generate: bool) -> Result<()> {
    ensure_query(&opts.query)?;
    let documents = load_files(&opts.docs)?;
    let history = match &opts.history {
        Some(path) => load_history(path)?,
        None => Vec::new(),
    };

    let search = match &opts.similarities {
        Some(path) => Some(JsonVectorSearch::from_path(path)?),
        None => None,
    };
    let discovery = opts
        .corpus
        .clone()
        .or_else(|| cfg.corpus.root.clone())
        .map(|root| DirectoryDiscovery::new(root, cfg.corpus.clone()));

    let mut report = prepare(
        cfg,
        &opts.query,
        documents,
        history,
        route_override(opts.force),
        search.as_ref().map(|s| s as &dyn VectorSearch),
        discovery.as_ref().map(|d| d as &dyn PaperDiscovery),
    )
    .await?;

    if generate {
        let generator = create_generator(&cfg.generation)?;
        answer(&mut report, generator.as_ref()).await?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &AskReport) {
    println!("Route: {} ({})", report.route, report.reason);
    println!(
        "Candidates: {} scored, {} admitted, max {:.2}, mean {:.2}",
        report.stats.count, report.stats.admitted, report.stats.max, report.stats.mean
    );
    println!(
        "Papers: {} ({} segments, {} vector hits, {} discovered)",
        report.documents.len(),
        report.segments,
        report.vector_hits,
        report.discovered
    );

    if let Some(context) = &report.context {
        println!(
            "Context: {} segment(s), {} chars{}",
            context.segment_count,
            context.total_chars,
            if context.truncated { ", truncated" } else { "" }
        );
        for (i, s) in context.segments.iter().enumerate() {
            println!(
                "  [{}] {} {} (score {:.2})",
                i + 1,
                s.segment.reference(),
                s.segment.section.as_deref().unwrap_or("(leading text)"),
                s.score
            );
        }
    }

    println!();
    println!("--- Prompt ---");
    println!("{}", report.prompt.render());

    if let Some(answer) = &report.answer {
        println!();
        println!("--- Answer ---");
        println!("{}", answer);
    }
}
