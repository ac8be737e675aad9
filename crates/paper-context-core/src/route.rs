//! Routing: answer with retrieved context (RAG) or directly.
//!
//! A decision walks a small state machine:
//!
//! ```text
//! NO_CANDIDATES ──(empty)──────────────────────────▶ ROUTED_DIRECT
//!       │
//!       └──(candidates)──▶ EVALUATING ──┬──▶ ROUTED_RAG
//!                                       └──▶ ROUTED_DIRECT
//! ```
//!
//! RAG requires the best candidate to reach `rag_similarity_threshold`
//! and at least one candidate to clear the admission cut
//! (`default_similarity_threshold`). Only admitted candidates may enter a
//! context block. The decision is monotonic: raising any candidate's score
//! never turns a RAG decision into a direct one.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::chunk::check_span;
use crate::error::{CoreError, Result};
use crate::models::{Document, ScoredSegment};
use crate::params::{RouteOverride, Thresholds};

/// Final route of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Rag,
    Direct,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Rag => write!(f, "rag"),
            Route::Direct => write!(f, "direct"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoutingState {
    NoCandidates,
    Evaluating,
    RoutedRag,
    RoutedDirect,
}

impl fmt::Display for RoutingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoutingState::NoCandidates => "NO_CANDIDATES",
            RoutingState::Evaluating => "EVALUATING",
            RoutingState::RoutedRag => "ROUTED_RAG",
            RoutingState::RoutedDirect => "ROUTED_DIRECT",
        };
        f.write_str(name)
    }
}

/// Why a route was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingReason {
    NoCandidates,
    BelowThreshold,
    NoneAdmitted,
    NoUsableContext,
    ForcedByCaller,
    AboveThreshold,
}

impl fmt::Display for RoutingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RoutingReason::NoCandidates => "no candidates retrieved",
            RoutingReason::BelowThreshold => "max similarity below threshold",
            RoutingReason::NoneAdmitted => "no candidate cleared admission cut",
            RoutingReason::NoUsableContext => "no usable context",
            RoutingReason::ForcedByCaller => "forced by caller",
            RoutingReason::AboveThreshold => "max similarity meets threshold",
        };
        f.write_str(text)
    }
}

/// Summary of the candidate set a decision was made on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateStats {
    pub count: usize,
    /// Candidates at or above the admission cut.
    pub admitted: usize,
    pub max: f64,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub route: Route,
    pub reason: RoutingReason,
    /// Candidates allowed into the context block; empty for direct routes.
    pub admitted: Vec<ScoredSegment>,
    pub stats: CandidateStats,
    /// States visited, first to last.
    pub states: Vec<RoutingState>,
}

impl RoutingDecision {
    pub fn is_rag(&self) -> bool {
        self.route == Route::Rag
    }

    /// Direct decision for a corpus that produced nothing to retrieve from.
    pub fn no_usable_context() -> Self {
        let mut machine = StateMachine::start();
        machine.advance(RoutingState::RoutedDirect);
        machine.finish(
            Route::Direct,
            RoutingReason::NoUsableContext,
            Vec::new(),
            CandidateStats::default(),
        )
    }
}

struct StateMachine {
    states: Vec<RoutingState>,
}

impl StateMachine {
    fn start() -> Self {
        Self {
            states: vec![RoutingState::NoCandidates],
        }
    }

    fn advance(&mut self, next: RoutingState) {
        if let Some(from) = self.states.last() {
            debug!(from = %from, to = %next, "routing transition");
        }
        self.states.push(next);
    }

    fn finish(
        self,
        route: Route,
        reason: RoutingReason,
        admitted: Vec<ScoredSegment>,
        stats: CandidateStats,
    ) -> RoutingDecision {
        RoutingDecision {
            route,
            reason,
            admitted,
            stats,
            states: self.states,
        }
    }
}

/// Candidates at or above the admission cut, in input order.
pub fn admit(candidates: &[ScoredSegment], thresholds: &Thresholds) -> Vec<ScoredSegment> {
    candidates
        .iter()
        .filter(|c| c.score >= thresholds.default_similarity_threshold)
        .cloned()
        .collect()
}

pub fn candidate_stats(candidates: &[ScoredSegment], thresholds: &Thresholds) -> CandidateStats {
    if candidates.is_empty() {
        return CandidateStats::default();
    }
    let max = candidates.iter().map(|c| c.score).fold(0.0, f64::max);
    let mean = candidates.iter().map(|c| c.score).sum::<f64>() / candidates.len() as f64;
    CandidateStats {
        count: candidates.len(),
        admitted: candidates
            .iter()
            .filter(|c| c.score >= thresholds.default_similarity_threshold)
            .count(),
        max,
        mean,
    }
}

/// Decide between RAG and a direct answer.
///
/// # Errors
///
/// - [`CoreError::InvalidInput`] for an empty query or thresholds outside
///   `[0, 1]`. The query is checked before anything else.
/// - [`CoreError::CorruptSegment`] when a candidate's offsets disagree with
///   its own text or its score is outside `[0, 1]`.
pub fn decide(
    query: &str,
    candidates: &[ScoredSegment],
    thresholds: &Thresholds,
) -> Result<RoutingDecision> {
    if query.trim().is_empty() {
        return Err(CoreError::invalid_input("query is empty"));
    }
    thresholds.validate()?;
    for candidate in candidates {
        check_consistency(candidate)?;
    }

    let stats = candidate_stats(candidates, thresholds);
    let mut machine = StateMachine::start();

    if candidates.is_empty() {
        let reason = match thresholds.route_override {
            RouteOverride::ForceDirect => RoutingReason::ForcedByCaller,
            _ => RoutingReason::NoCandidates,
        };
        machine.advance(RoutingState::RoutedDirect);
        return Ok(machine.finish(Route::Direct, reason, Vec::new(), stats));
    }

    machine.advance(RoutingState::Evaluating);
    let admitted = admit(candidates, thresholds);

    let (route, reason) = match thresholds.route_override {
        RouteOverride::ForceDirect => (Route::Direct, RoutingReason::ForcedByCaller),
        RouteOverride::ForceRag if admitted.is_empty() => {
            (Route::Direct, RoutingReason::NoneAdmitted)
        }
        RouteOverride::ForceRag => (Route::Rag, RoutingReason::ForcedByCaller),
        RouteOverride::Auto if stats.max < thresholds.rag_similarity_threshold => {
            (Route::Direct, RoutingReason::BelowThreshold)
        }
        RouteOverride::Auto if admitted.is_empty() => (Route::Direct, RoutingReason::NoneAdmitted),
        RouteOverride::Auto => (Route::Rag, RoutingReason::AboveThreshold),
    };

    let decision = match route {
        Route::Rag => {
            machine.advance(RoutingState::RoutedRag);
            machine.finish(route, reason, admitted, stats)
        }
        Route::Direct => {
            machine.advance(RoutingState::RoutedDirect);
            machine.finish(route, reason, Vec::new(), stats)
        }
    };
    Ok(decision)
}

/// Check candidates against the documents they claim to come from.
pub fn validate_candidates(candidates: &[ScoredSegment], documents: &[Document]) -> Result<()> {
    for candidate in candidates {
        let seg = &candidate.segment;
        let doc = documents
            .iter()
            .find(|d| d.id == seg.document_id)
            .ok_or_else(|| {
                CoreError::corrupt(&seg.document_id, seg.reference(), "unknown document")
            })?;
        check_span(doc, seg)?;
    }
    Ok(())
}

fn check_consistency(candidate: &ScoredSegment) -> Result<()> {
    let seg = &candidate.segment;
    if seg.start > seg.end {
        return Err(CoreError::corrupt(
            &seg.document_id,
            seg.reference(),
            format!("start {} after end {}", seg.start, seg.end),
        ));
    }
    if seg.text.len() != seg.end - seg.start {
        return Err(CoreError::corrupt(
            &seg.document_id,
            seg.reference(),
            format!(
                "text is {} bytes but span {}..{} covers {}",
                seg.text.len(),
                seg.start,
                seg.end,
                seg.end - seg.start
            ),
        ));
    }
    if !(0.0..=1.0).contains(&candidate.score) {
        return Err(CoreError::corrupt(
            &seg.document_id,
            seg.reference(),
            format!("score {} outside [0, 1]", candidate.score),
        ));
    }
    Ok(())
}
