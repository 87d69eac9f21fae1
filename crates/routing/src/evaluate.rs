//! Per-source suitability scoring.
//!
//! For each query, every source gets five independently computed axes:
//! coverage and confidence come from an `(intent, domain)` affinity table
//! scaled by the source's static capability profile; freshness and
//! authority are profile constants; cost starts from the profile and is
//! floored when the live circuit state says the source is unhealthy. An
//! open circuit must never look attractive enough to be picked as primary.

use fathom_core::config::SourcesConfig;
use fathom_core::query::{InfoSource, QueryContext, QueryDomain, QueryIntent};
use fathom_sources::{CircuitState, SourceHealth};

use crate::types::SourceEvaluation;

/// Cost score assigned to a source whose circuit is open or half-open.
/// Doubles as the router's marker for "do not select unless nothing else
/// is standing".
pub const UNHEALTHY_COST_FLOOR: f32 = 0.05;

/// Static capability profile for one source. Configured, not learned.
#[derive(Debug, Clone)]
pub struct SourceProfile {
    pub source: InfoSource,

    /// Scales the affinity table's coverage value.
    pub coverage_mult: f32,

    /// Scales the affinity table's confidence value.
    pub confidence_mult: f32,

    /// Fixed freshness score for this source type.
    pub freshness: f32,

    /// Fixed authority constant.
    pub authority: f32,

    /// Cost suitability when healthy (higher = cheaper).
    pub base_cost: f32,
}

impl SourceProfile {
    /// Default profiles for the three sources.
    ///
    /// The internal index's freshness depends on how often the deployment
    /// re-syncs its documents, so it comes from configuration; web search
    /// is near-live and the knowledge base is static by construction.
    pub fn defaults(sources: &SourcesConfig) -> Vec<SourceProfile> {
        vec![
            SourceProfile {
                source: InfoSource::InternalIndex,
                coverage_mult: 1.0,
                confidence_mult: 1.0,
                freshness: sources.index_freshness,
                authority: 0.95,
                base_cost: 0.60,
            },
            SourceProfile {
                source: InfoSource::WebSearch,
                coverage_mult: 1.0,
                confidence_mult: 0.90,
                freshness: 0.95,
                authority: 0.70,
                base_cost: 0.35,
            },
            SourceProfile {
                source: InfoSource::KnowledgeBase,
                coverage_mult: 0.90,
                confidence_mult: 0.85,
                freshness: 0.05,
                authority: 0.80,
                base_cost: 0.90,
            },
        ]
    }
}

/// Base (coverage, confidence) for a source against a classified query,
/// before profile multipliers.
fn base_affinity(source: InfoSource, intent: QueryIntent, domain: QueryDomain) -> (f32, f32) {
    use QueryDomain::*;
    use QueryIntent::*;

    match source {
        InfoSource::InternalIndex => match (intent, domain) {
            (_, CompanySpecific) => (0.95, 0.90),
            (CurrentEvents, _) => (0.20, 0.30),
            (TrendAnalysis, _) => (0.35, 0.40),
            (QueryIntent::Regulatory, _) => (0.60, 0.60),
            (Personalized, _) => (0.75, 0.70),
            (Comparison, _) => (0.70, 0.65),
            (FactualLookup, _) => (0.70, 0.65),
            (Educational, _) => (0.50, 0.55),
            _ => (0.55, 0.55),
        },
        InfoSource::WebSearch => match (intent, domain) {
            (_, CompanySpecific) => (0.20, 0.25),
            (CurrentEvents, _) => (0.95, 0.80),
            (TrendAnalysis, _) => (0.90, 0.75),
            (QueryIntent::Regulatory, _) => (0.80, 0.70),
            (Comparison, _) => (0.75, 0.65),
            (Educational, _) => (0.70, 0.65),
            (_, Market) => (0.85, 0.75),
            _ => (0.60, 0.60),
        },
        InfoSource::KnowledgeBase => match (intent, domain) {
            (CurrentEvents, _) => (0.10, 0.20),
            (TrendAnalysis, _) => (0.20, 0.30),
            (Educational, _) => (0.90, 0.80),
            (QueryIntent::Regulatory, _) => (0.50, 0.55),
            (FactualLookup, General) => (0.60, 0.60),
            (_, CompanySpecific) => (0.35, 0.40),
            _ => (0.50, 0.50),
        },
    }
}

/// Evaluate one source against a query.
fn evaluate_one(
    ctx: &QueryContext,
    profile: &SourceProfile,
    circuit: CircuitState,
) -> SourceEvaluation {
    let (base_coverage, base_confidence) = base_affinity(profile.source, ctx.intent, ctx.domain);

    let cost = match circuit {
        CircuitState::Closed => profile.base_cost,
        // Open and half-open circuits both get floored: a recovering
        // source may serve a probe, never a primary role
        CircuitState::Open | CircuitState::HalfOpen => UNHEALTHY_COST_FLOOR,
    };

    SourceEvaluation {
        source: profile.source,
        coverage: (base_coverage * profile.coverage_mult).clamp(0.0, 1.0),
        confidence: (base_confidence * profile.confidence_mult).clamp(0.0, 1.0),
        freshness: profile.freshness.clamp(0.0, 1.0),
        authority: profile.authority.clamp(0.0, 1.0),
        cost,
    }
}

/// Produce one [`SourceEvaluation`] per configured source profile.
pub fn evaluate_sources(
    ctx: &QueryContext,
    profiles: &[SourceProfile],
    health: &SourceHealth,
) -> Vec<SourceEvaluation> {
    profiles
        .iter()
        .map(|profile| {
            let circuit = health.circuit_state(profile.source);
            let eval = evaluate_one(ctx, profile, circuit);

            tracing::trace!(
                source = %eval.source,
                coverage = eval.coverage,
                confidence = eval.confidence,
                freshness = eval.freshness,
                authority = eval.authority,
                cost = eval.cost,
                circuit = %circuit,
                "Evaluated source"
            );

            eval
        })
        .collect()
}
