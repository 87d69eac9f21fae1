//! Routing decisions.
//!
//! Combines the per-source evaluations into a [`RoutingDecision`] via a
//! weighted decision matrix. The axis weights are derived from intent and
//! freshness need through a fixed table; there is no learned or adaptive
//! component, and the only live feedback is the circuit-floored cost axis
//! the evaluator already applied.

use fathom_core::config::RoutingConfig;
use fathom_core::query::{FreshnessNeed, InfoSource, QueryContext, QueryIntent};

use crate::evaluate::UNHEALTHY_COST_FLOOR;
use crate::types::{AxisWeights, FusionStrategy, RoutingDecision, SourceEvaluation};

/// Derive axis weights from the query's intent and freshness need.
///
/// Adjustments are added to the base weights and the result renormalized,
/// so every output sums to 1.0.
pub fn derive_weights(intent: QueryIntent, freshness_need: FreshnessNeed) -> AxisWeights {
    let mut weights = AxisWeights::base();

    match intent {
        QueryIntent::CurrentEvents => weights.freshness += 0.25,
        QueryIntent::TrendAnalysis => weights.freshness += 0.15,
        QueryIntent::Regulatory => weights.authority += 0.25,
        QueryIntent::FactualLookup | QueryIntent::Comparison => weights.coverage += 0.10,
        QueryIntent::Calculation | QueryIntent::Personalized => weights.confidence += 0.10,
        QueryIntent::Recommendation => {
            weights.confidence += 0.05;
            weights.authority += 0.05;
        }
        QueryIntent::Educational => {}
    }

    match freshness_need {
        FreshnessNeed::Critical => weights.freshness += 0.20,
        FreshnessNeed::Hourly => weights.freshness += 0.10,
        FreshnessNeed::Daily => weights.freshness += 0.05,
        FreshnessNeed::Static => {}
    }

    weights.normalized()
}

/// Pick the fusion strategy from intent and how many sources were selected.
fn choose_strategy(intent: QueryIntent, selected: usize) -> FusionStrategy {
    if selected <= 1 {
        // Single source: no fusion needed, trivial passthrough
        return FusionStrategy::Balanced;
    }

    match intent {
        QueryIntent::CurrentEvents | QueryIntent::TrendAnalysis => FusionStrategy::TemporalPriority,
        QueryIntent::Regulatory => FusionStrategy::AuthorityRanked,
        QueryIntent::FactualLookup
        | QueryIntent::Comparison
        | QueryIntent::Calculation
        | QueryIntent::Personalized
        | QueryIntent::Recommendation => FusionStrategy::ConfidenceWeighted,
        QueryIntent::Educational => FusionStrategy::Balanced,
    }
}

/// Confidence in the routing choice itself.
///
/// High when the classifier was sure and the winning composite is strong
/// and well separated from the runner-up.
fn decision_confidence(ctx: &QueryContext, scored: &[(InfoSource, f32)]) -> f32 {
    let top = scored.first().map(|(_, s)| *s).unwrap_or(0.0);
    let runner_up = scored.get(1).map(|(_, s)| *s).unwrap_or(0.0);
    let margin = (top - runner_up).max(0.0);

    (0.5 * ctx.intent_confidence + 0.4 * top + 0.1 * margin).clamp(0.0, 1.0)
}

/// Produce the routing decision for one query.
///
/// Selection guarantees:
/// - every source whose composite exceeds the inclusion threshold is in;
/// - high-complexity queries get at least two sources for cross-validation;
/// - the selection is never empty: when nothing clears the threshold the
///   cheapest source still standing is force-included.
pub fn route(
    ctx: &QueryContext,
    evaluations: &[SourceEvaluation],
    config: &RoutingConfig,
) -> RoutingDecision {
    let weights = derive_weights(ctx.intent, ctx.freshness_need);

    // Sources with a floored cost have an open (or half-open) circuit and
    // stay out of the candidate pool, unless nothing healthy remains
    let healthy: Vec<&SourceEvaluation> = evaluations
        .iter()
        .filter(|eval| eval.cost > UNHEALTHY_COST_FLOOR)
        .collect();
    let pool: Vec<&SourceEvaluation> = if healthy.is_empty() {
        evaluations.iter().collect()
    } else {
        healthy
    };

    let mut scored: Vec<(InfoSource, f32)> = pool
        .iter()
        .map(|eval| (eval.source, eval.composite(&weights)))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut selected: Vec<InfoSource> = scored
        .iter()
        .filter(|(_, score)| *score > config.inclusion_threshold)
        .map(|(source, _)| *source)
        .collect();

    // Complex queries cross-validate across at least two sources
    if ctx.complexity > config.high_complexity_threshold && selected.len() < 2 {
        selected = scored.iter().take(2).map(|(source, _)| *source).collect();
    }

    // Floor inclusion: routing never selects zero sources. Fall back to the
    // best cost score in the pool, i.e. the cheapest source still standing
    if selected.is_empty() {
        let floor = pool
            .iter()
            .max_by(|a, b| a.cost.partial_cmp(&b.cost).unwrap_or(std::cmp::Ordering::Equal))
            .map(|eval| eval.source);
        if let Some(source) = floor {
            tracing::debug!(source = %source, "No source over threshold, floor-including");
            selected.push(source);
        }
    }

    let fusion_strategy = choose_strategy(ctx.intent, selected.len());
    let decision_confidence = decision_confidence(ctx, &scored);

    let decision = RoutingDecision {
        selected_sources: selected,
        fusion_strategy,
        decision_confidence,
        weights_used: weights,
    };

    tracing::debug!(
        sources = ?decision.selected_sources,
        strategy = %decision.fusion_strategy,
        confidence = decision.decision_confidence,
        "Routing decision"
    );

    decision
}
