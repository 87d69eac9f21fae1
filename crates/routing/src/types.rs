//! Routing and fusion type definitions.

use fathom_core::error::SourceFailure;
use fathom_core::query::InfoSource;
use fathom_sources::SourceContent;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Suitability of one source for one query, on five independent axes.
///
/// Each axis is computed on its own inputs; no axis is derived from
/// another's value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceEvaluation {
    pub source: InfoSource,

    /// How much of the query's subject matter this source can cover.
    pub coverage: f32,

    /// How reliable this source's answers are for this kind of query.
    pub confidence: f32,

    /// How current this source's material is.
    pub freshness: f32,

    /// How authoritative this source is, independent of the query.
    pub authority: f32,

    /// Suitability on cost: cheap, healthy sources score high; a source
    /// with an open circuit is floored near zero.
    pub cost: f32,
}

impl SourceEvaluation {
    /// Weighted composite of the five axes.
    pub fn composite(&self, weights: &AxisWeights) -> f32 {
        self.coverage * weights.coverage
            + self.confidence * weights.confidence
            + self.freshness * weights.freshness
            + self.authority * weights.authority
            + self.cost * weights.cost
    }
}

/// Weights over the five evaluation axes. Always normalized to sum 1.0
/// before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisWeights {
    pub coverage: f32,
    pub confidence: f32,
    pub freshness: f32,
    pub authority: f32,
    pub cost: f32,
}

impl AxisWeights {
    /// Neutral starting weights, before intent adjustments.
    pub fn base() -> Self {
        Self {
            coverage: 0.30,
            confidence: 0.25,
            freshness: 0.15,
            authority: 0.15,
            cost: 0.15,
        }
    }

    pub fn sum(&self) -> f32 {
        self.coverage + self.confidence + self.freshness + self.authority + self.cost
    }

    /// Rescale so the weights sum to 1.0.
    pub fn normalized(self) -> Self {
        let sum = self.sum();
        if sum <= f32::EPSILON {
            return Self::base();
        }
        Self {
            coverage: self.coverage / sum,
            confidence: self.confidence / sum,
            freshness: self.freshness / sum,
            authority: self.authority / sum,
            cost: self.cost / sum,
        }
    }
}

/// The rule set used to merge multiple sources' content into one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionStrategy {
    /// Contribution proportional to per-source confidence.
    ConfidenceWeighted,
    /// Freshest content dominates; others fill gaps.
    TemporalPriority,
    /// Fixed authority order; lower authority only adds what is missing.
    AuthorityRanked,
    /// Equal-weight merge. Also the single-source passthrough.
    Balanced,
}

impl FusionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FusionStrategy::ConfidenceWeighted => "confidence_weighted",
            FusionStrategy::TemporalPriority => "temporal_priority",
            FusionStrategy::AuthorityRanked => "authority_ranked",
            FusionStrategy::Balanced => "balanced",
        }
    }
}

impl std::fmt::Display for FusionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where to send one query, produced once per query by the router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Never empty: routing force-includes a floor source when every
    /// composite falls below the inclusion threshold.
    pub selected_sources: Vec<InfoSource>,

    pub fusion_strategy: FusionStrategy,

    /// Confidence in this routing choice, in `[0, 1]`.
    pub decision_confidence: f32,

    /// The normalized axis weights the composites were scored with.
    pub weights_used: AxisWeights,
}

/// One successful source lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceResult {
    pub source: InfoSource,
    pub payload: SourceContent,
    pub latency: Duration,
}

/// Everything the orchestrator gathered for one query.
#[derive(Debug, Clone)]
pub struct GatheredResults {
    /// Successful lookups, in completion order. Fusion treats this as an
    /// unordered set keyed by source.
    pub results: Vec<SourceResult>,

    /// Failed or suppressed lookups.
    pub failures: Vec<SourceFailure>,

    /// True when any selected source failed or was skipped.
    pub partial: bool,
}

/// One source's contribution to a fused answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceAttribution {
    pub source: InfoSource,
    pub weight: f32,
    pub confidence: f32,
}

/// The fused, attributed answer for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedResult {
    pub content: String,

    /// Every contributing source, ordered by weight descending. Sources are
    /// kept even at small weight, for transparency.
    pub attributions: Vec<SourceAttribution>,

    /// Never exceeds the maximum individual source confidence.
    pub overall_confidence: f32,

    /// True when the answer was assembled without every selected source.
    pub partial: bool,
}
