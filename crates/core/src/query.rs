//! Shared query model.
//!
//! `QueryContext` is the structured form of an incoming query, produced once
//! by the classifier and treated as immutable everywhere downstream. The
//! enums here are shared by every crate in the workspace, which is why they
//! live in core rather than next to the classifier.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One of the distinct information providers the engine can consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfoSource {
    /// Vector-indexed document store for company-specific material.
    InternalIndex,
    /// Live web search.
    WebSearch,
    /// Static in-memory domain knowledge base.
    KnowledgeBase,
}

impl InfoSource {
    /// All sources, in a fixed order.
    pub const ALL: [InfoSource; 3] = [
        InfoSource::InternalIndex,
        InfoSource::WebSearch,
        InfoSource::KnowledgeBase,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InfoSource::InternalIndex => "internal_index",
            InfoSource::WebSearch => "web_search",
            InfoSource::KnowledgeBase => "knowledge_base",
        }
    }
}

impl std::fmt::Display for InfoSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the user is trying to accomplish with the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    FactualLookup,
    Comparison,
    Calculation,
    Recommendation,
    TrendAnalysis,
    CurrentEvents,
    Regulatory,
    Personalized,
    Educational,
}

impl QueryIntent {
    pub const ALL: [QueryIntent; 9] = [
        QueryIntent::FactualLookup,
        QueryIntent::Comparison,
        QueryIntent::Calculation,
        QueryIntent::Recommendation,
        QueryIntent::TrendAnalysis,
        QueryIntent::CurrentEvents,
        QueryIntent::Regulatory,
        QueryIntent::Personalized,
        QueryIntent::Educational,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryIntent::FactualLookup => "factual_lookup",
            QueryIntent::Comparison => "comparison",
            QueryIntent::Calculation => "calculation",
            QueryIntent::Recommendation => "recommendation",
            QueryIntent::TrendAnalysis => "trend_analysis",
            QueryIntent::CurrentEvents => "current_events",
            QueryIntent::Regulatory => "regulatory",
            QueryIntent::Personalized => "personalized",
            QueryIntent::Educational => "educational",
        }
    }
}

impl std::fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which body of knowledge the query is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryDomain {
    CompanySpecific,
    Market,
    Regulatory,
    General,
}

impl QueryDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryDomain::CompanySpecific => "company_specific",
            QueryDomain::Market => "market",
            QueryDomain::Regulatory => "regulatory",
            QueryDomain::General => "general",
        }
    }
}

impl std::fmt::Display for QueryDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How fresh the answering material needs to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreshnessNeed {
    /// Only live data will do (spot rates, breaking developments).
    Critical,
    /// Data from the last few hours is acceptable.
    Hourly,
    /// Data from the last day or so is acceptable.
    Daily,
    /// Timeless material; freshness is irrelevant.
    Static,
}

impl FreshnessNeed {
    pub fn as_str(&self) -> &'static str {
        match self {
            FreshnessNeed::Critical => "critical",
            FreshnessNeed::Hourly => "hourly",
            FreshnessNeed::Daily => "daily",
            FreshnessNeed::Static => "static",
        }
    }
}

impl std::fmt::Display for FreshnessNeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured form of an incoming query, immutable after creation.
///
/// `intent_confidence` and `complexity` are always within `[0, 1]`;
/// `intent` is exactly one value. Entities are kept in an ordered set so
/// classifying the same text twice yields an identical context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryContext {
    /// The query exactly as the caller provided it.
    pub raw_text: String,

    /// Selected intent (single label).
    pub intent: QueryIntent,

    /// Normalized score of the winning intent, in `[0, 1]`.
    pub intent_confidence: f32,

    /// Extracted named concepts.
    pub entities: BTreeSet<String>,

    /// Knowledge domain the query targets.
    pub domain: QueryDomain,

    /// Required freshness of the answering material.
    pub freshness_need: FreshnessNeed,

    /// Structural complexity score, in `[0, 1]`.
    pub complexity: f32,
}
