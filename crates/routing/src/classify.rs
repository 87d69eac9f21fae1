//! Query classification.
//!
//! Turns raw query text into a structured [`QueryContext`] by matching
//! trigger phrases against per-intent tables, the same way the knowledge
//! filters detect query shape: lowercase the text, check indicator
//! substrings, score by match density. Classification never fails; text
//! that matches nothing becomes an `Educational` query with low confidence.

use fathom_core::query::{FreshnessNeed, QueryContext, QueryDomain, QueryIntent};
use std::collections::{BTreeSet, HashSet};

/// Confidence assigned when no trigger table matched at all.
const DEFAULT_CONFIDENCE: f32 = 0.35;

/// Intent-score boost applied when a session hint marks the query as a
/// continuation of a prior personal exchange.
const CONTINUATION_BIAS: f32 = 0.15;

const FACTUAL_TRIGGERS: &[&str] = &[
    "what is covered",
    "coverage amount",
    "how much is",
    "premium rate",
    "policy term",
    "specific policy",
    "exact cost",
    "quote",
    "benefit schedule",
    "covered",
    "deductible",
    "policy",
];

// Same table length as REGULATORY_TRIGGERS: equal single matches tie, and
// ties must resolve by the fixed priority order
const COMPARISON_TRIGGERS: &[&str] = &[
    "compare",
    "versus",
    " vs ",
    "difference between",
    "which is better",
    "best option",
    "pros and cons",
    "better than",
];

const CALCULATION_TRIGGERS: &[&str] = &[
    "calculate",
    "how much would",
    "estimate",
    "projection",
    "monthly payment",
    "total cost",
    "percentage",
    "rate of return",
];

const RECOMMENDATION_TRIGGERS: &[&str] = &[
    "recommend",
    "suggest",
    "what should",
    "best way",
    "which plan",
    "advisable",
    "good idea",
    "worth it",
];

const TREND_TRIGGERS: &[&str] = &[
    "trend",
    "trending",
    "outlook",
    "forecast",
    "historical",
    "over time",
    "trajectory",
    "year over year",
];

const CURRENT_EVENTS_TRIGGERS: &[&str] = &[
    "current",
    "latest",
    "recent",
    "today",
    "right now",
    "breaking",
    "news",
    "announcement",
    "this week",
    "current rate",
    "market rate",
];

const REGULATORY_TRIGGERS: &[&str] = &[
    "regulation",
    "compliance",
    "legal requirement",
    "fiduciary",
    "disclosure",
    "suitability",
    "tax rule",
    "law change",
];

const PERSONALIZED_TRIGGERS: &[&str] = &[
    "should i",
    "my situation",
    "for me",
    "right for me",
    "considering my",
    "advice",
    "am i",
    "personally",
];

const EDUCATIONAL_TRIGGERS: &[&str] = &[
    "what is",
    "what are",
    "how does",
    "explain",
    "meaning of",
    "understand",
    "basics",
    "fundamental",
    "concept",
    "learn",
];

const COMPANY_TERMS: &[&str] = &[
    "my policy",
    "my account",
    "my plan",
    "my coverage",
    "our company",
    "policy",
    "premium",
    "claim",
    "rider",
    "deductible",
    "beneficiary",
];

const MARKET_TERMS: &[&str] = &[
    "market",
    "industry",
    "rates",
    "economy",
    "competitor",
    "sector",
    "interest rate",
];

const REGULATORY_TERMS: &[&str] = &[
    "regulation",
    "compliance",
    "law",
    "legal",
    "fiduciary",
    "disclosure",
    "statute",
];

const CRITICAL_FRESHNESS_TERMS: &[&str] =
    &["current", "right now", "today", "live", "breaking", "as of now"];

const HOURLY_FRESHNESS_TERMS: &[&str] =
    &["latest", "recent", "news", "this week", "just announced"];

const DAILY_FRESHNESS_TERMS: &[&str] = &["trend", "outlook", "this month", "lately"];

/// Words that never count as entities.
const STOPWORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "what", "when", "where", "who", "how", "why", "does",
    "do", "did", "can", "could", "should", "would", "will", "there", "here", "about", "into",
    "than", "then", "over", "under", "more", "most", "some", "any", "all", "please", "tell",
];

/// Single words signalling conditional or comparative structure.
const CONDITIONAL_WORDS: &[&str] = &[
    "if", "unless", "whether", "versus", "compare", "compared", "but", "however", "except",
    "depending",
];

fn trigger_table(intent: QueryIntent) -> &'static [&'static str] {
    match intent {
        QueryIntent::FactualLookup => FACTUAL_TRIGGERS,
        QueryIntent::Comparison => COMPARISON_TRIGGERS,
        QueryIntent::Calculation => CALCULATION_TRIGGERS,
        QueryIntent::Recommendation => RECOMMENDATION_TRIGGERS,
        QueryIntent::TrendAnalysis => TREND_TRIGGERS,
        QueryIntent::CurrentEvents => CURRENT_EVENTS_TRIGGERS,
        QueryIntent::Regulatory => REGULATORY_TRIGGERS,
        QueryIntent::Personalized => PERSONALIZED_TRIGGERS,
        QueryIntent::Educational => EDUCATIONAL_TRIGGERS,
    }
}

/// Fixed tie-break priority. Compliance-sensitive intents must not be
/// silently downgraded, so Regulatory outranks everything, then
/// Personalized, then Comparison, then the rest in declaration order.
fn tie_rank(intent: QueryIntent) -> usize {
    match intent {
        QueryIntent::Regulatory => 0,
        QueryIntent::Personalized => 1,
        QueryIntent::Comparison => 2,
        QueryIntent::FactualLookup => 3,
        QueryIntent::Calculation => 4,
        QueryIntent::Recommendation => 5,
        QueryIntent::TrendAnalysis => 6,
        QueryIntent::CurrentEvents => 7,
        QueryIntent::Educational => 8,
    }
}

/// Raw score for one intent: match density plus a small per-match bonus.
fn intent_score(lowered: &str, triggers: &[&str]) -> f32 {
    let matches = triggers.iter().filter(|t| lowered.contains(*t)).count();
    if matches == 0 {
        return 0.0;
    }
    (matches as f32 / triggers.len() as f32 + matches as f32 * 0.1).min(1.0)
}

fn any_term(lowered: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| lowered.contains(t))
}

fn detect_domain(lowered: &str) -> QueryDomain {
    if any_term(lowered, REGULATORY_TERMS) {
        QueryDomain::Regulatory
    } else if any_term(lowered, COMPANY_TERMS) {
        QueryDomain::CompanySpecific
    } else if any_term(lowered, MARKET_TERMS) {
        QueryDomain::Market
    } else {
        QueryDomain::General
    }
}

fn detect_freshness(lowered: &str, intent: QueryIntent) -> FreshnessNeed {
    if any_term(lowered, CRITICAL_FRESHNESS_TERMS) {
        FreshnessNeed::Critical
    } else if any_term(lowered, HOURLY_FRESHNESS_TERMS) || intent == QueryIntent::CurrentEvents {
        FreshnessNeed::Hourly
    } else if any_term(lowered, DAILY_FRESHNESS_TERMS) || intent == QueryIntent::TrendAnalysis {
        FreshnessNeed::Daily
    } else {
        FreshnessNeed::Static
    }
}

fn extract_entities(lowered: &str, entities: &mut BTreeSet<String>) {
    for token in lowered.split(|c: char| !c.is_alphanumeric()) {
        if token.len() >= 4 && !STOPWORDS.contains(&token) {
            entities.insert(token.to_string());
        }
    }
}

/// Monotonic structural complexity score.
///
/// Grows with query length, entity count, conditional/comparative language,
/// and clause count; never decreases when any of those grow.
fn score_complexity(raw_text: &str, lowered: &str, entity_count: usize) -> f32 {
    let words = raw_text.split_whitespace().count();
    let word_set: HashSet<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let conditionals = CONDITIONAL_WORDS
        .iter()
        .filter(|w| word_set.contains(**w))
        .count();

    let clauses = lowered.matches(',').count()
        + lowered.matches(';').count()
        + lowered.matches(" and ").count()
        + lowered.matches(" or ").count()
        + lowered.matches('?').count().saturating_sub(1);

    let mut complexity = (words as f32 / 40.0).min(0.30);
    complexity += (entity_count as f32 * 0.05).min(0.25);
    complexity += (conditionals as f32 * 0.10).min(0.25);
    complexity += (clauses as f32 * 0.05).min(0.20);
    complexity.min(1.0)
}

/// Classify raw query text into a [`QueryContext`].
///
/// The optional `session_hint` is a short continuation marker from the
/// conversation layer; it biases classification toward the Personalized
/// intent and contributes to entity extraction. Classification is a pure
/// function of its inputs: the same text and hint always produce an
/// identical context.
pub fn classify(raw_text: &str, session_hint: Option<&str>) -> QueryContext {
    let lowered = raw_text.to_lowercase();

    let mut best_intent = QueryIntent::Educational;
    let mut best_score = 0.0f32;

    for intent in QueryIntent::ALL {
        let mut score = intent_score(&lowered, trigger_table(intent));

        if intent == QueryIntent::Personalized
            && session_hint.is_some_and(|h| !h.trim().is_empty())
        {
            score += CONTINUATION_BIAS;
        }

        let wins = score > best_score
            || (score == best_score && score > 0.0 && tie_rank(intent) < tie_rank(best_intent));
        if wins {
            best_intent = intent;
            best_score = score;
        }
    }

    let intent_confidence = if best_score > 0.0 {
        best_score.min(1.0)
    } else {
        DEFAULT_CONFIDENCE
    };

    let mut entities = BTreeSet::new();
    extract_entities(&lowered, &mut entities);
    if let Some(hint) = session_hint {
        extract_entities(&hint.to_lowercase(), &mut entities);
    }

    let domain = detect_domain(&lowered);
    let freshness_need = detect_freshness(&lowered, best_intent);
    let complexity = score_complexity(raw_text, &lowered, entities.len());

    let ctx = QueryContext {
        raw_text: raw_text.to_string(),
        intent: best_intent,
        intent_confidence,
        entities,
        domain,
        freshness_need,
        complexity,
    };

    tracing::debug!(
        intent = %ctx.intent,
        confidence = ctx.intent_confidence,
        domain = %ctx.domain,
        freshness = %ctx.freshness_need,
        complexity = ctx.complexity,
        "Classified query"
    );

    ctx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_market_rate_is_current_events() {
        let ctx = classify("what is the current market rate", None);

        assert_eq!(ctx.intent, QueryIntent::CurrentEvents);
        assert_eq!(ctx.domain, QueryDomain::Market);
        assert_eq!(ctx.freshness_need, FreshnessNeed::Critical);
        assert!(ctx.intent_confidence > 0.3);
    }

    #[test]
    fn test_policy_coverage_is_factual_company_specific() {
        let ctx = classify("what is covered in my policy", None);

        assert_eq!(ctx.intent, QueryIntent::FactualLookup);
        assert_eq!(ctx.domain, QueryDomain::CompanySpecific);
        assert_eq!(ctx.freshness_need, FreshnessNeed::Static);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let text = "should I compare the latest rates, or keep my current policy?";
        let first = classify(text, Some("more"));
        let second = classify(text, Some("more"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_unmatched_query_defaults_to_educational() {
        let ctx = classify("zzz qqq xxyzzy", None);

        assert_eq!(ctx.intent, QueryIntent::Educational);
        assert_eq!(ctx.intent_confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_tie_breaks_toward_regulatory() {
        // One trigger hit each, equal table lengths: an exact score tie
        let ctx = classify("compare compliance options", None);
        assert_eq!(ctx.intent, QueryIntent::Regulatory);
    }

    #[test]
    fn test_session_hint_biases_personalized() {
        let without_hint = classify("ok continue", None);
        assert_eq!(without_hint.intent, QueryIntent::Educational);

        let with_hint = classify("ok continue", Some("1"));
        assert_eq!(with_hint.intent, QueryIntent::Personalized);
    }

    #[test]
    fn test_complexity_is_monotonic() {
        let simple = classify("what is a premium", None);
        let complex = classify(
            "compare whole life versus term life for my family, and explain whether \
             conversion riders, accelerated benefits, or waiver of premium matter \
             if my income changes?",
            None,
        );

        assert!(complex.complexity > simple.complexity);
        assert!(simple.complexity >= 0.0 && simple.complexity <= 1.0);
        assert!(complex.complexity <= 1.0);
    }

    #[test]
    fn test_entities_filter_stopwords() {
        let ctx = classify("what is the deductible on my policy", None);

        assert!(ctx.entities.contains("deductible"));
        assert!(ctx.entities.contains("policy"));
        assert!(!ctx.entities.contains("what"));
        assert!(!ctx.entities.contains("the"));
    }

    #[test]
    fn test_regulatory_query() {
        let ctx = classify("what are the disclosure regulation changes", None);

        assert_eq!(ctx.intent, QueryIntent::Regulatory);
        assert_eq!(ctx.domain, QueryDomain::Regulatory);
    }

    #[test]
    fn test_trend_query_gets_daily_freshness() {
        let ctx = classify("how have annuity payout trends moved over time", None);

        assert_eq!(ctx.intent, QueryIntent::TrendAnalysis);
        assert_eq!(ctx.freshness_need, FreshnessNeed::Daily);
    }

    #[test]
    fn test_confidence_in_unit_range() {
        for text in [
            "compare compare compare versus versus difference between better than",
            "current latest recent today breaking news announcement",
            "x",
        ] {
            let ctx = classify(text, None);
            assert!(ctx.intent_confidence >= 0.0 && ctx.intent_confidence <= 1.0);
        }
    }
}
