//! Static knowledge base adapter.
//!
//! A small in-memory corpus of domain background, keyed by `(intent,
//! domain)`. Lookup is synchronous and infallible: when nothing matches the
//! exact key, the adapter walks a fallback chain and returns the closest
//! material it has, with a correspondingly lower confidence hint.

use crate::adapter::{SourceAdapter, SourceContent, SourceQuery};
use fathom_core::query::{InfoSource, QueryDomain, QueryIntent};
use fathom_core::AppResult;
use std::collections::HashMap;

/// Confidence hint for an exact `(intent, domain)` hit.
const EXACT_HIT_CONFIDENCE: f32 = 0.75;

/// Confidence hint when only the intent matched (general-domain entry).
const INTENT_HIT_CONFIDENCE: f32 = 0.55;

/// Confidence hint for the last-resort educational entry.
const FALLBACK_CONFIDENCE: f32 = 0.30;

/// One knowledge base entry.
#[derive(Debug, Clone)]
pub struct KbEntry {
    pub topic: String,
    pub text: String,
}

impl KbEntry {
    pub fn new(topic: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            text: text.into(),
        }
    }
}

/// In-memory knowledge base client.
pub struct KnowledgeBaseAdapter {
    entries: HashMap<(QueryIntent, QueryDomain), Vec<KbEntry>>,
}

impl KnowledgeBaseAdapter {
    /// Create an adapter over the built-in corpus.
    pub fn new() -> Self {
        Self::with_entries(builtin_corpus())
    }

    /// Create an adapter over a custom corpus.
    pub fn with_entries(entries: HashMap<(QueryIntent, QueryDomain), Vec<KbEntry>>) -> Self {
        Self { entries }
    }

    /// Resolve the closest material for a key, walking the fallback chain.
    fn lookup(&self, intent: QueryIntent, domain: QueryDomain) -> (Vec<&KbEntry>, f32) {
        if let Some(entries) = self.entries.get(&(intent, domain)) {
            return (entries.iter().collect(), EXACT_HIT_CONFIDENCE);
        }

        if domain != QueryDomain::General {
            if let Some(entries) = self.entries.get(&(intent, QueryDomain::General)) {
                return (entries.iter().collect(), INTENT_HIT_CONFIDENCE);
            }
        }

        let fallback = self
            .entries
            .get(&(QueryIntent::Educational, QueryDomain::General))
            .map(|entries| entries.iter().collect())
            .unwrap_or_default();

        (fallback, FALLBACK_CONFIDENCE)
    }
}

impl Default for KnowledgeBaseAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SourceAdapter for KnowledgeBaseAdapter {
    fn source(&self) -> InfoSource {
        InfoSource::KnowledgeBase
    }

    async fn fetch(&self, query: &SourceQuery) -> AppResult<SourceContent> {
        let (entries, confidence_hint) = self.lookup(query.intent, query.domain);

        tracing::debug!(
            intent = %query.intent,
            domain = %query.domain,
            entries = entries.len(),
            "Knowledge base lookup"
        );

        let text = entries
            .iter()
            .map(|entry| format!("{}: {}", entry.topic, entry.text))
            .collect::<Vec<_>>()
            .join("\n\n");

        let topics: Vec<&str> = entries.iter().map(|e| e.topic.as_str()).collect();

        let confidence = if text.is_empty() { 0.0 } else { confidence_hint };
        Ok(
            SourceContent::new(text, confidence)
                .with_metadata(serde_json::json!({ "topics": topics })),
        )
    }
}

/// The built-in corpus: background material for the financial-products
/// domain the engine ships against.
fn builtin_corpus() -> HashMap<(QueryIntent, QueryDomain), Vec<KbEntry>> {
    use QueryDomain::*;
    use QueryIntent::*;

    let mut corpus: HashMap<(QueryIntent, QueryDomain), Vec<KbEntry>> = HashMap::new();

    corpus.insert(
        (Educational, General),
        vec![
            KbEntry::new(
                "Term life insurance",
                "Covers a fixed period (commonly 10, 20, or 30 years) and pays a death \
                 benefit only if the insured dies within the term. Premiums are level and \
                 generally the lowest of any life product.",
            ),
            KbEntry::new(
                "Whole life insurance",
                "Permanent coverage with a guaranteed death benefit and a cash value \
                 component that grows at a contractually fixed rate.",
            ),
            KbEntry::new(
                "Premium",
                "The recurring amount a policyholder pays to keep coverage in force. \
                 Missed premiums beyond the grace period lapse the policy.",
            ),
        ],
    );

    corpus.insert(
        (Comparison, General),
        vec![KbEntry::new(
            "Term versus whole life",
            "Term maximizes coverage per dollar for a bounded need; whole life costs \
             more but never expires and accumulates cash value. The crossover depends on \
             how long the coverage need lasts.",
        )],
    );

    corpus.insert(
        (Calculation, General),
        vec![KbEntry::new(
            "Coverage sizing",
            "A common starting point is ten to fifteen times annual income, adjusted \
             for debts, dependents' timelines, and existing savings.",
        )],
    );

    corpus.insert(
        (QueryIntent::Regulatory, QueryDomain::Regulatory),
        vec![KbEntry::new(
            "State regulation",
            "Insurance is regulated at the state level; insurers and producers must be \
             licensed in each state where policies are sold, and policy forms require \
             state approval.",
        )],
    );

    corpus.insert(
        (FactualLookup, General),
        vec![KbEntry::new(
            "Free-look period",
            "Most states mandate a free-look window (typically 10 to 30 days) during \
             which a new policy can be returned for a full refund.",
        )],
    );

    corpus.insert(
        (Recommendation, General),
        vec![KbEntry::new(
            "Choosing a product",
            "Match the product to the liability: bounded obligations suggest term, \
             permanent obligations or estate planning suggest permanent coverage.",
        )],
    );

    corpus
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(intent: QueryIntent, domain: QueryDomain) -> SourceQuery {
        SourceQuery {
            raw_text: "test".to_string(),
            entities: vec![],
            intent,
            domain,
        }
    }

    #[tokio::test]
    async fn test_exact_hit() {
        let adapter = KnowledgeBaseAdapter::new();
        let content = adapter
            .fetch(&query(QueryIntent::Educational, QueryDomain::General))
            .await
            .unwrap();

        assert!(content.text.contains("Term life insurance"));
        assert_eq!(content.confidence_hint, EXACT_HIT_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_domain_fallback_lowers_confidence() {
        let adapter = KnowledgeBaseAdapter::new();
        // No (Comparison, Market) entry; falls back to (Comparison, General)
        let content = adapter
            .fetch(&query(QueryIntent::Comparison, QueryDomain::Market))
            .await
            .unwrap();

        assert!(content.text.contains("Term versus whole life"));
        assert_eq!(content.confidence_hint, INTENT_HIT_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_last_resort_fallback() {
        let adapter = KnowledgeBaseAdapter::new();
        // No trend entries at all; lands on the educational fallback
        let content = adapter
            .fetch(&query(QueryIntent::TrendAnalysis, QueryDomain::Market))
            .await
            .unwrap();

        assert!(!content.is_empty());
        assert_eq!(content.confidence_hint, FALLBACK_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_lookup_never_fails() {
        let adapter = KnowledgeBaseAdapter::with_entries(HashMap::new());
        let content = adapter
            .fetch(&query(QueryIntent::CurrentEvents, QueryDomain::Market))
            .await
            .unwrap();

        assert!(content.is_empty());
        assert_eq!(content.confidence_hint, 0.0);
    }

    #[tokio::test]
    async fn test_custom_corpus() {
        let mut entries = HashMap::new();
        entries.insert(
            (QueryIntent::Educational, QueryDomain::General),
            vec![KbEntry::new("Widgets", "All about widgets.")],
        );

        let adapter = KnowledgeBaseAdapter::with_entries(entries);
        let content = adapter
            .fetch(&query(QueryIntent::Educational, QueryDomain::General))
            .await
            .unwrap();

        assert!(content.text.contains("Widgets"));
        assert_eq!(content.metadata["topics"][0], "Widgets");
    }
}
