//! The query engine pipeline.
//!
//! Ties the stages together: result cache → classify → decision cache or
//! evaluate+route → orchestrate → fuse → cache. This is the in-process
//! library entry point; a downstream answer-generation collaborator turns
//! the fused result into user-facing text.

use fathom_core::config::AppConfig;
use fathom_core::query::InfoSource;
use fathom_core::AppResult;
use fathom_sources::{HealthSnapshot, SourceAdapter, SourceHealth};
use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::{CacheStats, DecisionCache, DecisionKey, ResultCache};
use crate::classify::classify;
use crate::evaluate::{evaluate_sources, SourceProfile};
use crate::fusion::fuse;
use crate::orchestrate::Orchestrator;
use crate::router::route;
use crate::types::FusedResult;

/// Query routing and source-fusion engine.
///
/// Holds the one piece of shared mutable state (the health tracker) and the
/// two caches; everything else in the pipeline is a pure function over the
/// query.
pub struct QueryEngine {
    config: AppConfig,
    profiles: Vec<SourceProfile>,
    health: Arc<SourceHealth>,
    orchestrator: Orchestrator,
    decision_cache: DecisionCache,
    result_cache: ResultCache,
}

impl QueryEngine {
    /// Build an engine over an adapter set.
    pub fn new(config: AppConfig, adapters: HashMap<InfoSource, Arc<dyn SourceAdapter>>) -> Self {
        let health = Arc::new(SourceHealth::new(config.circuit.clone()));

        let mut timeouts = HashMap::new();
        timeouts.insert(
            InfoSource::InternalIndex,
            config.sources.internal_index.timeout(),
        );
        timeouts.insert(InfoSource::WebSearch, config.sources.web_search.timeout());
        // The knowledge base is in-memory; the parent deadline alone bounds it
        timeouts.insert(InfoSource::KnowledgeBase, config.routing.parent_deadline());

        let orchestrator = Orchestrator::new(
            adapters,
            Arc::clone(&health),
            timeouts,
            config.routing.parent_deadline(),
        );

        let decision_cache = DecisionCache::new(config.routing.decision_cache_ttl());
        let result_cache = ResultCache::new(
            config.routing.result_cache_ttl(),
            config.routing.result_cache_capacity,
        );

        let profiles = SourceProfile::defaults(&config.sources);

        Self {
            config,
            profiles,
            health,
            orchestrator,
            decision_cache,
            result_cache,
        }
    }

    /// Answer one query.
    ///
    /// `session_hint` is an optional short continuation marker from the
    /// conversation layer. Total failure across every selected source comes
    /// back as [`fathom_core::AppError::AllSourcesFailed`] with the full
    /// failure report.
    pub async fn answer(
        &self,
        raw_text: &str,
        session_hint: Option<&str>,
    ) -> AppResult<FusedResult> {
        // A hint changes classification, so it is part of the cache identity
        let cache_query = match session_hint {
            Some(hint) if !hint.trim().is_empty() => format!("{}\n::{}", raw_text, hint),
            _ => raw_text.to_string(),
        };

        if let Some(cached) = self.result_cache.get(&cache_query) {
            tracing::info!("Answering from result cache");
            return Ok((*cached).clone());
        }

        let ctx = classify(raw_text, session_hint);

        tracing::info!(
            intent = %ctx.intent,
            domain = %ctx.domain,
            freshness = %ctx.freshness_need,
            "Processing query"
        );

        // Evaluations are cheap pure transforms and always recomputed; only
        // the routing decision itself is reused across similar queries
        let evaluations = evaluate_sources(&ctx, &self.profiles, &self.health);

        let key = DecisionKey::from_context(&ctx);
        let decision = match self.decision_cache.get(&key) {
            Some(decision) => {
                tracing::debug!("Reusing cached routing decision");
                decision
            }
            None => {
                let decision = Arc::new(route(&ctx, &evaluations, &self.config.routing));
                self.decision_cache.put(key, Arc::clone(&decision));
                decision
            }
        };

        let gathered = self.orchestrator.gather(&decision, &ctx).await?;
        let fused = fuse(&gathered, &evaluations, &decision)?;

        // Degraded answers are not worth replaying from cache
        if !fused.partial {
            self.result_cache.put(&cache_query, fused.clone());
        }

        Ok(fused)
    }

    /// Current per-source health, for introspection.
    pub fn health_snapshot(&self) -> Vec<HealthSnapshot> {
        self.health.snapshot()
    }

    /// Result cache statistics, for introspection.
    pub fn cache_stats(&self) -> CacheStats {
        self.result_cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fathom_core::AppError;
    use fathom_sources::providers::MockAdapter;
    use fathom_sources::SourceContent;

    fn adapters_from(
        mocks: &[Arc<MockAdapter>],
    ) -> HashMap<InfoSource, Arc<dyn SourceAdapter>> {
        mocks
            .iter()
            .map(|m| (m.source(), Arc::clone(m) as Arc<dyn SourceAdapter>))
            .collect()
    }

    fn full_mock_set() -> Vec<Arc<MockAdapter>> {
        vec![
            Arc::new(MockAdapter::new(
                InfoSource::InternalIndex,
                "Your policy covers $500,000 of term life.",
                0.9,
            )),
            Arc::new(
                MockAdapter::new(InfoSource::WebSearch, "Latest market rates are 4.1%.", 0.7)
                    .with_content(
                        SourceContent::new("Latest market rates are 4.1%.", 0.7)
                            .with_retrieved_at(chrono::Utc::now()),
                    ),
            ),
            Arc::new(MockAdapter::new(
                InfoSource::KnowledgeBase,
                "Term life covers a fixed period.",
                0.6,
            )),
        ]
    }

    #[tokio::test]
    async fn test_answer_end_to_end() {
        let mocks = full_mock_set();
        let engine = QueryEngine::new(AppConfig::default(), adapters_from(&mocks));

        let fused = engine
            .answer("what is covered in my policy", None)
            .await
            .unwrap();

        assert!(!fused.content.is_empty());
        assert!(!fused.attributions.is_empty());
        assert!(fused.overall_confidence > 0.0);
        assert!(!fused.partial);
        // Company-specific factual query: the index answers
        assert!(fused
            .attributions
            .iter()
            .any(|a| a.source == InfoSource::InternalIndex));
    }

    #[tokio::test]
    async fn test_second_answer_comes_from_cache() {
        let mocks = full_mock_set();
        let engine = QueryEngine::new(AppConfig::default(), adapters_from(&mocks));

        let first = engine.answer("what is a premium", None).await.unwrap();
        let calls_after_first: u64 = mocks.iter().map(|m| m.call_count()).sum();

        let second = engine.answer("what is a premium", None).await.unwrap();
        let calls_after_second: u64 = mocks.iter().map(|m| m.call_count()).sum();

        assert_eq!(first.content, second.content);
        // No adapter ran for the cached answer
        assert_eq!(calls_after_first, calls_after_second);
        assert!(engine.cache_stats().entries >= 1);
    }

    #[tokio::test]
    async fn test_total_failure_reports_every_source() {
        let mocks = vec![
            Arc::new(MockAdapter::failing(InfoSource::InternalIndex, "down")),
            Arc::new(MockAdapter::failing(InfoSource::WebSearch, "down")),
            Arc::new(MockAdapter::failing(InfoSource::KnowledgeBase, "down")),
        ];
        let mut config = AppConfig::default();
        // Make routing select everything so every source is attempted
        config.routing.inclusion_threshold = 0.0;

        let engine = QueryEngine::new(config, adapters_from(&mocks));

        let err = engine
            .answer("compare current market rates with my policy", None)
            .await
            .unwrap_err();

        let AppError::AllSourcesFailed(report) = err else {
            panic!("expected AllSourcesFailed");
        };
        assert!(!report.attempts.is_empty());
        assert!(report
            .attempts
            .iter()
            .all(|a| a.detail.contains("down") || a.kind != fathom_core::SourceErrorKind::CallFailed));
    }

    #[tokio::test]
    async fn test_partial_answers_are_not_cached() {
        let mocks = vec![
            Arc::new(MockAdapter::new(
                InfoSource::InternalIndex,
                "index answer",
                0.9,
            )),
            Arc::new(MockAdapter::failing(InfoSource::WebSearch, "down")),
            Arc::new(MockAdapter::new(InfoSource::KnowledgeBase, "kb answer", 0.6)),
        ];
        let mut config = AppConfig::default();
        config.routing.inclusion_threshold = 0.0;

        let engine = QueryEngine::new(config, adapters_from(&mocks));

        let fused = engine.answer("what is a premium", None).await.unwrap();
        assert!(fused.partial);
        assert_eq!(engine.cache_stats().entries, 0);
    }

    #[tokio::test]
    async fn test_health_snapshot_reflects_calls() {
        let mocks = full_mock_set();
        let engine = QueryEngine::new(AppConfig::default(), adapters_from(&mocks));

        engine
            .answer("what is covered in my policy", None)
            .await
            .unwrap();

        let snapshot = engine.health_snapshot();
        let called: u64 = snapshot.iter().map(|s| s.samples).sum();
        assert!(called >= 1);
    }

    #[tokio::test]
    async fn test_decision_cache_reused_across_similar_queries() {
        let mocks = full_mock_set();
        let engine = QueryEngine::new(AppConfig::default(), adapters_from(&mocks));

        engine
            .answer("what is covered in my policy", None)
            .await
            .unwrap();
        assert_eq!(engine.decision_cache.len(), 1);

        // Same signature (intent, domain, bucket, freshness): no new entry
        engine
            .answer("what is covered in my plan policy", None)
            .await
            .unwrap();
        assert_eq!(engine.decision_cache.len(), 1);
    }
}
