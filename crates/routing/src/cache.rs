//! Decision and result caching.
//!
//! Two read/write-shared caches sit across concurrent queries. Entries are
//! immutable once written and replaced wholesale on expiry, so readers
//! never observe a partial update.
//!
//! Routing decisions are keyed by a coarse signature (intent, domain,
//! complexity bucket, freshness need), not literal query text, so
//! semantically similar queries reuse decisions. Fused results are keyed by
//! a digest of the normalized query text.

use fathom_core::query::{FreshnessNeed, QueryContext, QueryDomain, QueryIntent};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::types::{FusedResult, RoutingDecision};

/// Coarse key used to cache routing decisions across similar queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecisionKey {
    intent: QueryIntent,
    domain: QueryDomain,
    complexity_bucket: u8,
    freshness_need: FreshnessNeed,
}

impl DecisionKey {
    /// Build the signature for a classified query. Complexity is bucketed
    /// into quartiles so near-identical scores share a decision.
    pub fn from_context(ctx: &QueryContext) -> Self {
        let complexity_bucket = (ctx.complexity.clamp(0.0, 1.0) * 4.0).min(3.0) as u8;
        Self {
            intent: ctx.intent,
            domain: ctx.domain,
            complexity_bucket,
            freshness_need: ctx.freshness_need,
        }
    }
}

struct CachedDecision {
    decision: Arc<RoutingDecision>,
    inserted_at: Instant,
}

/// TTL cache for routing decisions.
pub struct DecisionCache {
    ttl: Duration,
    entries: RwLock<HashMap<DecisionKey, CachedDecision>>,
}

impl DecisionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a live decision for a signature.
    pub fn get(&self, key: &DecisionKey) -> Option<Arc<RoutingDecision>> {
        let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
        let cached = entries.get(key)?;

        if cached.inserted_at.elapsed() >= self.ttl {
            return None;
        }

        Some(Arc::clone(&cached.decision))
    }

    /// Insert a decision, evicting any expired entries on the way.
    pub fn put(&self, key: DecisionKey, decision: Arc<RoutingDecision>) {
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
        entries.retain(|_, cached| cached.inserted_at.elapsed() < self.ttl);
        entries.insert(
            key,
            CachedDecision {
                decision,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct CachedResult {
    result: Arc<FusedResult>,
    inserted_at: Instant,
}

/// Cache statistics for introspection.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub valid: usize,
    pub expired: usize,
    pub capacity: usize,
    pub ttl_secs: u64,
}

/// TTL + capacity cache for fused results, keyed by normalized query text.
pub struct ResultCache {
    ttl: Duration,
    capacity: usize,
    entries: RwLock<HashMap<String, CachedResult>>,
}

impl ResultCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Signature of a query: digest of the lowercased, whitespace-collapsed
    /// text, so trivial formatting differences still hit.
    fn cache_key(query: &str) -> String {
        let normalized = query
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        let digest = Sha256::digest(normalized.as_bytes());
        format!("{:x}", digest)
    }

    /// Look up a live result for a query.
    pub fn get(&self, query: &str) -> Option<Arc<FusedResult>> {
        let key = Self::cache_key(query);
        let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
        let cached = entries.get(&key)?;

        if cached.inserted_at.elapsed() >= self.ttl {
            tracing::debug!("Result cache entry expired");
            return None;
        }

        tracing::debug!("Result cache hit");
        Some(Arc::clone(&cached.result))
    }

    /// Cache a fused result. Empty answers are not worth keeping.
    pub fn put(&self, query: &str, result: FusedResult) {
        if result.content.trim().is_empty() {
            return;
        }

        let key = Self::cache_key(query);
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());

        entries.retain(|_, cached| cached.inserted_at.elapsed() < self.ttl);

        // At capacity, the oldest entry makes room
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, cached)| cached.inserted_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest);
                tracing::debug!("Result cache eviction");
            }
        }

        entries.insert(
            key,
            CachedResult {
                result: Arc::new(result),
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
        let valid = entries
            .values()
            .filter(|cached| cached.inserted_at.elapsed() < self.ttl)
            .count();

        CacheStats {
            entries: entries.len(),
            valid,
            expired: entries.len() - valid,
            capacity: self.capacity,
            ttl_secs: self.ttl.as_secs(),
        }
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AxisWeights, FusionStrategy};
    use fathom_core::query::InfoSource;
    use std::collections::BTreeSet;

    fn context(complexity: f32) -> QueryContext {
        QueryContext {
            raw_text: "test".to_string(),
            intent: QueryIntent::FactualLookup,
            intent_confidence: 0.8,
            entities: BTreeSet::new(),
            domain: QueryDomain::General,
            freshness_need: FreshnessNeed::Static,
            complexity,
        }
    }

    fn decision() -> Arc<RoutingDecision> {
        Arc::new(RoutingDecision {
            selected_sources: vec![InfoSource::InternalIndex],
            fusion_strategy: FusionStrategy::Balanced,
            decision_confidence: 0.8,
            weights_used: AxisWeights::base(),
        })
    }

    fn fused(content: &str) -> FusedResult {
        FusedResult {
            content: content.to_string(),
            attributions: vec![],
            overall_confidence: 0.7,
            partial: false,
        }
    }

    #[test]
    fn test_decision_key_buckets_complexity() {
        let low_a = DecisionKey::from_context(&context(0.05));
        let low_b = DecisionKey::from_context(&context(0.20));
        let high = DecisionKey::from_context(&context(0.90));

        assert_eq!(low_a, low_b);
        assert_ne!(low_a, high);
    }

    #[test]
    fn test_decision_key_max_complexity_stays_in_top_bucket() {
        let key = DecisionKey::from_context(&context(1.0));
        assert_eq!(key.complexity_bucket, 3);
    }

    #[test]
    fn test_decision_cache_roundtrip() {
        let cache = DecisionCache::new(Duration::from_secs(60));
        let key = DecisionKey::from_context(&context(0.3));

        assert!(cache.get(&key).is_none());
        cache.put(key, decision());

        let hit = cache.get(&key).expect("expected cache hit");
        assert_eq!(hit.selected_sources, vec![InfoSource::InternalIndex]);
    }

    #[test]
    fn test_decision_cache_expires() {
        let cache = DecisionCache::new(Duration::from_secs(0));
        let key = DecisionKey::from_context(&context(0.3));

        cache.put(key, decision());
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn test_result_cache_normalizes_queries() {
        let cache = ResultCache::new(Duration::from_secs(60), 10);
        cache.put("What is   a Premium?", fused("answer"));

        let hit = cache.get("what is a premium?").expect("expected hit");
        assert_eq!(hit.content, "answer");
    }

    #[test]
    fn test_result_cache_skips_empty_content() {
        let cache = ResultCache::new(Duration::from_secs(60), 10);
        cache.put("query", fused("   "));
        assert!(cache.get("query").is_none());
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_result_cache_evicts_oldest_at_capacity() {
        let cache = ResultCache::new(Duration::from_secs(60), 2);

        cache.put("first", fused("a"));
        cache.put("second", fused("b"));
        cache.put("third", fused("c"));

        let stats = cache.stats();
        assert_eq!(stats.entries, 2);
        // The oldest entry is gone, the two newest remain
        assert!(cache.get("first").is_none());
        assert!(cache.get("second").is_some());
        assert!(cache.get("third").is_some());
    }

    #[test]
    fn test_result_cache_expiry() {
        let cache = ResultCache::new(Duration::from_secs(0), 10);
        cache.put("query", fused("answer"));
        assert!(cache.get("query").is_none());
    }

    #[test]
    fn test_stats_shape() {
        let cache = ResultCache::new(Duration::from_secs(60), 5);
        cache.put("q1", fused("a"));
        cache.put("q2", fused("b"));

        let stats = cache.stats();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.valid, 2);
        assert_eq!(stats.expired, 0);
        assert_eq!(stats.capacity, 5);
        assert_eq!(stats.ttl_secs, 60);
    }

    #[test]
    fn test_clear() {
        let cache = ResultCache::new(Duration::from_secs(60), 5);
        cache.put("q1", fused("a"));
        cache.clear();
        assert_eq!(cache.stats().entries, 0);
    }
}
