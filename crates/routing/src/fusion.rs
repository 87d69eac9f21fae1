//! Result fusion.
//!
//! Merges the successful source results into one attributed answer,
//! following the strategy the router chose. Fusion is a pure function: the
//! same results and strategy always produce the same fused output. The
//! input set is unordered; everything here keys off source identity.

use fathom_core::query::InfoSource;
use fathom_core::{AppError, AppResult};

use crate::types::{
    FusedResult, FusionStrategy, GatheredResults, RoutingDecision, SourceAttribution,
    SourceEvaluation, SourceResult,
};

/// One result with its resolved confidence and fusion weight.
struct WeightedResult<'a> {
    result: &'a SourceResult,
    confidence: f32,
    weight: f32,
}

/// Per-source confidence used for weighting: the evaluator's prior blended
/// with the live hint the source returned alongside its content.
fn source_confidence(result: &SourceResult, evaluations: &[SourceEvaluation]) -> f32 {
    let hint = result.payload.confidence_hint;
    match evaluations.iter().find(|e| e.source == result.source) {
        Some(eval) => 0.5 * eval.confidence + 0.5 * hint,
        None => hint,
    }
}

fn authority_of(source: InfoSource, evaluations: &[SourceEvaluation]) -> f32 {
    evaluations
        .iter()
        .find(|e| e.source == source)
        .map(|e| e.authority)
        .unwrap_or(0.5)
}

/// Paragraphs of `text` not already present in `existing`.
fn novel_paragraphs(existing: &str, text: &str) -> String {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty() && !existing.contains(p))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Descending float order with a fixed source tiebreak, so equal weights
/// still assemble deterministically.
fn by_descending(
    a: f32,
    b: f32,
    a_source: InfoSource,
    b_source: InfoSource,
) -> std::cmp::Ordering {
    b.partial_cmp(&a)
        .unwrap_or(std::cmp::Ordering::Equal)
        .then_with(|| a_source.cmp(&b_source))
}

/// Assign fusion weights, normalized to sum 1.0.
fn assign_weights(
    strategy: FusionStrategy,
    entries: &mut [WeightedResult<'_>],
    evaluations: &[SourceEvaluation],
) {
    match strategy {
        FusionStrategy::Balanced => {
            let share = 1.0 / entries.len() as f32;
            for entry in entries.iter_mut() {
                entry.weight = share;
            }
        }
        FusionStrategy::ConfidenceWeighted => {
            let total: f32 = entries.iter().map(|e| e.confidence).sum();
            if total <= f32::EPSILON {
                let share = 1.0 / entries.len() as f32;
                for entry in entries.iter_mut() {
                    entry.weight = share;
                }
            } else {
                for entry in entries.iter_mut() {
                    entry.weight = entry.confidence / total;
                }
            }
        }
        FusionStrategy::TemporalPriority => {
            // Freshest dominates; the rest split the remainder evenly
            let freshest = entries
                .iter()
                .enumerate()
                .max_by_key(|(_, e)| e.result.payload.retrieved_at)
                .map(|(i, _)| i);

            let others = entries.len().saturating_sub(1);
            for (i, entry) in entries.iter_mut().enumerate() {
                entry.weight = if Some(i) == freshest {
                    0.7
                } else {
                    0.3 / others as f32
                };
            }
            if entries.len() == 1 {
                entries[0].weight = 1.0;
            }
        }
        FusionStrategy::AuthorityRanked => {
            let total: f32 = entries
                .iter()
                .map(|e| authority_of(e.result.source, evaluations))
                .sum();
            let count = entries.len() as f32;
            for entry in entries.iter_mut() {
                let authority = authority_of(entry.result.source, evaluations);
                entry.weight = if total <= f32::EPSILON {
                    1.0 / count
                } else {
                    authority / total
                };
            }
        }
    }
}

/// Order entries for content assembly. Attribution order is always weight
/// descending; content order depends on the strategy.
fn order_for_content(
    strategy: FusionStrategy,
    entries: &mut [WeightedResult<'_>],
    evaluations: &[SourceEvaluation],
) {
    match strategy {
        FusionStrategy::TemporalPriority => {
            entries.sort_by_key(|e| std::cmp::Reverse(e.result.payload.retrieved_at));
        }
        FusionStrategy::AuthorityRanked => {
            entries.sort_by(|a, b| {
                by_descending(
                    authority_of(a.result.source, evaluations),
                    authority_of(b.result.source, evaluations),
                    a.result.source,
                    b.result.source,
                )
            });
        }
        FusionStrategy::ConfidenceWeighted | FusionStrategy::Balanced => {
            entries.sort_by(|a, b| {
                by_descending(a.weight, b.weight, a.result.source, b.result.source)
            });
        }
    }
}

/// Assemble the fused content.
///
/// For the gap-filling strategies (temporal, authority) secondary sources
/// only contribute paragraphs the answer does not already contain.
fn assemble_content(strategy: FusionStrategy, entries: &[WeightedResult<'_>]) -> String {
    let gap_fill = matches!(
        strategy,
        FusionStrategy::TemporalPriority | FusionStrategy::AuthorityRanked
    );

    let mut parts: Vec<String> = Vec::new();
    let mut assembled = String::new();

    for entry in entries {
        let text = entry.result.payload.text.trim();
        if text.is_empty() {
            continue;
        }

        let contribution = if parts.is_empty() || !gap_fill {
            text.to_string()
        } else {
            novel_paragraphs(&assembled, text)
        };

        if contribution.is_empty() {
            continue;
        }

        let label = if parts.is_empty() { "Primary" } else { "Supporting" };
        parts.push(format!(
            "**{} ({})**\n{}",
            label, entry.result.source, contribution
        ));
        assembled.push_str(&contribution);
        assembled.push('\n');
    }

    parts.join("\n\n")
}

/// Fuse the gathered results into one attributed answer.
///
/// The orchestrator guarantees at least one successful result; receiving
/// none is a contract violation and comes back as a `Fusion` error. A
/// single result is passed through untouched. `overall_confidence` never
/// exceeds the best individual source confidence.
pub fn fuse(
    gathered: &GatheredResults,
    evaluations: &[SourceEvaluation],
    decision: &RoutingDecision,
) -> AppResult<FusedResult> {
    if gathered.results.is_empty() {
        return Err(AppError::Fusion(
            "fusion requires at least one successful source result".to_string(),
        ));
    }

    let strategy = decision.fusion_strategy;

    let mut entries: Vec<WeightedResult<'_>> = gathered
        .results
        .iter()
        .map(|result| WeightedResult {
            result,
            confidence: source_confidence(result, evaluations),
            weight: 0.0,
        })
        .collect();

    // Single source: trivial passthrough, no merge needed
    if entries.len() == 1 {
        let entry = &entries[0];
        let confidence = entry.confidence;
        let overall = (confidence * decision.decision_confidence)
            .min(confidence)
            .clamp(0.0, 1.0);

        return Ok(FusedResult {
            content: entry.result.payload.text.clone(),
            attributions: vec![SourceAttribution {
                source: entry.result.source,
                weight: 1.0,
                confidence,
            }],
            overall_confidence: overall,
            partial: gathered.partial,
        });
    }

    assign_weights(strategy, &mut entries, evaluations);
    order_for_content(strategy, &mut entries, evaluations);

    let content = assemble_content(strategy, &entries);

    let max_confidence = entries
        .iter()
        .map(|e| e.confidence)
        .fold(0.0f32, f32::max);
    let blended: f32 = entries.iter().map(|e| e.weight * e.confidence).sum();
    let overall_confidence = (blended * decision.decision_confidence)
        .min(max_confidence)
        .clamp(0.0, 1.0);

    // Every contributing source stays attributed, however small its weight
    let mut attributions: Vec<SourceAttribution> = entries
        .iter()
        .map(|e| SourceAttribution {
            source: e.result.source,
            weight: e.weight,
            confidence: e.confidence,
        })
        .collect();
    attributions.sort_by(|a, b| by_descending(a.weight, b.weight, a.source, b.source));

    tracing::debug!(
        strategy = %strategy,
        sources = attributions.len(),
        confidence = overall_confidence,
        "Fused results"
    );

    Ok(FusedResult {
        content,
        attributions,
        overall_confidence,
        partial: gathered.partial,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AxisWeights;
    use chrono::{Duration as ChronoDuration, Utc};
    use fathom_sources::SourceContent;
    use std::time::Duration;

    fn result(source: InfoSource, text: &str, hint: f32) -> SourceResult {
        SourceResult {
            source,
            payload: SourceContent::new(text, hint),
            latency: Duration::from_millis(50),
        }
    }

    fn evaluations() -> Vec<SourceEvaluation> {
        vec![
            SourceEvaluation {
                source: InfoSource::InternalIndex,
                coverage: 0.9,
                confidence: 0.9,
                freshness: 0.5,
                authority: 0.95,
                cost: 0.6,
            },
            SourceEvaluation {
                source: InfoSource::WebSearch,
                coverage: 0.8,
                confidence: 0.6,
                freshness: 0.95,
                authority: 0.70,
                cost: 0.35,
            },
            SourceEvaluation {
                source: InfoSource::KnowledgeBase,
                coverage: 0.6,
                confidence: 0.5,
                freshness: 0.05,
                authority: 0.80,
                cost: 0.9,
            },
        ]
    }

    fn decision(strategy: FusionStrategy) -> RoutingDecision {
        RoutingDecision {
            selected_sources: InfoSource::ALL.to_vec(),
            fusion_strategy: strategy,
            decision_confidence: 0.85,
            weights_used: AxisWeights::base(),
        }
    }

    fn gathered(results: Vec<SourceResult>, partial: bool) -> GatheredResults {
        GatheredResults {
            results,
            failures: vec![],
            partial,
        }
    }

    #[test]
    fn test_empty_input_is_a_defect() {
        let err = fuse(
            &gathered(vec![], false),
            &evaluations(),
            &decision(FusionStrategy::Balanced),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Fusion(_)));
    }

    #[test]
    fn test_single_source_passthrough() {
        let fused = fuse(
            &gathered(vec![result(InfoSource::InternalIndex, "the answer", 0.9)], false),
            &evaluations(),
            &decision(FusionStrategy::Balanced),
        )
        .unwrap();

        // Passthrough keeps the payload untouched, no section labels
        assert_eq!(fused.content, "the answer");
        assert_eq!(fused.attributions.len(), 1);
        assert_eq!(fused.attributions[0].weight, 1.0);
    }

    #[test]
    fn test_confidence_weighted_orders_by_confidence() {
        let fused = fuse(
            &gathered(
                vec![
                    result(InfoSource::WebSearch, "web text", 0.6),
                    result(InfoSource::InternalIndex, "index text", 0.9),
                ],
                false,
            ),
            &evaluations(),
            &decision(FusionStrategy::ConfidenceWeighted),
        )
        .unwrap();

        let total: f32 = fused.attributions.iter().map(|a| a.weight).sum();
        assert!((total - 1.0).abs() < 1e-6);

        assert_eq!(fused.attributions[0].source, InfoSource::InternalIndex);
        assert!(fused.attributions[0].weight > fused.attributions[1].weight);
        assert!(fused.content.starts_with("**Primary (internal_index)**"));
        assert!(fused.content.contains("**Supporting (web_search)**"));
    }

    #[test]
    fn test_temporal_priority_puts_freshest_first() {
        let now = Utc::now();
        let fresh = SourceResult {
            source: InfoSource::WebSearch,
            payload: SourceContent::new("fresh news", 0.7).with_retrieved_at(now),
            latency: Duration::from_millis(80),
        };
        let stale = SourceResult {
            source: InfoSource::InternalIndex,
            payload: SourceContent::new("older filing", 0.9)
                .with_retrieved_at(now - ChronoDuration::days(30)),
            latency: Duration::from_millis(60),
        };

        let fused = fuse(
            &gathered(vec![stale, fresh], false),
            &evaluations(),
            &decision(FusionStrategy::TemporalPriority),
        )
        .unwrap();

        assert!(fused.content.starts_with("**Primary (web_search)**"));
        let web = fused
            .attributions
            .iter()
            .find(|a| a.source == InfoSource::WebSearch)
            .unwrap();
        assert!((web.weight - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_authority_ranked_dedupes_overlap() {
        let fused = fuse(
            &gathered(
                vec![
                    result(InfoSource::WebSearch, "Shared paragraph.\n\nWeb-only detail.", 0.7),
                    result(InfoSource::InternalIndex, "Shared paragraph.", 0.9),
                ],
                false,
            ),
            &evaluations(),
            &decision(FusionStrategy::AuthorityRanked),
        )
        .unwrap();

        // Higher authority leads; the duplicated paragraph appears once
        assert!(fused.content.starts_with("**Primary (internal_index)**"));
        assert_eq!(fused.content.matches("Shared paragraph.").count(), 1);
        assert!(fused.content.contains("Web-only detail."));
    }

    #[test]
    fn test_fusion_is_deterministic() {
        let make = || {
            fuse(
                &gathered(
                    vec![
                        result(InfoSource::WebSearch, "web", 0.6),
                        result(InfoSource::KnowledgeBase, "kb", 0.5),
                        result(InfoSource::InternalIndex, "index", 0.9),
                    ],
                    false,
                ),
                &evaluations(),
                &decision(FusionStrategy::ConfidenceWeighted),
            )
            .unwrap()
        };

        let a = make();
        let b = make();
        assert_eq!(a.content, b.content);
        assert_eq!(a.overall_confidence, b.overall_confidence);
    }

    #[test]
    fn test_overall_confidence_never_exceeds_best_source() {
        for strategy in [
            FusionStrategy::ConfidenceWeighted,
            FusionStrategy::TemporalPriority,
            FusionStrategy::AuthorityRanked,
            FusionStrategy::Balanced,
        ] {
            let fused = fuse(
                &gathered(
                    vec![
                        result(InfoSource::WebSearch, "web", 0.6),
                        result(InfoSource::InternalIndex, "index", 0.9),
                        result(InfoSource::KnowledgeBase, "kb", 0.4),
                    ],
                    false,
                ),
                &evaluations(),
                &decision(strategy),
            )
            .unwrap();

            let max_individual = fused
                .attributions
                .iter()
                .map(|a| a.confidence)
                .fold(0.0f32, f32::max);
            assert!(
                fused.overall_confidence <= max_individual + 1e-6,
                "{strategy}: {} > {}",
                fused.overall_confidence,
                max_individual
            );
        }
    }

    #[test]
    fn test_every_source_stays_attributed() {
        let fused = fuse(
            &gathered(
                vec![
                    result(InfoSource::InternalIndex, "index", 0.95),
                    result(InfoSource::KnowledgeBase, "kb", 0.01),
                ],
                false,
            ),
            &evaluations(),
            &decision(FusionStrategy::ConfidenceWeighted),
        )
        .unwrap();

        assert_eq!(fused.attributions.len(), 2);
        assert!(fused
            .attributions
            .iter()
            .any(|a| a.source == InfoSource::KnowledgeBase));
    }

    #[test]
    fn test_partial_flag_propagates() {
        let fused = fuse(
            &gathered(
                vec![
                    result(InfoSource::InternalIndex, "index", 0.9),
                    result(InfoSource::KnowledgeBase, "kb", 0.5),
                ],
                true,
            ),
            &evaluations(),
            &decision(FusionStrategy::Balanced),
        )
        .unwrap();

        assert!(fused.partial);
    }

    #[test]
    fn test_balanced_splits_evenly() {
        let fused = fuse(
            &gathered(
                vec![
                    result(InfoSource::InternalIndex, "index", 0.9),
                    result(InfoSource::WebSearch, "web", 0.2),
                ],
                false,
            ),
            &evaluations(),
            &decision(FusionStrategy::Balanced),
        )
        .unwrap();

        for attribution in &fused.attributions {
            assert!((attribution.weight - 0.5).abs() < 1e-6);
        }
    }
}
