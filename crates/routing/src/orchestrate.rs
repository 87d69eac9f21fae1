//! Concurrent source execution.
//!
//! Fan-out/fan-in lives here and nowhere else: one task per selected
//! source, started together, joined before fusion. Each call is bounded by
//! its per-source timeout and the whole gather by a single parent deadline;
//! whichever is tighter governs. Once the deadline fires, in-flight calls
//! are aborted and recorded as timeouts — a late completion must never
//! influence the result or reach a cache.

use fathom_core::error::{SourceErrorKind, SourceFailure};
use fathom_core::query::{InfoSource, QueryContext};
use fathom_core::{AppError, AppResult, FailureReport};
use fathom_sources::{CircuitState, SourceAdapter, SourceHealth, SourceQuery};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::types::{GatheredResults, RoutingDecision, SourceResult};

/// Timeout applied to a source with no configured value.
const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(5);

/// Executes routing decisions against the adapter set.
pub struct Orchestrator {
    adapters: HashMap<InfoSource, Arc<dyn SourceAdapter>>,
    health: Arc<SourceHealth>,
    timeouts: HashMap<InfoSource, Duration>,
    parent_deadline: Duration,
}

impl Orchestrator {
    pub fn new(
        adapters: HashMap<InfoSource, Arc<dyn SourceAdapter>>,
        health: Arc<SourceHealth>,
        timeouts: HashMap<InfoSource, Duration>,
        parent_deadline: Duration,
    ) -> Self {
        Self {
            adapters,
            health,
            timeouts,
            parent_deadline,
        }
    }

    fn timeout_for(&self, source: InfoSource) -> Duration {
        self.timeouts
            .get(&source)
            .copied()
            .unwrap_or(DEFAULT_SOURCE_TIMEOUT)
    }

    /// Execute one routing decision: call every selected source
    /// concurrently and gather whatever comes back in time.
    ///
    /// Sources whose circuit is open are not called at all; they get an
    /// immediate synthetic failure. Every attempt, real or synthetic,
    /// feeds the health tracker. At least one success is required; zero
    /// successes surface as [`AppError::AllSourcesFailed`].
    pub async fn gather(
        &self,
        decision: &RoutingDecision,
        ctx: &QueryContext,
    ) -> AppResult<GatheredResults> {
        if decision.selected_sources.is_empty() {
            // The router's floor-inclusion invariant makes this unreachable
            return Err(AppError::Routing(
                "routing decision selected no sources".to_string(),
            ));
        }

        let query = SourceQuery::from_context(ctx);

        let mut results: Vec<SourceResult> = Vec::new();
        let mut failures: Vec<SourceFailure> = Vec::new();
        let mut join_set: JoinSet<(InfoSource, Duration, AppResult<Option<SourceResult>>)> =
            JoinSet::new();
        let mut pending: HashSet<InfoSource> = HashSet::new();

        for &source in &decision.selected_sources {
            if self.health.circuit_state(source) == CircuitState::Open {
                tracing::warn!(source = %source, "Circuit open, suppressing call");
                failures.push(SourceFailure::new(
                    source,
                    SourceErrorKind::Unavailable,
                    "circuit open",
                ));
                continue;
            }

            let Some(adapter) = self.adapters.get(&source).map(Arc::clone) else {
                failures.push(SourceFailure::new(
                    source,
                    SourceErrorKind::Unavailable,
                    "no adapter configured",
                ));
                continue;
            };

            let timeout = self.timeout_for(source);
            let task_query = query.clone();
            pending.insert(source);

            join_set.spawn(async move {
                let started = Instant::now();
                let outcome = tokio::time::timeout(timeout, adapter.fetch(&task_query)).await;
                let latency = started.elapsed();

                match outcome {
                    Ok(Ok(payload)) => (
                        source,
                        latency,
                        Ok(Some(SourceResult {
                            source,
                            payload,
                            latency,
                        })),
                    ),
                    Ok(Err(err)) => (source, latency, Err(err)),
                    // Per-source timeout: signalled as a success-shaped None
                    // so the join loop can tell it apart from a call error
                    Err(_elapsed) => (source, latency, Ok(None)),
                }
            });
        }

        let deadline = tokio::time::sleep(self.parent_deadline);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline, if !pending.is_empty() => {
                    join_set.abort_all();
                    for source in pending.drain() {
                        tracing::warn!(source = %source, "Parent deadline elapsed, discarding call");
                        self.health.record_failure(source, self.parent_deadline);
                        failures.push(SourceFailure::new(
                            source,
                            SourceErrorKind::Timeout,
                            "parent deadline elapsed",
                        ));
                    }
                    break;
                }
                joined = join_set.join_next() => {
                    let Some(joined) = joined else {
                        break;
                    };

                    match joined {
                        Ok((source, latency, Ok(Some(result)))) => {
                            pending.remove(&source);
                            self.health.record_success(source, latency);
                            results.push(result);
                        }
                        Ok((source, latency, Ok(None))) => {
                            pending.remove(&source);
                            self.health.record_failure(source, latency);
                            failures.push(SourceFailure::new(
                                source,
                                SourceErrorKind::Timeout,
                                format!("no response within {:?}", self.timeout_for(source)),
                            ));
                        }
                        Ok((source, latency, Err(err))) => {
                            pending.remove(&source);
                            self.health.record_failure(source, latency);
                            failures.push(SourceFailure::new(
                                source,
                                SourceErrorKind::CallFailed,
                                err.to_string(),
                            ));
                        }
                        Err(join_err) if join_err.is_cancelled() => {}
                        Err(join_err) => {
                            tracing::error!(error = %join_err, "Source task panicked");
                        }
                    }
                }
            }
        }

        // A panicked task leaves its source pending; account for it so the
        // report stays complete
        for source in pending.drain() {
            failures.push(SourceFailure::new(
                source,
                SourceErrorKind::CallFailed,
                "source task aborted",
            ));
        }

        if results.is_empty() {
            let report = FailureReport::new(failures);
            tracing::error!(report = %report, "All sources failed");
            return Err(AppError::AllSourcesFailed(report));
        }

        let partial = !failures.is_empty();

        tracing::info!(
            succeeded = results.len(),
            failed = failures.len(),
            partial,
            "Gather complete"
        );

        Ok(GatheredResults {
            results,
            failures,
            partial,
        })
    }
}
