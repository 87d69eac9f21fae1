//! Per-source load and circuit-breaker tracking.
//!
//! One record per source, created at process start, updated after every
//! call, never deleted. Each record sits behind its own mutex so concurrent
//! queries update it read-modify-write without losing samples. Circuit
//! transitions are logged, never thrown; they steer the router's next
//! decision through the cost axis.

use fathom_core::config::CircuitConfig;
use fathom_core::query::InfoSource;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Smoothing factor for the rolling error-rate and latency averages.
const EWMA_ALPHA: f32 = 0.3;

/// Per-source health flag preventing calls to a persistently failing source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Healthy; calls flow normally.
    Closed,
    /// Failing; calls are suppressed until the cooldown elapses.
    Open,
    /// Cooldown elapsed; a single probe call decides open vs. closed.
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct HealthRecord {
    error_rate: f32,
    latency_ms: f32,
    samples: u64,
    circuit: CircuitState,
    changed_at: Instant,
}

impl HealthRecord {
    fn new() -> Self {
        Self {
            error_rate: 0.0,
            latency_ms: 0.0,
            samples: 0,
            circuit: CircuitState::Closed,
            changed_at: Instant::now(),
        }
    }

    fn observe(&mut self, failed: bool, latency: Duration) {
        let outcome = if failed { 1.0 } else { 0.0 };
        let latency_ms = latency.as_secs_f32() * 1_000.0;

        if self.samples == 0 {
            self.error_rate = outcome;
            self.latency_ms = latency_ms;
        } else {
            self.error_rate = EWMA_ALPHA * outcome + (1.0 - EWMA_ALPHA) * self.error_rate;
            self.latency_ms = EWMA_ALPHA * latency_ms + (1.0 - EWMA_ALPHA) * self.latency_ms;
        }
        self.samples += 1;
    }

    fn transition(&mut self, next: CircuitState) {
        self.circuit = next;
        self.changed_at = Instant::now();
    }
}

/// Point-in-time view of one source's health, for introspection.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub source: InfoSource,
    pub circuit: CircuitState,
    pub error_rate: f32,
    pub mean_latency_ms: f32,
    pub samples: u64,
}

/// Process-wide health tracker, one record per source.
///
/// Shared via `Arc` between the evaluator (reads) and the orchestrator
/// (writes after every call).
pub struct SourceHealth {
    config: CircuitConfig,
    records: HashMap<InfoSource, Mutex<HealthRecord>>,
}

impl SourceHealth {
    /// Create a tracker with every circuit closed.
    pub fn new(config: CircuitConfig) -> Self {
        let records = InfoSource::ALL
            .iter()
            .map(|&source| (source, Mutex::new(HealthRecord::new())))
            .collect();

        Self { config, records }
    }

    fn with_record<T>(&self, source: InfoSource, f: impl FnOnce(&mut HealthRecord) -> T) -> T {
        // Records exist for every source from construction onward.
        let record = self
            .records
            .get(&source)
            .expect("health record missing for source");
        let mut guard = record.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    /// Record a successful call. A success during a half-open probe closes
    /// the circuit again.
    pub fn record_success(&self, source: InfoSource, latency: Duration) {
        self.with_record(source, |record| {
            record.observe(false, latency);

            if record.circuit != CircuitState::Closed {
                tracing::info!(
                    source = %source,
                    from = %record.circuit,
                    "Circuit closed after successful probe"
                );
                record.transition(CircuitState::Closed);
                // Forget the failure streak that opened the circuit
                record.error_rate = 0.0;
            }
        });
    }

    /// Record a failed call. Enough failures open a closed circuit; any
    /// failure during a half-open probe re-opens it immediately.
    pub fn record_failure(&self, source: InfoSource, latency: Duration) {
        let (threshold, min_samples) = (self.config.error_rate_threshold, self.config.min_samples);

        self.with_record(source, |record| {
            record.observe(true, latency);

            match record.circuit {
                CircuitState::HalfOpen => {
                    tracing::warn!(source = %source, "Probe failed, circuit re-opened");
                    record.transition(CircuitState::Open);
                }
                CircuitState::Closed
                    if record.samples >= min_samples && record.error_rate >= threshold =>
                {
                    tracing::warn!(
                        source = %source,
                        error_rate = record.error_rate,
                        "Error rate over threshold, circuit opened"
                    );
                    record.transition(CircuitState::Open);
                }
                _ => {}
            }
        });
    }

    /// Current circuit state for a source.
    ///
    /// An open circuit whose cooldown has elapsed moves to half-open here,
    /// so the next caller gets to run the probe.
    pub fn circuit_state(&self, source: InfoSource) -> CircuitState {
        let cooldown = self.config.cooldown();

        self.with_record(source, |record| {
            if record.circuit == CircuitState::Open && record.changed_at.elapsed() >= cooldown {
                tracing::info!(source = %source, "Cooldown elapsed, circuit half-open");
                record.transition(CircuitState::HalfOpen);
            }
            record.circuit
        })
    }

    /// Rolling error rate for a source, in `[0, 1]`.
    pub fn error_rate(&self, source: InfoSource) -> f32 {
        self.with_record(source, |record| record.error_rate)
    }

    /// Snapshot of every source, in the fixed source order.
    pub fn snapshot(&self) -> Vec<HealthSnapshot> {
        InfoSource::ALL
            .iter()
            .map(|&source| {
                self.with_record(source, |record| HealthSnapshot {
                    source,
                    circuit: record.circuit,
                    error_rate: record.error_rate,
                    mean_latency_ms: record.latency_ms,
                    samples: record.samples,
                })
            })
            .collect()
    }
}
