//! Error types for the Fathom query routing engine.
//!
//! This module defines a unified error enum covering all error categories in
//! the engine, plus the per-source failure taxonomy the orchestrator records
//! when individual lookups fail.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::InfoSource;

/// How a single source call failed.
///
/// Individual failures are recovered locally by the orchestrator as long as
/// at least one source succeeds; they only surface to the caller bundled in
/// a [`FailureReport`] when every source fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    /// The call did not complete within its timeout (or the parent deadline).
    Timeout,
    /// The source was not called because its circuit is open.
    Unavailable,
    /// The call was made but failed (transport or parse error).
    CallFailed,
}

impl SourceErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceErrorKind::Timeout => "timeout",
            SourceErrorKind::Unavailable => "unavailable",
            SourceErrorKind::CallFailed => "call_failed",
        }
    }
}

impl std::fmt::Display for SourceErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single failed source attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFailure {
    pub source: InfoSource,
    pub kind: SourceErrorKind,
    pub detail: String,
}

impl SourceFailure {
    pub fn new(source: InfoSource, kind: SourceErrorKind, detail: impl Into<String>) -> Self {
        Self {
            source,
            kind,
            detail: detail.into(),
        }
    }
}

/// Report produced when no source returned a usable result.
///
/// Carries every attempted source and why it failed, so the caller can
/// present a degraded but explainable answer instead of a generic error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FailureReport {
    pub attempts: Vec<SourceFailure>,
}

impl FailureReport {
    pub fn new(attempts: Vec<SourceFailure>) -> Self {
        Self { attempts }
    }

    /// True if a given source appears among the failed attempts.
    pub fn attempted(&self, source: InfoSource) -> bool {
        self.attempts.iter().any(|a| a.source == source)
    }
}

impl std::fmt::Display for FailureReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .attempts
            .iter()
            .map(|a| format!("{} ({}): {}", a.source, a.kind, a.detail))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Unified error type for the Fathom engine.
///
/// All fallible functions return `Result<T, AppError>`. We never panic —
/// errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Source adapter errors (transport, protocol, payload)
    #[error("Source error: {0}")]
    Source(String),

    /// Routing and evaluation errors
    #[error("Routing error: {0}")]
    Routing(String),

    /// Fusion errors. An empty fusion input is an orchestrator contract
    /// violation and is reported through this variant, never recovered.
    #[error("Fusion error: {0}")]
    Fusion(String),

    /// Every selected source failed; the report enumerates each attempt.
    #[error("All sources failed: {0}")]
    AllSourcesFailed(FailureReport),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_report_display_enumerates_all_attempts() {
        let report = FailureReport::new(vec![
            SourceFailure::new(
                InfoSource::InternalIndex,
                SourceErrorKind::Timeout,
                "no response within 3s",
            ),
            SourceFailure::new(
                InfoSource::WebSearch,
                SourceErrorKind::CallFailed,
                "connection refused",
            ),
            SourceFailure::new(
                InfoSource::KnowledgeBase,
                SourceErrorKind::Unavailable,
                "circuit open",
            ),
        ]);

        let text = report.to_string();
        assert!(text.contains("internal_index (timeout)"));
        assert!(text.contains("web_search (call_failed)"));
        assert!(text.contains("knowledge_base (unavailable)"));
    }

    #[test]
    fn test_failure_report_attempted() {
        let report = FailureReport::new(vec![SourceFailure::new(
            InfoSource::WebSearch,
            SourceErrorKind::Timeout,
            "slow",
        )]);

        assert!(report.attempted(InfoSource::WebSearch));
        assert!(!report.attempted(InfoSource::InternalIndex));
    }

    #[test]
    fn test_all_sources_failed_error_message() {
        let err = AppError::AllSourcesFailed(FailureReport::new(vec![SourceFailure::new(
            InfoSource::InternalIndex,
            SourceErrorKind::CallFailed,
            "500",
        )]));

        assert!(err.to_string().starts_with("All sources failed"));
    }

    #[test]
    fn test_source_failure_serialization() {
        let failure = SourceFailure::new(
            InfoSource::WebSearch,
            SourceErrorKind::Unavailable,
            "circuit open",
        );

        let json = serde_json::to_string(&failure).unwrap();
        assert!(json.contains("unavailable"));

        let back: SourceFailure = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, SourceErrorKind::Unavailable);
        assert_eq!(back.source, InfoSource::WebSearch);
    }
}
