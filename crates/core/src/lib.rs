//! Fathom Core Library
//!
//! This crate provides the foundational utilities for the Fathom query
//! routing engine:
//! - Error handling (`AppError`, `AppResult`) and the source failure taxonomy
//! - Logging infrastructure
//! - Configuration management
//! - The shared query model (`QueryContext` and friends)

pub mod config;
pub mod error;
pub mod logging;
pub mod query;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult, FailureReport, SourceErrorKind, SourceFailure};
pub use query::{FreshnessNeed, InfoSource, QueryContext, QueryDomain, QueryIntent};
