//! Source adapters for the Fathom engine.
//!
//! This crate provides the boundary to the external information providers
//! through a unified trait-based interface, plus the per-source health and
//! circuit-breaker tracker the router feeds on.
//!
//! # Sources
//! - **Internal index**: vector-indexed document store, reached over HTTP
//! - **Web search**: live search provider, reached over HTTP
//! - **Knowledge base**: static in-memory corpus, no I/O
//!
//! # Example
//! ```no_run
//! use fathom_sources::{SourceAdapter, SourceQuery, providers::KnowledgeBaseAdapter};
//! use fathom_core::query::{QueryDomain, QueryIntent};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let adapter = KnowledgeBaseAdapter::new();
//! let query = SourceQuery {
//!     raw_text: "what is term life insurance".to_string(),
//!     entities: vec!["term".to_string()],
//!     intent: QueryIntent::Educational,
//!     domain: QueryDomain::General,
//! };
//! let content = adapter.fetch(&query).await?;
//! println!("{}", content.text);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod factory;
pub mod health;
pub mod providers;

// Re-export main types
pub use adapter::{SourceAdapter, SourceContent, SourceQuery};
pub use factory::build_adapters;
pub use health::{CircuitState, HealthSnapshot, SourceHealth};
