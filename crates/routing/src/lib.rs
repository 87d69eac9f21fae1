//! Query routing and source fusion for the Fathom engine.
//!
//! The pipeline runs leaf-first: classify the query, score every source
//! against it, route to a subset, fan the selected lookups out
//! concurrently, and fuse the survivors into one attributed answer.
//!
//! Everything here is a pure transformation over explicit data except the
//! orchestrator (the only component that suspends) and the two caches.

pub mod cache;
pub mod classify;
pub mod engine;
pub mod evaluate;
pub mod fusion;
pub mod orchestrate;
pub mod router;
pub mod types;

// Re-export main types
pub use classify::classify;
pub use engine::QueryEngine;
pub use evaluate::{evaluate_sources, SourceProfile};
pub use fusion::fuse;
pub use router::route;
pub use types::{
    AxisWeights, FusedResult, FusionStrategy, GatheredResults, RoutingDecision, SourceAttribution,
    SourceEvaluation, SourceResult,
};
