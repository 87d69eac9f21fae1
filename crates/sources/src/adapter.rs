//! Source adapter abstraction and exchange types.
//!
//! Every information provider sits behind [`SourceAdapter`]; the orchestrator
//! only ever sees this trait.

use chrono::{DateTime, Utc};
use fathom_core::query::{InfoSource, QueryContext, QueryDomain, QueryIntent};
use fathom_core::AppResult;
use serde::{Deserialize, Serialize};

/// The slice of a [`QueryContext`] that adapters need to do their work.
///
/// Adapters never see routing internals (scores, weights, decisions); they
/// get the query text and its classified shape, nothing more.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceQuery {
    /// The query exactly as the caller provided it.
    pub raw_text: String,

    /// Extracted named concepts, used by the internal index.
    pub entities: Vec<String>,

    /// Classified intent, used by the knowledge base key.
    pub intent: QueryIntent,

    /// Classified domain, used by the internal index and knowledge base.
    pub domain: QueryDomain,
}

impl SourceQuery {
    /// Project a full query context down to the adapter-facing shape.
    pub fn from_context(ctx: &QueryContext) -> Self {
        Self {
            raw_text: ctx.raw_text.clone(),
            entities: ctx.entities.iter().cloned().collect(),
            intent: ctx.intent,
            domain: ctx.domain,
        }
    }
}

/// Opaque content returned by a source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceContent {
    /// The retrieved text, already assembled for downstream consumption.
    pub text: String,

    /// The source's own estimate of how well this content matches the
    /// query, in `[0, 1]`.
    pub confidence_hint: f32,

    /// Recency stamp of the freshest material in `text`, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieved_at: Option<DateTime<Utc>>,

    /// Provider-specific metadata (result counts, matched topics, ...).
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl SourceContent {
    /// Create content with required fields.
    pub fn new(text: impl Into<String>, confidence_hint: f32) -> Self {
        Self {
            text: text.into(),
            confidence_hint: confidence_hint.clamp(0.0, 1.0),
            retrieved_at: None,
            metadata: serde_json::Value::Null,
        }
    }

    /// Attach a recency stamp.
    pub fn with_retrieved_at(mut self, retrieved_at: DateTime<Utc>) -> Self {
        self.retrieved_at = Some(retrieved_at);
        self
    }

    /// Attach provider metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// True when the source answered but had nothing relevant to say.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Trait for information source adapters.
///
/// Implementations wrap one external collaborator each. They must be cheap
/// to call concurrently; all timeout and circuit handling lives in the
/// orchestrator, not here.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Which source this adapter fronts.
    fn source(&self) -> InfoSource;

    /// Run one lookup. Errors are per-call and recoverable upstream.
    async fn fetch(&self, query: &SourceQuery) -> AppResult<SourceContent>;
}
