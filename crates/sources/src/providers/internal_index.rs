//! Internal vector index adapter.
//!
//! Fronts the company document store's search endpoint. The index server
//! owns embedding generation and similarity search; this adapter only ships
//! the query over and assembles the scored passages it gets back.

use crate::adapter::{SourceAdapter, SourceContent, SourceQuery};
use fathom_core::query::InfoSource;
use fathom_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// How many passages to request per lookup.
const DEFAULT_TOP_K: u32 = 5;

/// Index API request format.
#[derive(Debug, Serialize)]
struct IndexRequest {
    query: String,
    entities: Vec<String>,
    domain: String,
    top_k: u32,
}

/// Index API response format.
#[derive(Debug, Deserialize)]
struct IndexResponse {
    passages: Vec<IndexPassage>,
}

#[derive(Debug, Deserialize)]
struct IndexPassage {
    text: String,
    score: f32,
    #[serde(default)]
    source_path: Option<String>,
}

/// Internal index client.
pub struct InternalIndexAdapter {
    /// Base URL for the index API
    base_url: String,

    /// HTTP client
    client: reqwest::Client,

    top_k: u32,
}

impl InternalIndexAdapter {
    /// Create an adapter against a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Override how many passages are requested.
    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = top_k;
        self
    }

    fn to_index_request(&self, query: &SourceQuery) -> IndexRequest {
        IndexRequest {
            query: query.raw_text.clone(),
            entities: query.entities.clone(),
            domain: query.domain.as_str().to_string(),
            top_k: self.top_k,
        }
    }

    fn convert_response(&self, response: IndexResponse) -> SourceContent {
        // Passages arrive ranked; the top score doubles as the hint
        let confidence_hint = response
            .passages
            .first()
            .map(|p| p.score.clamp(0.0, 1.0))
            .unwrap_or(0.0);

        let text = response
            .passages
            .iter()
            .map(|p| match &p.source_path {
                Some(path) => format!("[{}]\n{}", path, p.text),
                None => p.text.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");

        SourceContent::new(text, confidence_hint).with_metadata(serde_json::json!({
            "passages": response.passages.len(),
        }))
    }
}

#[async_trait::async_trait]
impl SourceAdapter for InternalIndexAdapter {
    fn source(&self) -> InfoSource {
        InfoSource::InternalIndex
    }

    async fn fetch(&self, query: &SourceQuery) -> AppResult<SourceContent> {
        tracing::debug!(entities = query.entities.len(), "Searching internal index");

        let request = self.to_index_request(query);
        let url = format!("{}/v1/search", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Source(format!("Index request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Source(format!(
                "Index API error ({}): {}",
                status, error_text
            )));
        }

        let index_response: IndexResponse = response
            .json()
            .await
            .map_err(|e| AppError::Source(format!("Failed to parse index response: {}", e)))?;

        tracing::debug!(
            passages = index_response.passages.len(),
            "Internal index responded"
        );

        Ok(self.convert_response(index_response))
    }
}
