//! Adapter set construction.
//!
//! Builds the full adapter map from configuration. Endpoint resolution
//! happens here so the rest of the engine only ever handles trait objects.

use crate::adapter::SourceAdapter;
use crate::providers::{InternalIndexAdapter, KnowledgeBaseAdapter, WebSearchAdapter};
use fathom_core::config::SourcesConfig;
use fathom_core::query::InfoSource;
use std::collections::HashMap;
use std::sync::Arc;

/// Build one adapter per source from the configured endpoints.
pub fn build_adapters(config: &SourcesConfig) -> HashMap<InfoSource, Arc<dyn SourceAdapter>> {
    let mut adapters: HashMap<InfoSource, Arc<dyn SourceAdapter>> = HashMap::new();

    adapters.insert(
        InfoSource::InternalIndex,
        Arc::new(InternalIndexAdapter::with_base_url(
            config.internal_index.endpoint.as_str(),
        )),
    );

    adapters.insert(
        InfoSource::WebSearch,
        Arc::new(WebSearchAdapter::with_base_url(
            config.web_search.endpoint.as_str(),
        )),
    );

    adapters.insert(
        InfoSource::KnowledgeBase,
        Arc::new(KnowledgeBaseAdapter::new()),
    );

    adapters
}
