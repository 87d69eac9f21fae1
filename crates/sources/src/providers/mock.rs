//! Programmable adapter for tests and development.

use crate::adapter::{SourceAdapter, SourceContent, SourceQuery};
use fathom_core::query::InfoSource;
use fathom_core::{AppError, AppResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Mock adapter with a fixed response, optional delay, and optional failure.
///
/// Not semantically meaningful like the real providers, but deterministic,
/// which is what orchestrator and fusion tests need: injected latency
/// exercises timeout paths, injected failure exercises the failure taxonomy,
/// and the call counter verifies caching and circuit suppression.
pub struct MockAdapter {
    source: InfoSource,
    content: SourceContent,
    delay: Option<Duration>,
    fail_with: Option<String>,
    calls: AtomicU64,
}

impl MockAdapter {
    /// Create a mock that answers with fixed content.
    pub fn new(source: InfoSource, text: impl Into<String>, confidence_hint: f32) -> Self {
        Self {
            source,
            content: SourceContent::new(text, confidence_hint),
            delay: None,
            fail_with: None,
            calls: AtomicU64::new(0),
        }
    }

    /// Create a mock that always fails.
    pub fn failing(source: InfoSource, detail: impl Into<String>) -> Self {
        Self {
            source,
            content: SourceContent::new(String::new(), 0.0),
            delay: None,
            fail_with: Some(detail.into()),
            calls: AtomicU64::new(0),
        }
    }

    /// Sleep this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answer with this full content instead of the plain text form.
    pub fn with_content(mut self, content: SourceContent) -> Self {
        self.content = content;
        self
    }

    /// How many times `fetch` has been called.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SourceAdapter for MockAdapter {
    fn source(&self) -> InfoSource {
        self.source
    }

    async fn fetch(&self, _query: &SourceQuery) -> AppResult<SourceContent> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.fail_with {
            Some(detail) => Err(AppError::Source(detail.clone())),
            None => Ok(self.content.clone()),
        }
    }
}
