//! Web search adapter.
//!
//! Fronts the live search provider. Result reliability is weighted by a
//! curated trusted-domain table and decays with article age; both feed the
//! confidence hint so downstream fusion can rank live content honestly.

use crate::adapter::{SourceAdapter, SourceContent, SourceQuery};
use chrono::{DateTime, Utc};
use fathom_core::query::InfoSource;
use fathom_core::{AppError, AppResult};
use serde::Deserialize;

/// How many results to request per search.
const DEFAULT_LIMIT: u32 = 8;

/// Reliability assigned to domains not in the trusted table.
const UNKNOWN_DOMAIN_RELIABILITY: f32 = 0.45;

/// Recency score when a result carries no publication date.
const UNKNOWN_RECENCY: f32 = 0.5;

/// Curated reliability weights for well-known publishers.
const TRUSTED_DOMAINS: &[(&str, f32)] = &[
    ("sec.gov", 0.98),
    ("irs.gov", 0.98),
    ("investopedia.com", 0.95),
    ("iii.org", 0.95),
    ("naic.org", 0.93),
    ("reuters.com", 0.92),
    ("bankrate.com", 0.90),
    ("wsj.com", 0.90),
    ("nerdwallet.com", 0.90),
    ("actuary.org", 0.90),
    ("bloomberg.com", 0.88),
    ("consumerreports.org", 0.88),
    ("forbes.com", 0.85),
    ("fool.com", 0.85),
];

/// Search API response format.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    title: String,
    url: String,
    snippet: String,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
}

/// Web search client.
pub struct WebSearchAdapter {
    /// Base URL for the search API
    base_url: String,

    /// HTTP client
    client: reqwest::Client,

    limit: u32,
}

impl WebSearchAdapter {
    /// Create an adapter against a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
            limit: DEFAULT_LIMIT,
        }
    }

    /// Override how many results are requested.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    fn convert_response(&self, response: SearchResponse, now: DateTime<Utc>) -> SourceContent {
        if response.results.is_empty() {
            return SourceContent::new(String::new(), 0.0);
        }

        // Score each result, then order by that score before assembling
        let mut scored: Vec<(f32, &SearchItem)> = response
            .results
            .iter()
            .map(|item| {
                let reliability = domain_reliability(&item.url);
                let recency = recency_score(item.published_at, now);
                (0.6 * reliability + 0.4 * recency, item)
            })
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let text = scored
            .iter()
            .map(|(_, item)| {
                format!(
                    "### {} ({})\n{}",
                    item.title,
                    domain_of(&item.url),
                    item.snippet
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        // The best result drives the hint; a weak tail should not drag a
        // strong top hit down
        let confidence_hint = scored.first().map(|(score, _)| *score).unwrap_or(0.0);

        let freshest = response
            .results
            .iter()
            .filter_map(|item| item.published_at)
            .max()
            .unwrap_or(now);

        SourceContent::new(text, confidence_hint)
            .with_retrieved_at(freshest)
            .with_metadata(serde_json::json!({
                "results": response.results.len(),
            }))
    }
}

/// Reliability weight for a result URL, from the trusted-domain table.
fn domain_reliability(url: &str) -> f32 {
    let host = domain_of(url);

    TRUSTED_DOMAINS
        .iter()
        .find(|(domain, _)| host == *domain || host.ends_with(&format!(".{}", domain)))
        .map(|(_, weight)| *weight)
        .unwrap_or(UNKNOWN_DOMAIN_RELIABILITY)
}

/// Hostname portion of a URL, without scheme, port, or path.
fn domain_of(url: &str) -> &str {
    let after_scheme = url.split("://").nth(1).unwrap_or(url);
    let host = after_scheme.split('/').next().unwrap_or(after_scheme);
    let host = host.split(':').next().unwrap_or(host);
    host.strip_prefix("www.").unwrap_or(host)
}

/// Recency score in `[0, 1]`, decaying with article age.
fn recency_score(published_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f32 {
    let Some(published_at) = published_at else {
        return UNKNOWN_RECENCY;
    };

    let age_days = (now - published_at).num_days();
    match age_days {
        d if d <= 1 => 1.0,
        d if d <= 7 => 0.85,
        d if d <= 30 => 0.6,
        d if d <= 365 => 0.35,
        _ => 0.15,
    }
}

#[async_trait::async_trait]
impl SourceAdapter for WebSearchAdapter {
    fn source(&self) -> InfoSource {
        InfoSource::WebSearch
    }

    async fn fetch(&self, query: &SourceQuery) -> AppResult<SourceContent> {
        tracing::debug!("Running web search");

        let url = format!("{}/search", self.base_url);
        let limit = self.limit.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[("q", query.raw_text.as_str()), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(|e| AppError::Source(format!("Search request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Source(format!(
                "Search API error ({}): {}",
                status, error_text
            )));
        }

        let search_response: SearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::Source(format!("Failed to parse search response: {}", e)))?;

        tracing::debug!(results = search_response.results.len(), "Search responded");

        Ok(self.convert_response(search_response, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn item(title: &str, url: &str, published_at: Option<DateTime<Utc>>) -> SearchItem {
        SearchItem {
            title: title.to_string(),
            url: url.to_string(),
            snippet: format!("{} snippet", title),
            published_at,
        }
    }

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("https://www.wsj.com/articles/rates"), "wsj.com");
        assert_eq!(domain_of("http://blog.example.org:8080/post"), "blog.example.org");
        assert_eq!(domain_of("investopedia.com/terms"), "investopedia.com");
    }

    #[test]
    fn test_domain_reliability_uses_trusted_table() {
        assert_eq!(domain_reliability("https://www.sec.gov/filings"), 0.98);
        // Subdomains inherit the parent's weight
        assert_eq!(domain_reliability("https://markets.reuters.com/x"), 0.92);
        assert_eq!(
            domain_reliability("https://randomblog.net/insurance"),
            UNKNOWN_DOMAIN_RELIABILITY
        );
    }

    #[test]
    fn test_recency_score_decays_with_age() {
        let now = Utc::now();

        let today = recency_score(Some(now), now);
        let last_week = recency_score(Some(now - Duration::days(5)), now);
        let last_year = recency_score(Some(now - Duration::days(300)), now);
        let ancient = recency_score(Some(now - Duration::days(2000)), now);

        assert!(today > last_week);
        assert!(last_week > last_year);
        assert!(last_year > ancient);
        assert_eq!(recency_score(None, now), UNKNOWN_RECENCY);
    }

    #[test]
    fn test_convert_response_orders_by_score() {
        let adapter = WebSearchAdapter::with_base_url("http://localhost:8080");
        let now = Utc::now();

        let response = SearchResponse {
            results: vec![
                item("Old blog take", "https://randomblog.net/a", Some(now - Duration::days(900))),
                item("Fresh WSJ piece", "https://www.wsj.com/a", Some(now)),
            ],
        };

        let content = adapter.convert_response(response, now);

        // The trusted, fresh result leads the assembled text
        let wsj_pos = content.text.find("Fresh WSJ piece").unwrap();
        let blog_pos = content.text.find("Old blog take").unwrap();
        assert!(wsj_pos < blog_pos);

        // Hint reflects the best result: 0.6 * 0.90 + 0.4 * 1.0
        assert!((content.confidence_hint - 0.94).abs() < 1e-3);
        assert_eq!(content.retrieved_at, Some(now));
    }

    #[test]
    fn test_convert_empty_response() {
        let adapter = WebSearchAdapter::with_base_url("http://localhost:8080");
        let content = adapter.convert_response(SearchResponse { results: vec![] }, Utc::now());

        assert!(content.is_empty());
        assert_eq!(content.confidence_hint, 0.0);
        assert_eq!(content.retrieved_at, None);
    }

    #[test]
    fn test_adapter_source() {
        let adapter = WebSearchAdapter::with_base_url("http://localhost:8080");
        assert_eq!(adapter.source(), InfoSource::WebSearch);
    }
}
