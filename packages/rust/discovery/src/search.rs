//! Web-search backend (Google Custom Search JSON API).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

use leadscout_shared::{EnrichError, Result, SearchConfig, SearchCredentials};

use crate::scorer::SearchHit;
use crate::{MAX_REDIRECTS, USER_AGENT};

/// A search provider returning organic results for one query.
///
/// Implementations report HTTP 429 as [`EnrichError::Throttled`] so the
/// caller can feed the quota governor.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    link: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
}

/// Custom-search client. Sends `key`, `cx`, `q` and `num`.
pub struct GoogleSearchClient {
    client: Client,
    endpoint: String,
    credentials: SearchCredentials,
    results_per_query: u32,
}

impl GoogleSearchClient {
    pub fn new(config: &SearchConfig, credentials: SearchCredentials) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EnrichError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            credentials,
            // The API rejects num outside 1..=10
            results_per_query: config.results_per_query.clamp(1, 10),
        })
    }
}

#[async_trait]
impl SearchBackend for GoogleSearchClient {
    #[instrument(skip_all, fields(query = %query))]
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let num = self.results_per_query.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.credentials.api_key.as_str()),
                ("cx", self.credentials.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| EnrichError::Network(format!("search request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(EnrichError::Throttled {
                query: query.to_string(),
            });
        }
        if !status.is_success() {
            return Err(EnrichError::Network(format!("search endpoint: HTTP {status}")));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| EnrichError::parse(format!("search response: {e}")))?;

        debug!(results = body.items.len(), "search results received");

        Ok(body
            .items
            .into_iter()
            .map(|item| SearchHit {
                link: item.link,
                title: item.title,
                snippet: item.snippet,
            })
            .collect())
    }
}
