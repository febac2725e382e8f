//! Company-name → domain lookup (Clearbit autocomplete).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use leadscout_shared::{DirectoryConfig, EnrichError, Result};

use crate::{MAX_REDIRECTS, USER_AGENT};

/// A company directory mapping a business name to its domain.
#[async_trait]
pub trait CompanyDirectory: Send + Sync {
    /// First domain suggested for `name`, if any.
    async fn lookup_domain(&self, name: &str) -> Result<Option<String>>;
}

#[derive(Debug, Deserialize)]
struct Suggestion {
    #[serde(default)]
    domain: Option<String>,
}

/// Client for the company-suggestion endpoint (no key required).
pub struct ClearbitDirectory {
    client: Client,
    endpoint: String,
}

impl ClearbitDirectory {
    pub fn new(config: &DirectoryConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EnrichError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl CompanyDirectory for ClearbitDirectory {
    #[instrument(skip_all, fields(name = %name))]
    async fn lookup_domain(&self, name: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("query", name)])
            .send()
            .await
            .map_err(|e| EnrichError::Network(format!("directory request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichError::Network(format!("directory endpoint: HTTP {status}")));
        }

        let suggestions: Vec<Suggestion> = response
            .json()
            .await
            .map_err(|e| EnrichError::parse(format!("directory response: {e}")))?;

        let domain = suggestions
            .into_iter()
            .filter_map(|s| s.domain)
            .map(|d| d.trim().to_lowercase())
            .find(|d| !d.is_empty());

        debug!(?domain, "directory lookup done");
        Ok(domain)
    }
}
