//! In-memory search, directory and fetch backends for discovery tests.
//!
//! Compiled for this crate's tests and, behind the `testing` feature, for
//! downstream crates that drive a [`Discoverer`] end to end.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use leadscout_crawler::{FetchedPage, PageFetcher, compute_hash, normalize_url};
use leadscout_quota::QuotaTracker;
use leadscout_shared::{BusinessRecord, EnrichError, QuotaConfig, QuotaReset, Result};

use crate::directory::CompanyDirectory;
use crate::orchestrator::{Discoverer, DiscoveryOptions};
use crate::policy::ExclusionPolicy;
use crate::scorer::SearchHit;
use crate::search::SearchBackend;

/// Canned answer for one query.
pub enum Reply {
    Hits(Vec<SearchHit>),
    Throttle,
}

/// Answers known queries, returns no hits for the rest, and logs every call.
#[derive(Default)]
pub struct FakeSearch {
    replies: HashMap<String, Reply>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeSearch {
    pub fn reply(mut self, query: &str, reply: Reply) -> Self {
        self.replies.insert(query.to_string(), reply);
        self
    }
}

#[async_trait]
impl SearchBackend for FakeSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.calls.lock().unwrap().push(query.to_string());
        match self.replies.get(query) {
            Some(Reply::Hits(hits)) => Ok(hits.clone()),
            Some(Reply::Throttle) => Err(EnrichError::Throttled {
                query: query.to_string(),
            }),
            None => Ok(Vec::new()),
        }
    }
}

#[derive(Default)]
pub struct FakeDirectory {
    domains: HashMap<String, String>,
}

impl FakeDirectory {
    pub fn domain(mut self, name: &str, domain: &str) -> Self {
        self.domains.insert(name.to_string(), domain.to_string());
        self
    }
}

#[async_trait]
impl CompanyDirectory for FakeDirectory {
    async fn lookup_domain(&self, name: &str) -> Result<Option<String>> {
        Ok(self.domains.get(name).cloned())
    }
}

/// Serves known pages keyed by normalized URL; anything else fails.
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, String>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn page(mut self, url: &str, text: &str) -> Self {
        self.pages.insert(url.to_string(), text.to_string());
        self
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        let key = normalize_url(url);
        self.calls.lock().unwrap().push(key.clone());
        match self.pages.get(&key) {
            Some(text) => Ok(FetchedPage {
                url: url.to_string(),
                status_code: 200,
                text: text.clone(),
                links: Vec::new(),
                pages_crawled: 1,
                insecure: false,
                content_hash: compute_hash(text),
            }),
            None => Err(EnrichError::Network(format!("{url}: connection refused"))),
        }
    }
}

pub fn quota(daily_limit: u64, trip: u32) -> Arc<QuotaTracker> {
    Arc::new(QuotaTracker::new(QuotaConfig {
        daily_limit,
        throttle_trip_threshold: trip,
        reset: QuotaReset::Daily,
    }))
}

/// Default options with every delay zeroed.
pub fn options() -> DiscoveryOptions {
    DiscoveryOptions {
        search_delay: Duration::ZERO,
        throttle_backoff: Duration::ZERO,
        ..DiscoveryOptions::default()
    }
}

pub fn discoverer(fetcher: Arc<FakeFetcher>, quota: Arc<QuotaTracker>) -> Discoverer {
    Discoverer::new(fetcher, quota, ExclusionPolicy::default(), options())
}

pub fn guttering() -> BusinessRecord {
    let mut record = BusinessRecord::new(7, "5 Star Guttering");
    record.phone = Some("509-555-0147".into());
    record.city = Some("Pasco".into());
    record.state = Some("WA".into());
    record
}

pub fn guttering_hit() -> SearchHit {
    SearchHit {
        link: "https://5starguttering.com/".into(),
        title: "5 Star Guttering - Professional Gutter Services".into(),
        snippet: "Seamless gutter installation serving Pasco, Washington.".into(),
    }
}
