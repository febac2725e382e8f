//! Multi-strategy website discovery.
//!
//! Strategies run in order of cost and reliability: company directory,
//! general web search, exact-name search, local-business search. The first
//! candidate that clears its strategy's threshold, passes the exclusion
//! policy and crawls to non-empty text wins.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use url::Url;

use leadscout_crawler::{PageFetcher, normalize_url};
use leadscout_quota::QuotaTracker;
use leadscout_shared::text::truncate_chars;
use leadscout_shared::{
    AppConfig, BusinessRecord, DiscoveryCandidate, EnrichError, Provenance, RecordContext, Result,
};

use crate::directory::CompanyDirectory;
use crate::policy::ExclusionPolicy;
use crate::queries::{directory_name_variants, exact_match_query, general_queries, local_pack_query};
use crate::scorer::{SearchHit, SearchTarget, score_search_result};
use crate::search::SearchBackend;

const STAGE: &str = "discovery";

/// Source confidence given to a directory-suggested domain.
pub const DIRECTORY_CONFIDENCE: f64 = 0.8;

// ---------------------------------------------------------------------------
// Options and results
// ---------------------------------------------------------------------------

/// Tunables for one [`Discoverer`].
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub max_queries: usize,
    pub search_delay: Duration,
    pub throttle_backoff: Duration,
    pub search_accept: f64,
    pub exact_match_accept: f64,
    pub local_accept: f64,
    pub directory_confidence: f64,
}

impl DiscoveryOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_queries: config.search.max_queries,
            search_delay: Duration::from_millis(config.search.delay_ms),
            throttle_backoff: Duration::from_millis(config.search.throttle_backoff_ms),
            search_accept: config.thresholds.search_accept,
            exact_match_accept: config.thresholds.exact_match_accept,
            local_accept: config.thresholds.local_accept,
            directory_confidence: DIRECTORY_CONFIDENCE,
        }
    }
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Which strategy produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    CompanyDirectory,
    WebSearch,
    KnowledgePanel,
    LocalPack,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CompanyDirectory => "company_directory",
            Self::WebSearch => "web_search",
            Self::KnowledgePanel => "knowledge_panel",
            Self::LocalPack => "local_pack",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running every strategy for one record.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOutcome {
    /// Accepted candidate with crawled content, if any.
    pub winner: Option<DiscoveryCandidate>,
    /// SHA-256 of the winner's crawled text.
    pub content_hash: Option<String>,
    /// Search queries actually sent, in order.
    pub queries_attempted: Vec<String>,
    /// Distinct URLs crawled.
    pub candidates_crawled: usize,
}

impl DiscoveryOutcome {
    /// Copy the discovery trail into a record's provenance.
    pub fn record_provenance(&self, provenance: &mut Provenance, excerpt_chars: usize) {
        provenance.record(Provenance::QUERIES_ATTEMPTED, self.queries_attempted.clone());

        let Some(winner) = &self.winner else {
            return;
        };
        provenance.record(Provenance::DISCOVERY_METHOD, winner.strategy.as_str());
        provenance.record(Provenance::DISCOVERY_SCORE, winner.confidence);
        if let Some(snippet) = &winner.snippet {
            provenance.record(Provenance::MATCHED_SNIPPET, snippet.as_str());
        }
        if let Some(content) = &winner.content {
            provenance.record(Provenance::CRAWLED_EXCERPT, truncate_chars(content, excerpt_chars));
        }
        if let Some(hash) = &self.content_hash {
            provenance.record(Provenance::CONTENT_HASH, hash.as_str());
        }
    }
}

/// Per-record bookkeeping across strategies.
#[derive(Default)]
struct Attempt {
    crawled: HashSet<String>,
    queries: Vec<String>,
}

impl Attempt {
    fn finish(self, winner: Option<(DiscoveryCandidate, String)>) -> DiscoveryOutcome {
        let (winner, content_hash) = match winner {
            Some((candidate, hash)) => (Some(candidate), Some(hash)),
            None => (None, None),
        };
        DiscoveryOutcome {
            winner,
            content_hash,
            candidates_crawled: self.crawled.len(),
            queries_attempted: self.queries,
        }
    }
}

// ---------------------------------------------------------------------------
// Discoverer
// ---------------------------------------------------------------------------

/// Finds a business's own website.
pub struct Discoverer {
    fetcher: Arc<dyn PageFetcher>,
    quota: Arc<QuotaTracker>,
    policy: ExclusionPolicy,
    options: DiscoveryOptions,
    search: Option<Arc<dyn SearchBackend>>,
    directory: Option<Arc<dyn CompanyDirectory>>,
}

impl Discoverer {
    /// A discoverer with no search backend and no directory attached.
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        quota: Arc<QuotaTracker>,
        policy: ExclusionPolicy,
        options: DiscoveryOptions,
    ) -> Self {
        Self {
            fetcher,
            quota,
            policy,
            options,
            search: None,
            directory: None,
        }
    }

    pub fn with_search(mut self, backend: Arc<dyn SearchBackend>) -> Self {
        self.search = Some(backend);
        self
    }

    pub fn with_directory(mut self, directory: Arc<dyn CompanyDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn policy(&self) -> &ExclusionPolicy {
        &self.policy
    }

    /// Run the strategies in order until one yields a crawlable site.
    ///
    /// Strategy failures are logged to `ctx` and skipped. The only error
    /// returned is [`EnrichError::QuotaExceeded`].
    pub async fn discover(
        &self,
        record: &BusinessRecord,
        ctx: &mut RecordContext,
    ) -> Result<DiscoveryOutcome> {
        let mut attempt = Attempt::default();

        if let Some(winner) = self.try_directory(record, &mut attempt, ctx).await? {
            return Ok(attempt.finish(Some(winner)));
        }

        let Some(backend) = self.search.clone() else {
            ctx.warn(STAGE, "web search unavailable, skipping search strategies");
            ctx.info(STAGE, "no website found");
            return Ok(attempt.finish(None));
        };

        let tiers = [
            (
                Strategy::WebSearch,
                general_queries(record, self.options.max_queries),
                self.options.search_accept,
            ),
            (
                Strategy::KnowledgePanel,
                exact_match_query(record).into_iter().collect(),
                self.options.exact_match_accept,
            ),
            (
                Strategy::LocalPack,
                local_pack_query(record).into_iter().collect(),
                self.options.local_accept,
            ),
        ];

        let target = SearchTarget {
            business_name: &record.business_name,
            city: record.city.as_deref(),
            state: record.state.as_deref(),
        };

        for (strategy, queries, threshold) in tiers {
            for query in queries {
                let hits = self
                    .run_search(backend.as_ref(), &query, &mut attempt, ctx)
                    .await?;

                // Search rank decides; the score only gates
                let scored = hits
                    .into_iter()
                    .map(|hit| (score_search_result(&hit, &target, &self.policy), hit))
                    .filter(|(score, _)| *score >= threshold);

                for (score, hit) in scored {
                    if let Err(reason) = self.policy.check(&hit.link) {
                        ctx.debug(STAGE, format!("skipping {}: {reason}", hit.link));
                        continue;
                    }
                    let snippet = (!hit.snippet.is_empty()).then(|| hit.snippet.clone());
                    if let Some(winner) = self
                        .try_candidate(&hit.link, strategy, score, snippet, &mut attempt, ctx)
                        .await?
                    {
                        return Ok(attempt.finish(Some(winner)));
                    }
                }
            }
        }

        ctx.info(STAGE, "no website found");
        Ok(attempt.finish(None))
    }

    async fn try_directory(
        &self,
        record: &BusinessRecord,
        attempt: &mut Attempt,
        ctx: &mut RecordContext,
    ) -> Result<Option<(DiscoveryCandidate, String)>> {
        let Some(directory) = &self.directory else {
            return Ok(None);
        };

        for variant in directory_name_variants(&record.business_name) {
            self.quota.ensure_available()?;

            let domain = match directory.lookup_domain(&variant).await {
                Ok(Some(domain)) => domain,
                Ok(None) => {
                    ctx.debug(STAGE, format!("directory: no match for {variant:?}"));
                    continue;
                }
                Err(e) => {
                    ctx.warn(STAGE, format!("directory lookup for {variant:?} failed: {e}"));
                    continue;
                }
            };

            let url = format!("https://{domain}");
            if let Err(reason) = self.policy.check(&url) {
                ctx.debug(STAGE, format!("directory suggested {url}: {reason}"));
                continue;
            }

            let confidence = self.options.directory_confidence;
            if let Some(winner) = self
                .try_candidate(&url, Strategy::CompanyDirectory, confidence, None, attempt, ctx)
                .await?
            {
                return Ok(Some(winner));
            }
        }

        Ok(None)
    }

    /// One quota-gated search call. Throttles and transport errors yield no
    /// hits; only an exhausted quota is returned as an error.
    async fn run_search(
        &self,
        backend: &dyn SearchBackend,
        query: &str,
        attempt: &mut Attempt,
        ctx: &mut RecordContext,
    ) -> Result<Vec<SearchHit>> {
        if !attempt.queries.is_empty() && !self.options.search_delay.is_zero() {
            tokio::time::sleep(self.options.search_delay).await;
        }

        self.quota.try_acquire()?;
        attempt.queries.push(query.to_string());

        match backend.search(query).await {
            Ok(hits) => {
                self.quota.register_success();
                ctx.debug(STAGE, format!("query {query:?}: {} results", hits.len()));
                Ok(hits)
            }
            Err(EnrichError::Throttled { .. }) => {
                self.quota.register_throttled();
                ctx.warn(STAGE, format!("query {query:?} throttled"));
                self.quota.ensure_available()?;
                if !self.options.throttle_backoff.is_zero() {
                    tokio::time::sleep(self.options.throttle_backoff).await;
                }
                Ok(Vec::new())
            }
            Err(e) => {
                ctx.warn(STAGE, format!("query {query:?} failed: {e}"));
                Ok(Vec::new())
            }
        }
    }

    /// Crawl a candidate once per record. `Some` only for non-empty text.
    ///
    /// Crawls spend no search quota, so a hit from the last paid query is
    /// still tried after the quota runs out.
    async fn try_candidate(
        &self,
        url: &str,
        strategy: Strategy,
        confidence: f64,
        snippet: Option<String>,
        attempt: &mut Attempt,
        ctx: &mut RecordContext,
    ) -> Result<Option<(DiscoveryCandidate, String)>> {
        let Ok(parsed) = Url::parse(url) else {
            ctx.debug(STAGE, format!("unparseable candidate {url}"));
            return Ok(None);
        };
        if !attempt.crawled.insert(normalize_url(&parsed)) {
            ctx.debug(STAGE, format!("{url} already crawled"));
            return Ok(None);
        }

        match self.fetcher.fetch(&parsed).await {
            Ok(page) if !page.text.trim().is_empty() => {
                ctx.info_with(
                    STAGE,
                    "website found",
                    serde_json::json!({
                        "url": url,
                        "strategy": strategy.as_str(),
                        "confidence": confidence,
                        "pages_crawled": page.pages_crawled,
                        "insecure": page.insecure,
                    }),
                );
                let candidate = DiscoveryCandidate {
                    url: url.to_string(),
                    strategy: strategy.as_str().to_string(),
                    confidence,
                    snippet,
                    content: Some(page.text),
                };
                Ok(Some((candidate, page.content_hash)))
            }
            Ok(_) => {
                ctx.warn(STAGE, format!("{url} returned no text"));
                Ok(None)
            }
            Err(e) => {
                ctx.warn(STAGE, format!("crawl of {url} failed: {e}"));
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    fn yelp_hit() -> SearchHit {
        SearchHit {
            link: "https://www.yelp.com/biz/5-star-guttering-pasco".into(),
            title: "5 Star Guttering - Pasco, WA - Yelp".into(),
            snippet: "Reviews of 5 Star Guttering".into(),
        }
    }

    /// Name only in the domain: 0.2 + city + state + domain + keyword = 0.7.
    fn domain_only_hit() -> SearchHit {
        SearchHit {
            link: "https://5starguttering-pasco.com/".into(),
            title: "Pasco WA gutter service".into(),
            snippet: String::new(),
        }
    }

    fn score(hit: &SearchHit) -> f64 {
        let target = SearchTarget {
            business_name: "5 Star Guttering",
            city: Some("Pasco"),
            state: Some("WA"),
        };
        score_search_result(hit, &target, &ExclusionPolicy::default())
    }

    #[tokio::test]
    async fn web_search_winner_is_crawled_and_recorded() {
        let search = Arc::new(FakeSearch::default().reply(
            "5 Star Guttering Pasco WA",
            Reply::Hits(vec![yelp_hit(), guttering_hit()]),
        ));
        let fetcher = Arc::new(
            FakeFetcher::default().page("https://5starguttering.com", "Gutter installation in Pasco"),
        );
        let discoverer = discoverer(fetcher.clone(), quota(100, 5)).with_search(search.clone());

        let mut ctx = RecordContext::new(7, "5 Star Guttering");
        let outcome = discoverer.discover(&guttering(), &mut ctx).await.unwrap();

        let winner = outcome.winner.as_ref().expect("winner");
        assert_eq!(winner.url, "https://5starguttering.com/");
        assert_eq!(winner.strategy, "web_search");
        assert!(winner.confidence >= 0.7);
        assert_eq!(outcome.queries_attempted, vec!["5 Star Guttering Pasco WA"]);
        assert_eq!(
            *fetcher.calls.lock().unwrap(),
            vec!["https://5starguttering.com".to_string()]
        );

        let mut provenance = Provenance::default();
        outcome.record_provenance(&mut provenance, 6);
        assert_eq!(
            provenance.get(Provenance::DISCOVERY_METHOD).unwrap(),
            "web_search"
        );
        assert_eq!(provenance.get(Provenance::CRAWLED_EXCERPT).unwrap(), "Gutter");
        assert!(provenance.get(Provenance::CONTENT_HASH).is_some());
        assert!(provenance.get(Provenance::MATCHED_SNIPPET).is_some());
    }

    #[tokio::test]
    async fn first_ranked_hit_wins_over_higher_score() {
        let ranked_first = SearchHit {
            link: "https://starguttersnw.com/".into(),
            title: "Gutter pros of the Tri-Cities".into(),
            snippet: "5 Star Guttering installs seamless gutters in Pasco WA.".into(),
        };
        let first_score = score(&ranked_first);
        assert!(first_score >= 0.7);
        assert!(first_score < score(&guttering_hit()));

        let search = Arc::new(FakeSearch::default().reply(
            "5 Star Guttering Pasco WA",
            Reply::Hits(vec![ranked_first, guttering_hit()]),
        ));
        let fetcher = Arc::new(
            FakeFetcher::default()
                .page("https://starguttersnw.com", "Seamless gutters, Pasco")
                .page("https://5starguttering.com", "Gutter installation in Pasco"),
        );
        let discoverer = discoverer(fetcher.clone(), quota(100, 5)).with_search(search);

        let mut ctx = RecordContext::new(7, "5 Star Guttering");
        let outcome = discoverer.discover(&guttering(), &mut ctx).await.unwrap();

        let winner = outcome.winner.unwrap();
        assert_eq!(winner.url, "https://starguttersnw.com/");
        assert_eq!(winner.confidence, first_score);
        assert_eq!(
            *fetcher.calls.lock().unwrap(),
            vec!["https://starguttersnw.com".to_string()]
        );
    }

    #[tokio::test]
    async fn last_paid_query_hit_is_still_crawled() {
        let search = Arc::new(FakeSearch::default().reply(
            "5 Star Guttering Pasco WA",
            Reply::Hits(vec![guttering_hit()]),
        ));
        let fetcher = Arc::new(FakeFetcher::default().page("https://5starguttering.com", "Gutters"));
        let quota = quota(1, 5);
        let discoverer = discoverer(fetcher.clone(), quota.clone()).with_search(search.clone());

        let mut ctx = RecordContext::new(7, "5 Star Guttering");
        let outcome = discoverer.discover(&guttering(), &mut ctx).await.unwrap();

        assert_eq!(outcome.winner.unwrap().url, "https://5starguttering.com/");
        assert_eq!(search.calls.lock().unwrap().len(), 1);
        assert_eq!(fetcher.calls.lock().unwrap().len(), 1);
        assert!(quota.status().exceeded);
    }

    #[tokio::test]
    async fn knowledge_panel_needs_its_higher_threshold() {
        let hit = domain_only_hit();
        let hit_score = score(&hit);
        assert!((0.7..0.75).contains(&hit_score), "score {hit_score}");

        let search = Arc::new(
            FakeSearch::default().reply("\"5 Star Guttering\" Pasco WA", Reply::Hits(vec![hit])),
        );
        let fetcher = Arc::new(
            FakeFetcher::default().page("https://5starguttering-pasco.com", "Gutters in Pasco"),
        );
        let discoverer = discoverer(fetcher.clone(), quota(100, 5)).with_search(search.clone());

        let mut ctx = RecordContext::new(7, "5 Star Guttering");
        let outcome = discoverer.discover(&guttering(), &mut ctx).await.unwrap();

        assert!(outcome.winner.is_none());
        assert!(fetcher.calls.lock().unwrap().is_empty());
        assert!(
            search
                .calls
                .lock()
                .unwrap()
                .contains(&"\"5 Star Guttering\" Pasco WA".to_string())
        );
    }

    #[tokio::test]
    async fn local_pack_accepts_at_its_threshold() {
        let hit_score = score(&domain_only_hit());
        assert!(hit_score >= 0.7, "score {hit_score}");

        let search = Arc::new(
            FakeSearch::default()
                .reply(
                    "\"5 Star Guttering\" Pasco WA",
                    Reply::Hits(vec![domain_only_hit()]),
                )
                .reply(
                    "5 Star Guttering Pasco WA local business",
                    Reply::Hits(vec![domain_only_hit()]),
                ),
        );
        let fetcher = Arc::new(
            FakeFetcher::default().page("https://5starguttering-pasco.com", "Gutters in Pasco"),
        );
        let discoverer = discoverer(fetcher.clone(), quota(100, 5)).with_search(search);

        let mut ctx = RecordContext::new(7, "5 Star Guttering");
        let outcome = discoverer.discover(&guttering(), &mut ctx).await.unwrap();

        let winner = outcome.winner.unwrap();
        assert_eq!(winner.strategy, "local_pack");
        assert_eq!(winner.url, "https://5starguttering-pasco.com/");
        assert_eq!(winner.confidence, hit_score);
        assert!(winner.snippet.is_none());
        assert_eq!(
            outcome.queries_attempted.last().unwrap(),
            "5 Star Guttering Pasco WA local business"
        );
        assert_eq!(fetcher.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn excluded_results_never_crawled() {
        let search = Arc::new(
            FakeSearch::default().reply("5 Star Guttering Pasco WA", Reply::Hits(vec![yelp_hit()])),
        );
        let fetcher = Arc::new(FakeFetcher::default());
        let discoverer = discoverer(fetcher.clone(), quota(100, 5)).with_search(search.clone());

        let mut ctx = RecordContext::new(7, "5 Star Guttering");
        let outcome = discoverer.discover(&guttering(), &mut ctx).await.unwrap();

        assert!(outcome.winner.is_none());
        assert!(fetcher.calls.lock().unwrap().is_empty());
        // All tiers were tried: general variants, exact, local
        assert_eq!(search.calls.lock().unwrap().len(), outcome.queries_attempted.len());
        assert!(
            outcome
                .queries_attempted
                .iter()
                .any(|q| q.ends_with("local business"))
        );
    }

    #[tokio::test]
    async fn directory_runs_first() {
        let directory = FakeDirectory::default().domain("5 Star Guttering", "5starguttering.com");
        let search = Arc::new(FakeSearch::default());
        let fetcher = Arc::new(
            FakeFetcher::default().page("https://5starguttering.com", "Gutters and downspouts"),
        );
        let discoverer = discoverer(fetcher, quota(100, 5))
            .with_search(search.clone())
            .with_directory(Arc::new(directory));

        let mut ctx = RecordContext::new(7, "5 Star Guttering");
        let outcome = discoverer.discover(&guttering(), &mut ctx).await.unwrap();

        let winner = outcome.winner.unwrap();
        assert_eq!(winner.strategy, "company_directory");
        assert_eq!(winner.confidence, DIRECTORY_CONFIDENCE);
        assert!(winner.snippet.is_none());
        assert!(search.calls.lock().unwrap().is_empty());
        assert!(outcome.queries_attempted.is_empty());
    }

    #[tokio::test]
    async fn crawl_failure_moves_on_and_urls_crawled_once() {
        let dead = SearchHit {
            link: "https://5starguttering.net/".into(),
            ..guttering_hit()
        };
        // Same dead URL returned for two variants, then a live one
        let search = Arc::new(
            FakeSearch::default()
                .reply("5 Star Guttering Pasco WA", Reply::Hits(vec![dead.clone()]))
                .reply("5 star guttering WA", Reply::Hits(vec![dead, guttering_hit()])),
        );
        let fetcher = Arc::new(FakeFetcher::default().page("https://5starguttering.com", "Gutters"));
        let discoverer = discoverer(fetcher.clone(), quota(100, 5)).with_search(search);

        let mut ctx = RecordContext::new(7, "5 Star Guttering");
        let outcome = discoverer.discover(&guttering(), &mut ctx).await.unwrap();

        assert_eq!(outcome.winner.unwrap().url, "https://5starguttering.com/");
        assert_eq!(
            *fetcher.calls.lock().unwrap(),
            vec![
                "https://5starguttering.net".to_string(),
                "https://5starguttering.com".to_string()
            ]
        );
        assert_eq!(outcome.candidates_crawled, 2);
        assert!(ctx.events().iter().any(|e| e.message.contains("already crawled")));
    }

    #[tokio::test]
    async fn nothing_found_without_backends() {
        let discoverer = discoverer(Arc::new(FakeFetcher::default()), quota(100, 5));
        let mut ctx = RecordContext::new(7, "5 Star Guttering");
        let outcome = discoverer.discover(&guttering(), &mut ctx).await.unwrap();
        assert!(outcome.winner.is_none());
        assert!(outcome.content_hash.is_none());
    }

    #[tokio::test]
    async fn throttle_moves_to_next_variant() {
        let search = Arc::new(
            FakeSearch::default()
                .reply("5 Star Guttering Pasco WA", Reply::Throttle)
                .reply("5 star guttering WA", Reply::Hits(vec![guttering_hit()])),
        );
        let fetcher = Arc::new(FakeFetcher::default().page("https://5starguttering.com", "Gutters"));
        let quota = quota(100, 5);
        let discoverer = discoverer(fetcher, quota.clone()).with_search(search);

        let mut ctx = RecordContext::new(7, "5 Star Guttering");
        let outcome = discoverer.discover(&guttering(), &mut ctx).await.unwrap();

        assert!(outcome.winner.is_some());
        assert_eq!(outcome.queries_attempted.len(), 2);
        // The later success cleared the streak
        assert_eq!(quota.status().consecutive_throttled, 0);
        assert_eq!(quota.status().queries_today, 2);
    }

    #[tokio::test]
    async fn throttle_trip_returns_quota_exceeded() {
        let search = Arc::new(FakeSearch::default().reply("5 Star Guttering Pasco WA", Reply::Throttle));
        let discoverer =
            discoverer(Arc::new(FakeFetcher::default()), quota(100, 1)).with_search(search.clone());

        let mut ctx = RecordContext::new(7, "5 Star Guttering");
        let err = discoverer.discover(&guttering(), &mut ctx).await.unwrap_err();
        assert!(err.is_quota_exceeded());
        assert_eq!(search.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn exhausted_quota_stops_searching() {
        let search = Arc::new(FakeSearch::default());
        let discoverer =
            discoverer(Arc::new(FakeFetcher::default()), quota(1, 5)).with_search(search.clone());

        let mut ctx = RecordContext::new(7, "5 Star Guttering");
        let err = discoverer.discover(&guttering(), &mut ctx).await.unwrap_err();
        assert!(err.is_quota_exceeded());
        // First query spent the last unit; the second was refused before sending
        assert_eq!(search.calls.lock().unwrap().len(), 1);
    }
}
