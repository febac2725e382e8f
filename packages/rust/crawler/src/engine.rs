//! Page fetcher used to crawl discovery candidates.
//!
//! Fetches a candidate homepage, turns it into plain text, then follows a
//! handful of same-site contact/about/services links. A request that fails
//! on certificate verification is retried once with verification disabled.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};
use url::Url;

use leadscout_shared::{CrawlConfig, EnrichError, Result};

use crate::extract::{extract_links, html_to_text, key_page_links};

/// User-Agent string for crawl requests.
const USER_AGENT: &str = concat!("LeadScout/", env!("CARGO_PKG_VERSION"));

/// Maximum redirects followed per request.
const MAX_REDIRECTS: usize = 5;

// ---------------------------------------------------------------------------
// FetchedPage
// ---------------------------------------------------------------------------

/// Plain-text result of crawling one candidate site.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL of the homepage after redirects.
    pub url: String,
    /// HTTP status of the homepage response.
    pub status_code: u16,
    /// Extracted text of the homepage plus any key pages.
    pub text: String,
    /// Outbound links found on the homepage.
    pub links: Vec<String>,
    /// Number of pages whose text went into `text`.
    pub pages_crawled: usize,
    /// Whether certificate verification had to be disabled.
    pub insecure: bool,
    /// SHA-256 of `text`.
    pub content_hash: String,
}

// ---------------------------------------------------------------------------
// PageFetcher
// ---------------------------------------------------------------------------

/// Turns a URL into the page's plain-text content.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage>;
}

/// Default [`PageFetcher`] over reqwest.
pub struct HttpPageFetcher {
    client: Box<dyn HtmlClient>,
    insecure_client: Box<dyn HtmlClient>,
    max_extra_pages: usize,
}

impl HttpPageFetcher {
    /// Create a fetcher with the given crawl configuration.
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = build_client(timeout, false)?;
        let insecure_client = build_client(timeout, true)?;

        Ok(Self::with_clients(
            Box::new(client),
            Box::new(insecure_client),
            config.max_extra_pages,
        ))
    }

    fn with_clients(
        client: Box<dyn HtmlClient>,
        insecure_client: Box<dyn HtmlClient>,
        max_extra_pages: usize,
    ) -> Self {
        Self {
            client,
            insecure_client,
            max_extra_pages,
        }
    }

    /// GET one page, falling back to the unverified client on TLS failure.
    async fn get_html(&self, url: &Url) -> Result<(String, u16, String, bool)> {
        match self.client.get_html(url).await {
            Ok((final_url, status, body)) => Ok((final_url, status, body, false)),
            Err(FetchError::Tls(msg)) => {
                warn!(%url, error = %msg, "TLS verification failed, retrying without it");
                self.insecure_client
                    .get_html(url)
                    .await
                    .map(|(final_url, status, body)| (final_url, status, body, true))
                    .map_err(EnrichError::from)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        let (final_url, status_code, body, insecure) = self.get_html(url).await?;

        let base = Url::parse(&final_url).unwrap_or_else(|_| url.clone());
        let links = {
            let doc = Html::parse_document(&body);
            extract_links(&doc, &base)
        };

        let mut sections = vec![html_to_text(&body)];
        for page in key_page_links(&links, &base, self.max_extra_pages) {
            match self.get_html(&page).await {
                Ok((_, _, html, _)) => sections.push(html_to_text(&html)),
                Err(e) => debug!(url = %page, error = %e, "key page fetch failed"),
            }
        }

        sections.retain(|s| !s.is_empty());
        let pages_crawled = sections.len();
        let text = sections.join("\n\n");

        if text.trim().is_empty() {
            return Err(EnrichError::parse(format!("{url}: page has no text content")));
        }

        debug!(pages_crawled, chars = text.len(), insecure, "site crawled");

        Ok(FetchedPage {
            url: final_url,
            status_code,
            content_hash: compute_hash(&text),
            text,
            links,
            pages_crawled,
            insecure,
        })
    }
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// Fetch failure, split so TLS problems can trigger the insecure retry.
#[derive(Debug)]
enum FetchError {
    Tls(String),
    Other(EnrichError),
}

impl From<FetchError> for EnrichError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Tls(msg) => EnrichError::Network(format!("TLS failure: {msg}")),
            FetchError::Other(e) => e,
        }
    }
}

/// One GET returning final URL, status and body.
#[async_trait]
trait HtmlClient: Send + Sync {
    async fn get_html(&self, url: &Url) -> std::result::Result<(String, u16, String), FetchError>;
}

#[async_trait]
impl HtmlClient for Client {
    async fn get_html(&self, url: &Url) -> std::result::Result<(String, u16, String), FetchError> {
        get_html_with(self, url).await
    }
}

fn build_client(timeout: Duration, accept_invalid_certs: bool) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(timeout)
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()
        .map_err(|e| EnrichError::Network(format!("failed to build HTTP client: {e}")))
}

async fn get_html_with(
    client: &Client,
    url: &Url,
) -> std::result::Result<(String, u16, String), FetchError> {
    let response = client.get(url.as_str()).send().await.map_err(|e| {
        if is_tls_error(&e) {
            FetchError::Tls(e.to_string())
        } else {
            FetchError::Other(EnrichError::Network(format!("{url}: {e}")))
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Other(EnrichError::Network(format!(
            "{url}: HTTP {status}"
        ))));
    }

    let final_url = response.url().to_string();
    let body = response.text().await.map_err(|e| {
        FetchError::Other(EnrichError::Network(format!("{url}: body read failed: {e}")))
    })?;

    Ok((final_url, status.as_u16(), body))
}

/// Walk the error chain looking for a certificate/TLS failure.
fn is_tls_error(err: &reqwest::Error) -> bool {
    let mut source = Some(err as &dyn std::error::Error);
    while let Some(e) = source {
        if is_tls_message(&e.to_string()) {
            return true;
        }
        source = e.source();
    }
    false
}

fn is_tls_message(msg: &str) -> bool {
    let msg = msg.to_lowercase();
    ["certificate", "tls", "ssl", "handshake", "unknownissuer"]
        .iter()
        .any(|needle| msg.contains(needle))
}

/// Compute SHA-256 hash of content.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod fetcher_tests {
    use super::*;

    fn test_config() -> CrawlConfig {
        CrawlConfig {
            timeout_secs: 5,
            max_extra_pages: 2,
            excerpt_chars: 500,
        }
    }

    #[test]
    fn test_compute_hash() {
        let hash = compute_hash("hello world");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_tls_message_detection() {
        assert!(is_tls_message("invalid peer certificate: UnknownIssuer"));
        assert!(is_tls_message("received fatal alert: HandshakeFailure"));
        assert!(!is_tls_message("operation timed out"));
        assert!(!is_tls_message("dns error: failed to lookup address"));
    }

    #[tokio::test]
    async fn test_fetch_follows_key_pages() {
        let server = wiremock::MockServer::start().await;

        let home = r#"<html><head><title>Acme Plumbing</title></head><body>
            <h1>Acme Plumbing</h1>
            <p>Residential plumbing repair.</p>
            <a href="/contact">Contact</a>
            <a href="/blog">Blog</a>
        </body></html>"#;

        let contact = r#"<html><body>
            <p>Phone: (509) 555-1234</p>
            <script>var x = 1;</script>
        </body></html>"#;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(home))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/contact"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(contact))
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(&test_config()).unwrap();
        let url = Url::parse(&server.uri()).unwrap();
        let page = fetcher.fetch(&url).await.unwrap();

        assert_eq!(page.status_code, 200);
        assert_eq!(page.pages_crawled, 2);
        assert!(page.text.contains("Residential plumbing repair."));
        assert!(page.text.contains("Phone: (509) 555-1234"));
        assert!(!page.text.contains("var x"));
        assert!(!page.insecure);
        assert_eq!(page.content_hash, compute_hash(&page.text));
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(&test_config()).unwrap();
        let url = Url::parse(&server.uri()).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_fetch_empty_page_is_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string("<html><body><script>only()</script></body></html>"),
            )
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(&test_config()).unwrap();
        let url = Url::parse(&server.uri()).unwrap();
        assert!(fetcher.fetch(&url).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_counts_only_pages_with_text() {
        let server = wiremock::MockServer::start().await;

        let home = r#"<html><body>
            <p>Acme Plumbing, Kennewick WA</p>
            <a href="/contact">Contact</a>
        </body></html>"#;

        wiremock::Mock::given(wiremock::matchers::path("/"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(home))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::path("/contact"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string("<html><body><script>form()</script></body></html>"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(&test_config()).unwrap();
        let url = Url::parse(&server.uri()).unwrap();
        let page = fetcher.fetch(&url).await.unwrap();

        assert_eq!(page.pages_crawled, 1);
        assert_eq!(page.text, "Acme Plumbing, Kennewick WA\nContact");
    }

    /// Fails every request the way rustls reports an untrusted certificate.
    struct UntrustedCert;

    #[async_trait]
    impl HtmlClient for UntrustedCert {
        async fn get_html(
            &self,
            _url: &Url,
        ) -> std::result::Result<(String, u16, String), FetchError> {
            Err(FetchError::Tls(
                "invalid peer certificate: UnknownIssuer".into(),
            ))
        }
    }

    #[tokio::test]
    async fn test_tls_failure_retries_insecure() {
        let server = wiremock::MockServer::start().await;

        let home = r#"<html><body>
            <p>Acme Plumbing</p>
            <a href="/about">About us</a>
        </body></html>"#;

        wiremock::Mock::given(wiremock::matchers::path("/"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(home))
            .expect(1)
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::path("/about"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string("<p>Family owned since 1998.</p>"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let fetcher =
            HttpPageFetcher::with_clients(Box::new(UntrustedCert), Box::new(Client::new()), 2);
        let url = Url::parse(&server.uri()).unwrap();
        let page = fetcher.fetch(&url).await.unwrap();

        assert!(page.insecure);
        assert_eq!(page.pages_crawled, 2);
        assert!(page.text.contains("Family owned since 1998."));
    }

    #[tokio::test]
    async fn test_non_tls_failure_is_not_retried() {
        let fetcher = HttpPageFetcher::with_clients(
            Box::new(Client::new()),
            Box::new(UntrustedCert),
            2,
        );
        // Nothing listens on port 9; a refused connection is not a TLS problem
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(!err.to_string().contains("TLS failure"));
    }
}
