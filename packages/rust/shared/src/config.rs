//! Application configuration for LeadScout.
//!
//! User config lives at `~/.leadscout/leadscout.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EnrichError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "leadscout.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".leadscout";

// ---------------------------------------------------------------------------
// Config structs (matching leadscout.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Web-search endpoint settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Company-suggestion endpoint settings.
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// Search quota governor.
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Acceptance and review thresholds.
    #[serde(default)]
    pub thresholds: ThresholdsConfig,

    /// Page fetching.
    #[serde(default)]
    pub crawl: CrawlConfig,

    /// Additions to the built-in domain exclusion policy.
    #[serde(default)]
    pub exclusions: ExclusionsConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Path to the record database.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Records fetched per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Concurrent worker slices per batch.
    #[serde(default = "default_workers")]
    pub workers: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            batch_size: default_batch_size(),
            workers: default_workers(),
        }
    }
}

fn default_db_path() -> String {
    "~/.leadscout/records.db".into()
}
fn default_batch_size() -> u32 {
    25
}
fn default_workers() -> u32 {
    3
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Custom-search endpoint URL.
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Name of the env var holding the search-context id.
    #[serde(default = "default_engine_id_env")]
    pub engine_id_env: String,

    /// Results requested per query.
    #[serde(default = "default_results_per_query")]
    pub results_per_query: u32,

    /// Maximum general-search query variants per record.
    #[serde(default = "default_max_queries")]
    pub max_queries: usize,

    /// Request timeout in seconds.
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,

    /// Fixed delay between search calls for the same record.
    #[serde(default = "default_search_delay")]
    pub delay_ms: u64,

    /// Back-off after an HTTP 429 before trying the next query variant.
    #[serde(default = "default_throttle_backoff")]
    pub throttle_backoff_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            api_key_env: default_api_key_env(),
            engine_id_env: default_engine_id_env(),
            results_per_query: default_results_per_query(),
            max_queries: default_max_queries(),
            timeout_secs: default_search_timeout(),
            delay_ms: default_search_delay(),
            throttle_backoff_ms: default_throttle_backoff(),
        }
    }
}

fn default_search_endpoint() -> String {
    "https://www.googleapis.com/customsearch/v1".into()
}
fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".into()
}
fn default_engine_id_env() -> String {
    "GOOGLE_SEARCH_ENGINE_ID".into()
}
fn default_results_per_query() -> u32 {
    10
}
fn default_max_queries() -> usize {
    4
}
fn default_search_timeout() -> u64 {
    15
}
fn default_search_delay() -> u64 {
    1000
}
fn default_throttle_backoff() -> u64 {
    5000
}

/// `[directory]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Whether the company-suggestion lookup runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Company-suggestion endpoint URL.
    #[serde(default = "default_directory_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds.
    #[serde(default = "default_directory_timeout")]
    pub timeout_secs: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_directory_endpoint(),
            timeout_secs: default_directory_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_directory_endpoint() -> String {
    "https://autocomplete.clearbit.com/v1/companies/suggest".into()
}
fn default_directory_timeout() -> u64 {
    10
}

/// How the daily query counter is reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaReset {
    /// Roll the counter over at UTC midnight.
    #[default]
    Daily,
    /// Keep one counter for the lifetime of the process.
    Process,
}

/// `[quota]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Search queries allowed per day.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u64,

    /// Consecutive 429 responses that trip the governor.
    #[serde(default = "default_trip_threshold")]
    pub throttle_trip_threshold: u32,

    /// Counter reset policy.
    #[serde(default)]
    pub reset: QuotaReset,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_limit: default_daily_limit(),
            throttle_trip_threshold: default_trip_threshold(),
            reset: QuotaReset::default(),
        }
    }
}

fn default_daily_limit() -> u64 {
    10_000
}
fn default_trip_threshold() -> u32 {
    5
}

/// `[thresholds]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdsConfig {
    /// Confidence at or above which a record is approved for download.
    #[serde(default = "default_auto_approve")]
    pub auto_approve: f64,

    /// Confidence at or above which a record goes to manual review.
    #[serde(default = "default_manual_review")]
    pub manual_review: f64,

    /// Validation confidence below which the score is not blended.
    #[serde(default = "default_min_validation")]
    pub min_validation: f64,

    /// Acceptance for general web-search results.
    #[serde(default = "default_search_accept")]
    pub search_accept: f64,

    /// Acceptance for the exact-match (knowledge panel) query.
    #[serde(default = "default_exact_accept")]
    pub exact_match_accept: f64,

    /// Acceptance for the local-business query.
    #[serde(default = "default_search_accept")]
    pub local_accept: f64,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            auto_approve: default_auto_approve(),
            manual_review: default_manual_review(),
            min_validation: default_min_validation(),
            search_accept: default_search_accept(),
            exact_match_accept: default_exact_accept(),
            local_accept: default_search_accept(),
        }
    }
}

fn default_auto_approve() -> f64 {
    0.8
}
fn default_manual_review() -> f64 {
    0.6
}
fn default_min_validation() -> f64 {
    0.4
}
fn default_search_accept() -> f64 {
    0.7
}
fn default_exact_accept() -> f64 {
    0.75
}

/// `[crawl]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Page fetch timeout in seconds.
    #[serde(default = "default_crawl_timeout")]
    pub timeout_secs: u64,

    /// Same-site pages (about/contact/services) fetched after the homepage.
    #[serde(default = "default_extra_pages")]
    pub max_extra_pages: usize,

    /// Characters of crawled text kept in provenance.
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_crawl_timeout(),
            max_extra_pages: default_extra_pages(),
            excerpt_chars: default_excerpt_chars(),
        }
    }
}

fn default_crawl_timeout() -> u64 {
    30
}
fn default_extra_pages() -> usize {
    2
}
fn default_excerpt_chars() -> usize {
    2000
}

/// `[exclusions]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExclusionsConfig {
    /// Extra excluded domains (matched as host suffix).
    #[serde(default)]
    pub domains: Vec<String>,

    /// Extra excluded path substrings.
    #[serde(default)]
    pub paths: Vec<String>,
}

// ---------------------------------------------------------------------------
// Secrets
// ---------------------------------------------------------------------------

/// Search API credentials resolved from the environment.
#[derive(Clone)]
pub struct SearchCredentials {
    pub api_key: String,
    pub engine_id: String,
}

impl std::fmt::Debug for SearchCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchCredentials")
            .field("api_key", &"<redacted>")
            .field("engine_id", &self.engine_id)
            .finish()
    }
}

/// Read the search API key and engine id from the env vars named in config.
pub fn search_credentials(config: &AppConfig) -> Result<SearchCredentials> {
    let read = |name: &str| match std::env::var(name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(EnrichError::config(format!(
            "search credentials not found. Set the {name} environment variable."
        ))),
    };

    Ok(SearchCredentials {
        api_key: read(&config.search.api_key_env)?,
        engine_id: read(&config.search.engine_id_env)?,
    })
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.leadscout/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| EnrichError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.leadscout/leadscout.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Expand a leading `~/` against the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| EnrichError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| EnrichError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| EnrichError::config(format!("failed to parse {}: {e}", path.display())))?;
    validate_config(&config)?;
    Ok(config)
}

/// Reject threshold combinations that make the review buckets meaningless.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let t = &config.thresholds;
    for (name, value) in [
        ("auto_approve", t.auto_approve),
        ("manual_review", t.manual_review),
        ("min_validation", t.min_validation),
        ("search_accept", t.search_accept),
        ("exact_match_accept", t.exact_match_accept),
        ("local_accept", t.local_accept),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(EnrichError::config(format!(
                "thresholds.{name} must be within [0, 1], got {value}"
            )));
        }
    }
    if t.manual_review > t.auto_approve {
        return Err(EnrichError::config(
            "thresholds.manual_review must not exceed thresholds.auto_approve",
        ));
    }
    if config.quota.daily_limit == 0 {
        return Err(EnrichError::config("quota.daily_limit must be positive"));
    }
    Ok(())
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| EnrichError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| EnrichError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| EnrichError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
