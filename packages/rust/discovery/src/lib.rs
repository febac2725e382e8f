//! Website discovery for registry businesses.
//!
//! Given a business's identity fields, LeadScout tries a company directory,
//! then a series of web-search queries, scoring each result and crawling the
//! best candidates until one turns out to be a live, crawlable site that is
//! not a directory, social profile or government page.

pub mod directory;
pub mod orchestrator;
pub mod policy;
pub mod queries;
pub mod scorer;
pub mod search;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use directory::{ClearbitDirectory, CompanyDirectory};
pub use orchestrator::{
    DIRECTORY_CONFIDENCE, Discoverer, DiscoveryOptions, DiscoveryOutcome, Strategy,
};
pub use policy::{Exclusion, ExclusionPolicy};
pub use scorer::{
    MAX_SEARCH_CONFIDENCE, NameMatch, ScoreBreakdown, SearchHit, SearchTarget, score_breakdown,
    score_search_result,
};
pub use search::{GoogleSearchClient, SearchBackend};

/// Maximum number of redirects to follow on API requests.
const MAX_REDIRECTS: usize = 3;

/// User-Agent string for discovery requests.
const USER_AGENT: &str = concat!("LeadScout/", env!("CARGO_PKG_VERSION"));
