//! Page fetching and content extraction for discovery candidates.
//!
//! This crate provides:
//! - [`PageFetcher`]: the URL → plain-text seam the discovery engine crawls through
//! - [`HttpPageFetcher`]: reqwest implementation with a shallow same-site crawl
//! - [`extract`]: HTML → text and link helpers

pub mod engine;
pub mod extract;

pub use engine::{FetchedPage, HttpPageFetcher, PageFetcher, compute_hash};
pub use extract::{extract_links, html_to_text, normalize_url};
