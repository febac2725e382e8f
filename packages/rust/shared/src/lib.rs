//! Shared types, error model, and configuration for LeadScout.
//!
//! This crate is the foundation depended on by all other LeadScout crates.
//! It provides:
//! - [`EnrichError`]: the unified error type
//! - Domain types ([`BusinessRecord`], [`DiscoveryCandidate`], status enums)
//! - Configuration ([`AppConfig`] and its sections, config loading)
//! - The per-record event buffer ([`RecordContext`])
//! - Name/phone/address normalisation helpers ([`text`])

pub mod config;
pub mod context;
pub mod error;
pub mod text;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CrawlConfig, DefaultsConfig, DirectoryConfig, ExclusionsConfig, QuotaConfig,
    QuotaReset, SearchConfig, SearchCredentials, ThresholdsConfig, config_dir, config_file_path,
    expand_home, init_config, load_config, load_config_from, search_credentials, validate_config,
};
pub use context::{ContextEvent, EventLevel, RecordContext};
pub use error::{EnrichError, Result};
pub use types::{
    BusinessRecord, DiscoveryCandidate, ProcessingStatus, Provenance, ReviewStatus, WebsiteStatus,
};
