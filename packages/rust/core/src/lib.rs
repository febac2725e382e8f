//! Contractor resolution engine for LeadScout.
//!
//! This crate ties together discovery, identity validation, classification
//! and confidence aggregation into the per-record pipeline ([`Engine`]) and
//! the concurrent batch runner ([`run_batch`]).

pub mod aggregate;
pub mod batch;
pub mod pipeline;

#[cfg(test)]
mod testing;

pub use aggregate::{ScoreDecision, blend, decide, review_status_for};
pub use batch::{BatchProgress, BatchSummary, SilentProgress, run_batch};
pub use pipeline::Engine;
