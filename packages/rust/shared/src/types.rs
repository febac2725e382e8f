//! Core domain types: the business record and its status enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EnrichError, Result};

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

/// Outcome of website discovery for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebsiteStatus {
    #[default]
    Unattempted,
    Found,
    NotFound,
}

/// Where a record is in its processing lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Review bucket assigned once processing completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    ApprovedDownload,
    PendingReview,
    Rejected,
}

macro_rules! str_enum {
    ($ty:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            /// Stable string form used in storage and logs.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s,)+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = EnrichError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($s => Ok(Self::$variant),)+
                    other => Err(EnrichError::parse(format!(
                        concat!("unknown ", stringify!($ty), ": {}"),
                        other
                    ))),
                }
            }
        }
    };
}

str_enum!(WebsiteStatus {
    Unattempted => "unattempted",
    Found => "found",
    NotFound => "not_found",
});

str_enum!(ProcessingStatus {
    Pending => "pending",
    Processing => "processing",
    Completed => "completed",
    Failed => "failed",
});

str_enum!(ReviewStatus {
    ApprovedDownload => "approved_download",
    PendingReview => "pending_review",
    Rejected => "rejected",
});

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// Free-form record of how a record's outputs were produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Provenance(pub serde_json::Map<String, serde_json::Value>);

impl Provenance {
    pub const DISCOVERY_METHOD: &'static str = "discovery_method";
    pub const DISCOVERY_SCORE: &'static str = "discovery_score";
    pub const MATCHED_SNIPPET: &'static str = "matched_snippet";
    pub const QUERIES_ATTEMPTED: &'static str = "queries_attempted";
    pub const CRAWLED_EXCERPT: &'static str = "crawled_excerpt";
    pub const CONTENT_HASH: &'static str = "content_hash";
    pub const VALIDATION: &'static str = "validation";
    pub const CLASSIFICATION: &'static str = "classification";

    /// Set `key`, replacing any previous value.
    pub fn record(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// BusinessRecord
// ---------------------------------------------------------------------------

/// One registry row moving through the resolution engine.
///
/// Outcome fields are only changed through the transition methods, which
/// keep two invariants: a `Found` website always carries a non-empty URL, and
/// a review status exists only on completed records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusinessRecord {
    pub id: i64,

    // Identity
    pub business_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    // Discovery
    #[serde(default, skip_serializing_if = "Option::is_none")]
    website_url: Option<String>,
    #[serde(default)]
    website_status: WebsiteStatus,

    // Scoring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mailer_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residential_focus: Option<bool>,

    // Outcome
    #[serde(default)]
    processing_status: ProcessingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    review_status: Option<ReviewStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub processing_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_processed: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Provenance::is_empty")]
    pub provenance: Provenance,
}

impl BusinessRecord {
    /// A fresh pending record with only identity fields set.
    pub fn new(id: i64, business_name: impl Into<String>) -> Self {
        Self {
            id,
            business_name: business_name.into(),
            ..Self::default()
        }
    }

    /// Rebuild a record from stored outcome columns, checking invariants.
    pub fn restore(
        mut self,
        website_url: Option<String>,
        website_status: WebsiteStatus,
        processing_status: ProcessingStatus,
        review_status: Option<ReviewStatus>,
    ) -> Result<Self> {
        if website_status == WebsiteStatus::Found
            && website_url.as_deref().is_none_or(str::is_empty)
        {
            return Err(EnrichError::validation(format!(
                "record {}: website_status=found without a URL",
                self.id
            )));
        }
        if review_status.is_some() && processing_status != ProcessingStatus::Completed {
            return Err(EnrichError::validation(format!(
                "record {}: review_status set while {processing_status}",
                self.id
            )));
        }
        self.website_url = website_url;
        self.website_status = website_status;
        self.processing_status = processing_status;
        self.review_status = review_status;
        Ok(self)
    }

    pub fn website_url(&self) -> Option<&str> {
        self.website_url.as_deref()
    }

    pub fn website_status(&self) -> WebsiteStatus {
        self.website_status
    }

    pub fn processing_status(&self) -> ProcessingStatus {
        self.processing_status
    }

    pub fn review_status(&self) -> Option<ReviewStatus> {
        self.review_status
    }

    /// `pending → processing`. Clears outputs from any earlier attempt.
    pub fn begin_processing(&mut self) -> Result<()> {
        if self.processing_status != ProcessingStatus::Pending {
            return Err(EnrichError::validation(format!(
                "record {}: cannot start processing from {}",
                self.id, self.processing_status
            )));
        }
        self.processing_status = ProcessingStatus::Processing;
        self.processing_attempts += 1;
        self.review_status = None;
        self.error_message = None;
        self.website_url = None;
        self.website_status = WebsiteStatus::Unattempted;
        self.website_confidence = None;
        self.classification_confidence = None;
        self.confidence_score = None;
        self.mailer_category = None;
        self.residential_focus = None;
        self.provenance = Provenance::default();
        Ok(())
    }

    /// Record a discovered website.
    pub fn mark_found(&mut self, url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(EnrichError::validation(format!(
                "record {}: cannot mark an empty URL as found",
                self.id
            )));
        }
        self.website_url = Some(url.to_string());
        self.website_status = WebsiteStatus::Found;
        Ok(())
    }

    /// Record that discovery found nothing.
    pub fn mark_not_found(&mut self) {
        self.website_url = None;
        self.website_status = WebsiteStatus::NotFound;
    }

    /// `processing → completed` with the final score and review bucket.
    pub fn complete(&mut self, confidence_score: f64, review: ReviewStatus) -> Result<()> {
        if self.processing_status != ProcessingStatus::Processing {
            return Err(EnrichError::validation(format!(
                "record {}: cannot complete from {}",
                self.id, self.processing_status
            )));
        }
        self.confidence_score = Some(confidence_score);
        self.review_status = Some(review);
        self.processing_status = ProcessingStatus::Completed;
        self.last_processed = Some(Utc::now());
        Ok(())
    }

    /// Any state `→ failed`, persisting the reason.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.processing_status = ProcessingStatus::Failed;
        self.review_status = None;
        self.error_message = Some(message.into());
        self.last_processed = Some(Utc::now());
    }

    /// Put a record back in the queue (`failed → pending`).
    pub fn reset(&mut self) {
        self.processing_status = ProcessingStatus::Pending;
        self.review_status = None;
        self.error_message = None;
    }
}

// ---------------------------------------------------------------------------
// DiscoveryCandidate
// ---------------------------------------------------------------------------

/// A candidate website produced by one discovery strategy attempt.
#[derive(Debug, Clone)]
pub struct DiscoveryCandidate {
    /// Candidate URL.
    pub url: String,
    /// Strategy that produced it.
    pub strategy: String,
    /// Source-level confidence (search score or directory constant).
    pub confidence: f64,
    /// Snippet that matched, if the source was a search result.
    pub snippet: Option<String>,
    /// Crawled plain text, absent if the crawl failed.
    pub content: Option<String>,
}
