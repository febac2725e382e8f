//! Contractor content classification.
//!
//! [`ContentClassifier`] is the seam for swapping in a learned model. The
//! default [`KeywordClassifier`] scores keyword density.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use leadscout_shared::Result;
use leadscout_shared::text::CONTRACTOR_KEYWORDS;

/// Mailer category assigned to a contractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceCategory {
    Electrical,
    Plumbing,
    #[serde(rename = "HVAC")]
    Hvac,
    Roofing,
    #[serde(rename = "General Contractor")]
    GeneralContractor,
}

impl ServiceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Electrical => "Electrical",
            Self::Plumbing => "Plumbing",
            Self::Hvac => "HVAC",
            Self::Roofing => "Roofing",
            Self::GeneralContractor => "General Contractor",
        }
    }
}

impl std::fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier output for one page.
#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    /// Confidence that the page belongs to a residential contractor, `[0, 1]`.
    pub confidence: f64,
    pub category: ServiceCategory,
    pub residential_focus: bool,
    pub residential_hits: usize,
    pub service_hits: usize,
    pub legitimacy_hits: usize,
    pub name_present: bool,
}

/// Text in, confidence and category out.
#[async_trait]
pub trait ContentClassifier: Send + Sync {
    async fn classify(&self, text: &str, business_name: &str) -> Result<Classification>;
}

const RESIDENTIAL_KEYWORDS: &[&str] = &[
    "residential",
    "homeowner",
    "homeowners",
    "home",
    "homes",
    "house",
    "family",
    "kitchen",
    "bathroom",
    "basement",
    "garage",
    "yard",
    "neighborhood",
    "remodel",
];

const LEGITIMACY_KEYWORDS: &[&str] = &[
    "licensed",
    "insured",
    "bonded",
    "warranty",
    "guarantee",
    "guaranteed",
    "certified",
    "accredited",
    "free estimate",
    "free estimates",
    "years of experience",
    "family owned",
];

const EXTRA_SERVICE_KEYWORDS: &[&str] = &["installation", "repair", "maintenance", "replacement"];

const CATEGORY_KEYWORDS: &[(ServiceCategory, &[&str])] = &[
    (
        ServiceCategory::Electrical,
        &["electrical", "electrician", "electric", "wiring", "panel upgrade"],
    ),
    (
        ServiceCategory::Plumbing,
        &["plumbing", "plumber", "drain", "water heater", "sewer"],
    ),
    (
        ServiceCategory::Hvac,
        &["hvac", "heating", "cooling", "furnace", "air conditioning", "heat pump"],
    ),
    (
        ServiceCategory::Roofing,
        &["roofing", "roofer", "roof", "shingle", "gutter"],
    ),
];

const RESIDENTIAL_WEIGHT: f64 = 0.4;
const SERVICE_WEIGHT: f64 = 0.3;
const LEGITIMACY_WEIGHT: f64 = 0.2;
const NAME_BONUS: f64 = 0.1;

const RESIDENTIAL_SATURATION: usize = 10;
const SERVICE_SATURATION: usize = 20;
const LEGITIMACY_SATURATION: usize = 20;

/// Residential hits needed to flag a residential focus.
const RESIDENTIAL_FOCUS_MIN_HITS: usize = 2;

/// Keyword-density classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    /// Synchronous scoring used by the trait impl.
    pub fn score(&self, text: &str, business_name: &str) -> Classification {
        static RESIDENTIAL_RE: LazyLock<Regex> =
            LazyLock::new(|| keyword_regex(RESIDENTIAL_KEYWORDS.iter()));
        static SERVICE_RE: LazyLock<Regex> = LazyLock::new(|| {
            keyword_regex(CONTRACTOR_KEYWORDS.iter().chain(EXTRA_SERVICE_KEYWORDS))
        });
        static LEGITIMACY_RE: LazyLock<Regex> =
            LazyLock::new(|| keyword_regex(LEGITIMACY_KEYWORDS.iter()));

        let lower = text.to_lowercase();
        let residential_hits = RESIDENTIAL_RE.find_iter(&lower).count();
        let service_hits = SERVICE_RE.find_iter(&lower).count();
        let legitimacy_hits = LEGITIMACY_RE.find_iter(&lower).count();

        let name = business_name.trim().to_lowercase();
        let name_present = !name.is_empty() && lower.contains(&name);

        let mut confidence = saturate(residential_hits, RESIDENTIAL_SATURATION) * RESIDENTIAL_WEIGHT
            + saturate(service_hits, SERVICE_SATURATION) * SERVICE_WEIGHT
            + saturate(legitimacy_hits, LEGITIMACY_SATURATION) * LEGITIMACY_WEIGHT;
        if name_present {
            confidence += NAME_BONUS;
        }

        Classification {
            confidence: confidence.clamp(0.0, 1.0),
            category: categorize(&lower),
            residential_focus: residential_hits >= RESIDENTIAL_FOCUS_MIN_HITS,
            residential_hits,
            service_hits,
            legitimacy_hits,
            name_present,
        }
    }
}

#[async_trait]
impl ContentClassifier for KeywordClassifier {
    async fn classify(&self, text: &str, business_name: &str) -> Result<Classification> {
        Ok(self.score(text, business_name))
    }
}

/// First category with any keyword in `lower`, else General Contractor.
pub fn categorize(lower: &str) -> ServiceCategory {
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| lower.contains(kw)))
        .map(|(category, _)| *category)
        .unwrap_or(ServiceCategory::GeneralContractor)
}

fn saturate(hits: usize, cap: usize) -> f64 {
    (hits as f64 / cap as f64).min(1.0)
}

/// One alternation over whole-word keywords, longest first.
fn keyword_regex<'a>(keywords: impl Iterator<Item = &'a &'a str>) -> Regex {
    let mut keywords: Vec<&str> = keywords.copied().collect();
    keywords.sort_by_key(|k| std::cmp::Reverse(k.len()));
    let alternation = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b(?:{alternation})\b")).expect("valid regex")
}
