//! Five-factor identity validation.
//!
//! Checks how well crawled page text corroborates a registry record:
//! business name, licence number, phone, street address and principal name.
//! Each factor is worth [`FACTOR_WEIGHT`]; the name factor can also earn
//! [`PARTIAL_NAME_WEIGHT`] from a keyword-only match.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use leadscout_shared::BusinessRecord;
use leadscout_shared::text::{
    CONTRACTOR_KEYWORDS, alnum_only, clean_name, contains_phrase, contains_word, digits_only,
    simplify_name, words,
};

/// Contribution of one fully matched factor.
pub const FACTOR_WEIGHT: f64 = 0.25;

/// Contribution of a keyword-only business-name match.
pub const PARTIAL_NAME_WEIGHT: f64 = 0.15;

/// Token ratio at which the business name counts as fully matched.
const FULL_NAME_RATIO: f64 = 0.75;

/// Share of address components that must match on word boundaries.
const ADDRESS_COMPONENT_RATIO: f64 = 0.75;

const MIN_LICENSE_CHARS: usize = 5;
const MIN_PHONE_DIGITS: usize = 10;

const STOP_WORDS: &[&str] = &["the", "and", "for", "of", "a", "an", "at", "by", "dba"];

/// Trade words too common to tell one contractor from another.
const GENERIC_TRADE_WORDS: &[&str] = &[
    "heating",
    "cooling",
    "air",
    "hvac",
    "plumbing",
    "plumber",
    "electric",
    "electrical",
    "roofing",
    "construction",
    "contractor",
    "contractors",
    "contracting",
    "builders",
    "building",
    "remodeling",
    "painting",
    "landscaping",
    "services",
    "service",
    "solutions",
    "systems",
    "mechanical",
    "repair",
    "home",
    "homes",
    "general",
    "residential",
    "commercial",
    "enterprises",
    "group",
];

/// How the business name matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NameMatchLevel {
    Full,
    Partial,
    None,
}

impl NameMatchLevel {
    pub fn points(self) -> f64 {
        match self {
            Self::Full => FACTOR_WEIGHT,
            Self::Partial => PARTIAL_NAME_WEIGHT,
            Self::None => 0.0,
        }
    }
}

/// Per-factor outcome of validating one record against page text.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub name_match: NameMatchLevel,
    /// Weighted share of distinctive name tokens found, in `[0, 1]`.
    pub name_ratio: f64,
    pub license_match: bool,
    pub phone_match: bool,
    pub address_match: bool,
    pub principal_match: bool,
    /// Unclamped factor sum, up to 1.25.
    pub raw_confidence: f64,
    /// `raw_confidence` clamped to 1.0.
    pub confidence: f64,
    /// Occurrences of contractor vocabulary. Diagnostic only.
    pub keyword_hits: usize,
}

impl ValidationReport {
    fn empty() -> Self {
        Self {
            name_match: NameMatchLevel::None,
            name_ratio: 0.0,
            license_match: false,
            phone_match: false,
            address_match: false,
            principal_match: false,
            raw_confidence: 0.0,
            confidence: 0.0,
            keyword_hits: 0,
        }
    }

    /// Number of factors that earned any credit.
    pub fn factors_matched(&self) -> usize {
        [
            self.name_match != NameMatchLevel::None,
            self.license_match,
            self.phone_match,
            self.address_match,
            self.principal_match,
        ]
        .into_iter()
        .filter(|m| *m)
        .count()
    }
}

/// Score `content` against the identity fields of `record`.
pub fn validate_identity(record: &BusinessRecord, content: &str) -> ValidationReport {
    if content.trim().is_empty() {
        return ValidationReport::empty();
    }

    let (name_match, name_ratio) = match_business_name(&record.business_name, content);
    let license_match = record
        .license_number
        .as_deref()
        .is_some_and(|l| match_license(l, content));
    let phone_match = record
        .phone
        .as_deref()
        .is_some_and(|p| match_phone(p, content));
    let address_match = record
        .address
        .as_deref()
        .is_some_and(|a| match_address(a, content));
    let principal_match = record
        .principal_name
        .as_deref()
        .is_some_and(|p| match_principal(p, content));

    let raw_confidence = name_match.points()
        + [license_match, phone_match, address_match, principal_match]
            .into_iter()
            .filter(|m| *m)
            .count() as f64
            * FACTOR_WEIGHT;

    ValidationReport {
        name_match,
        name_ratio,
        license_match,
        phone_match,
        address_match,
        principal_match,
        raw_confidence,
        confidence: raw_confidence.min(1.0),
        keyword_hits: count_keywords(content),
    }
}

/// Name tokens that can tell this business apart from a competitor.
pub fn distinctive_tokens(business_name: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for word in words(&simplify_name(business_name)) {
        if word.chars().count() < 3
            || STOP_WORDS.contains(&word.as_str())
            || GENERIC_TRADE_WORDS.contains(&word.as_str())
            || tokens.contains(&word)
        {
            continue;
        }
        tokens.push(word);
    }
    tokens
}

fn match_business_name(business_name: &str, content: &str) -> (NameMatchLevel, f64) {
    let cleaned = clean_name(business_name);
    if cleaned.is_empty() {
        return (NameMatchLevel::None, 0.0);
    }
    let content_clean = clean_name(content);
    if contains_word(&content_clean, &cleaned) {
        return (NameMatchLevel::Full, 1.0);
    }

    let tokens = distinctive_tokens(business_name);
    if tokens.is_empty() {
        return (NameMatchLevel::None, 0.0);
    }

    let content_words: HashSet<String> = words(content).into_iter().collect();
    let credit: f64 = tokens
        .iter()
        .map(|token| {
            if content_words.contains(token) {
                1.0
            } else if content_words
                .iter()
                .any(|w| w.len() > token.len() && w.contains(token.as_str()))
            {
                0.5
            } else {
                0.0
            }
        })
        .sum();
    let ratio = credit / tokens.len() as f64;

    if ratio >= FULL_NAME_RATIO {
        return (NameMatchLevel::Full, ratio);
    }

    let keyword_hits = tokens.iter().filter(|t| contains_word(content, t)).count();
    if keyword_hits > 0 && keyword_hits * 2 >= tokens.len() {
        (NameMatchLevel::Partial, ratio)
    } else {
        (NameMatchLevel::None, ratio)
    }
}

fn match_license(license: &str, content: &str) -> bool {
    static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)\b(?:license|lic|contractor)\b").expect("valid regex")
    });

    let wanted = alnum_only(license);
    if wanted.chars().count() < MIN_LICENSE_CHARS {
        return false;
    }

    if content
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '(' | ')' | ':'))
        .any(|token| alnum_only(token) == wanted)
    {
        return true;
    }

    // Labelled and formatted differently ("Lic #: ABC 123-45")
    LABEL_RE.find_iter(content).any(|label| {
        let window: String = content[label.end()..].chars().take(48).collect();
        let tail = alnum_only(&window);
        tail.starts_with(&wanted)
            || ["number", "num", "no"]
                .iter()
                .any(|prefix| tail.strip_prefix(prefix).is_some_and(|t| t.starts_with(&wanted)))
    })
}

fn match_phone(phone: &str, content: &str) -> bool {
    static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)\b(?:phone|tel|call|contact)\b[^0-9]{0,20}(\+?[0-9][0-9\s().\-]{8,24})")
            .expect("valid regex")
    });

    let digits = digits_only(phone);
    if digits.len() < MIN_PHONE_DIGITS {
        return false;
    }
    let wanted = &digits[digits.len() - MIN_PHONE_DIGITS..];

    // Per line, so unrelated numbers are never glued together
    if content.lines().any(|line| digits_only(line).contains(wanted)) {
        return true;
    }

    LABEL_RE
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .any(|m| digits_only(m.as_str()).contains(wanted))
}

fn match_address(address: &str, content: &str) -> bool {
    let components = words(address);
    if components.is_empty() {
        return false;
    }

    let content_words = words(content);
    if contains_phrase(&content_words, &components) {
        return true;
    }

    let street_number = components
        .first()
        .filter(|c| c.chars().all(|ch| ch.is_ascii_digit()));
    if street_number.is_some_and(|n| !content_words.contains(n)) {
        return false;
    }

    let present: HashSet<&str> = content_words.iter().map(String::as_str).collect();
    let matched = components
        .iter()
        .filter(|c| present.contains(c.as_str()))
        .count();
    matched as f64 / components.len() as f64 >= ADDRESS_COMPONENT_RATIO
}

fn match_principal(principal: &str, content: &str) -> bool {
    let cleaned = clean_name(principal);
    if cleaned.is_empty() {
        return false;
    }
    if contains_word(&clean_name(content), &cleaned) {
        return true;
    }
    words(principal)
        .iter()
        .filter(|t| t.chars().count() >= 3)
        .any(|t| contains_word(content, t))
}

fn count_keywords(content: &str) -> usize {
    let lower = content.to_lowercase();
    CONTRACTOR_KEYWORDS
        .iter()
        .map(|kw| lower.matches(kw).count())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_record() -> BusinessRecord {
        let mut record = BusinessRecord::new(1, "Acme Plumbing LLC");
        record.license_number = Some("ACMEPL*123QZ".into());
        record.phone = Some("(509) 555-1234".into());
        record.address = Some("1234 W Court St, Pasco, WA 99301".into());
        record.principal_name = Some("Jane Q Doe".into());
        record.city = Some("Pasco".into());
        record.state = Some("WA".into());
        record
    }

    const FULL_PAGE: &str = "Acme Plumbing LLC\n\
        Family owned plumbing since 1998. Owner: Jane Doe.\n\
        WA Contractor License: ACMEPL 123QZ\n\
        Call us: 509.555.1234\n\
        Visit 1234 W Court St, Pasco, WA 99301";

    #[test]
    fn all_factors_reach_maximum() {
        let report = validate_identity(&full_record(), FULL_PAGE);
        assert_eq!(report.name_match, NameMatchLevel::Full);
        assert!(report.license_match);
        assert!(report.phone_match);
        assert!(report.address_match);
        assert!(report.principal_match);
        assert_eq!(report.factors_matched(), 5);
        assert!((report.raw_confidence - 1.25).abs() < 1e-9);
        assert!((report.confidence - 1.0).abs() < 1e-9);
        assert!(report.keyword_hits >= 2);
    }

    #[test]
    fn no_factors_is_zero() {
        let report = validate_identity(
            &full_record(),
            "Welcome to Rivera Landscaping in Spokane. Lawn care and tree trimming.",
        );
        assert_eq!(report.factors_matched(), 0);
        assert_eq!(report.raw_confidence, 0.0);
        assert_eq!(report.confidence, 0.0);
    }

    #[test]
    fn empty_content_is_zero() {
        let report = validate_identity(&full_record(), "   \n ");
        assert_eq!(report.confidence, 0.0);
        assert_eq!(report.keyword_hits, 0);
    }

    #[test]
    fn competitor_site_does_not_match_name() {
        let mut record = BusinessRecord::new(2, "509 Heating & Cooling");
        record.city = Some("Yakima".into());
        record.state = Some("WA".into());

        let page = "Thermal Heating & Cooling\n\
            Serving Yakima and the Lower Valley with furnace and air conditioning repair.\n\
            Licensed, bonded and insured. Call (208) 555-0199.";

        let report = validate_identity(&record, page);
        assert_eq!(report.name_match, NameMatchLevel::None);
        assert_eq!(report.confidence, 0.0);
        assert_eq!(distinctive_tokens("509 Heating & Cooling"), vec!["509"]);
    }

    #[test]
    fn partial_name_from_keyword_pass() {
        let record = BusinessRecord::new(3, "Bluebird Summit Roofing");
        // "bluebird" whole word, "summit" absent: ratio 0.5, keyword pass 1 of 2
        let report = validate_identity(&record, "Bluebird roof repair crews");
        assert_eq!(report.name_match, NameMatchLevel::Partial);
        assert!((report.raw_confidence - PARTIAL_NAME_WEIGHT).abs() < 1e-9);
    }

    #[test]
    fn substring_tokens_earn_half_credit() {
        let record = BusinessRecord::new(4, "Star Gutter Pros");
        // Half credit each for "star" and "gutter", nothing for "pros"
        let (level, ratio) = match_business_name(&record.business_name, "Starlight guttering");
        assert_eq!(level, NameMatchLevel::None);
        assert!((ratio - (0.5 + 0.5) / 3.0).abs() < 1e-9);
    }

    #[test]
    fn license_needs_five_chars_and_label_pass_handles_spacing() {
        assert!(!match_license("AB-1", "License AB-1"));
        assert!(match_license("ACMEPL*123QZ", "Contractor license #: ACMEPL 123QZ"));
        assert!(match_license("acmepl123qz", "Our license: ACMEPL123QZ."));
        assert!(!match_license("ACMEPL*123QZ", "ACMEPL 999XX"));
        assert!(match_license("ABC12345", "Lic No. ABC-123-45"));
    }

    #[test]
    fn phone_matches_digit_stream_and_labels() {
        assert!(match_phone("509-555-1234", "Call 509.555.1234 today"));
        assert!(match_phone("1 (509) 555-1234", "Phone:\n(509)\n555-1234"));
        assert!(!match_phone("555-1234", "555-1234"));
        assert!(!match_phone("509-555-1234", "Suite 509\nZip 5551234"));
    }

    #[test]
    fn address_requires_street_number() {
        let address = "1234 W Court St, Pasco, WA 99301";
        assert!(match_address(address, "1234 W. Court St. Pasco WA 99301"));
        // Three of seven components plus number: below ratio
        assert!(!match_address(address, "1234 Pasco WA"));
        // Every other component but the street number
        assert!(!match_address(address, "W Court St Pasco WA 99301"));
    }

    #[test]
    fn principal_matches_any_long_token() {
        assert!(match_principal("Jane Q Doe", "Founded by Jane"));
        assert!(match_principal("Jane Q Doe", "JANE Q DOE, owner"));
        assert!(!match_principal("Al Wu", "Alberta Wulf"));
    }
}
