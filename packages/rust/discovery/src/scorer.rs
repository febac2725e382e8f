//! Search confidence scoring for a single result snippet.
//!
//! A snippet alone never proves ownership, so the score tops out at
//! [`MAX_SEARCH_CONFIDENCE`].

use serde::Serialize;

use leadscout_shared::text::{
    CONTRACTOR_KEYWORDS, alnum_only, clean_name, contains_word, simplify_name, state_full_name,
};

use crate::policy::ExclusionPolicy;

/// Upper bound of any search-derived confidence.
pub const MAX_SEARCH_CONFIDENCE: f64 = 0.95;

/// One organic result from the web-search endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub link: String,
    pub title: String,
    pub snippet: String,
}

/// The business a result is scored against.
#[derive(Debug, Clone, Copy)]
pub struct SearchTarget<'a> {
    pub business_name: &'a str,
    pub city: Option<&'a str>,
    pub state: Option<&'a str>,
}

/// Where the business name matched, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NameMatch {
    ExactTitle,
    ExactSnippet,
    ExactUrl,
    SimplifiedTitle,
    SimplifiedSnippet,
    SimplifiedUrl,
    None,
}

impl NameMatch {
    pub fn points(self) -> f64 {
        match self {
            Self::ExactTitle => 0.4,
            Self::ExactSnippet => 0.3,
            Self::ExactUrl => 0.2,
            Self::SimplifiedTitle => 0.35,
            Self::SimplifiedSnippet => 0.25,
            Self::SimplifiedUrl => 0.15,
            Self::None => 0.0,
        }
    }
}

/// Per-rule contributions to a search score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreBreakdown {
    pub name: NameMatch,
    pub city: bool,
    pub state: bool,
    pub domain_ok: bool,
    pub keyword: Option<&'static str>,
    pub total: f64,
}

/// Score one search result against the target business, in `[0, 0.95]`.
pub fn score_search_result(
    hit: &SearchHit,
    target: &SearchTarget<'_>,
    policy: &ExclusionPolicy,
) -> f64 {
    score_breakdown(hit, target, policy).total
}

/// [`score_search_result`] with the contribution of each rule.
pub fn score_breakdown(
    hit: &SearchHit,
    target: &SearchTarget<'_>,
    policy: &ExclusionPolicy,
) -> ScoreBreakdown {
    let name = name_match(hit, target.business_name);

    let title_snippet = format!("{} {}", hit.title, hit.snippet);
    let city = target
        .city
        .is_some_and(|c| contains_word(&title_snippet, c));
    let state = target
        .state
        .is_some_and(|s| state_mentioned(&title_snippet, s));
    let domain_ok = policy.is_valid(&hit.link);

    let haystack = format!("{title_snippet} {}", hit.link).to_lowercase();
    let keyword = CONTRACTOR_KEYWORDS
        .iter()
        .find(|kw| haystack.contains(*kw))
        .copied();

    let mut total = name.points();
    if city {
        total += 0.2;
    }
    if state {
        total += 0.1;
    }
    if domain_ok {
        total += 0.1;
    }
    if keyword.is_some() {
        total += 0.1;
    }

    ScoreBreakdown {
        name,
        city,
        state,
        domain_ok,
        keyword,
        total: total.min(MAX_SEARCH_CONFIDENCE),
    }
}

fn name_match(hit: &SearchHit, business_name: &str) -> NameMatch {
    let exact = clean_name(business_name);
    if exact.is_empty() {
        return NameMatch::None;
    }
    let simplified = simplify_name(business_name);

    let title = clean_name(&hit.title);
    let snippet = clean_name(&hit.snippet);
    let url = alnum_only(&hit.link);

    if contains_word(&title, &exact) {
        NameMatch::ExactTitle
    } else if contains_word(&snippet, &exact) {
        NameMatch::ExactSnippet
    } else if url.contains(&alnum_only(&exact)) {
        NameMatch::ExactUrl
    } else if simplified.is_empty() {
        NameMatch::None
    } else if contains_word(&title, &simplified) {
        NameMatch::SimplifiedTitle
    } else if contains_word(&snippet, &simplified) {
        NameMatch::SimplifiedSnippet
    } else if url.contains(&alnum_only(&simplified)) {
        NameMatch::SimplifiedUrl
    } else {
        NameMatch::None
    }
}

/// State as an upper-case code (`WA`) or full name (`Washington`).
fn state_mentioned(text: &str, state: &str) -> bool {
    let state = state.trim();
    if state.is_empty() {
        return false;
    }

    // Codes like "OR" or "IN" are ordinary words in lower case
    if state.len() == 2 {
        let code = state.to_uppercase();
        if text
            .split(|c: char| !c.is_alphanumeric())
            .any(|token| token == code)
        {
            return true;
        }
    }

    match state_full_name(state) {
        Some(full) => contains_word(text, full),
        None => contains_word(text, state),
    }
}
