//! Query and name-variant generation for discovery strategies.

use leadscout_shared::BusinessRecord;
use leadscout_shared::text::simplify_name;

/// General web-search variants, most specific first, deduplicated.
pub fn general_queries(record: &BusinessRecord, max_queries: usize) -> Vec<String> {
    let name = record.business_name.trim();
    let simplified = simplify_name(name);
    let city = record.city.as_deref().unwrap_or_default().trim();
    let state = record.state.as_deref().unwrap_or_default().trim();

    let candidates = [
        format!("{name} {city} {state}"),
        format!("{simplified} {city} {state}"),
        format!("{simplified} {state}"),
        format!("\"{name}\" contractor {state}"),
        format!("{simplified} contractor"),
    ];

    dedup(candidates, max_queries)
}

/// Quoted exact-name query aimed at knowledge-panel style results.
pub fn exact_match_query(record: &BusinessRecord) -> Option<String> {
    let name = record.business_name.trim();
    if name.is_empty() {
        return None;
    }
    let city = record.city.as_deref().unwrap_or_default();
    let state = record.state.as_deref().unwrap_or_default();
    Some(squash(&format!("\"{name}\" {city} {state}")))
}

/// Location-scoped query aimed at local-business results.
pub fn local_pack_query(record: &BusinessRecord) -> Option<String> {
    let name = record.business_name.trim();
    let city = record.city.as_deref().unwrap_or_default().trim();
    if name.is_empty() || city.is_empty() {
        return None;
    }
    let state = record.state.as_deref().unwrap_or_default();
    Some(squash(&format!("{name} {city} {state} local business")))
}

/// Name variants tried against the company directory.
///
/// Full name, suffix-stripped name, then its first three and first two
/// words. Variants shorter than three characters are dropped.
pub fn directory_name_variants(business_name: &str) -> Vec<String> {
    let full = business_name.trim().to_string();
    let simplified = simplify_name(business_name);
    let words: Vec<&str> = simplified.split_whitespace().collect();

    let mut candidates = vec![full, simplified.clone()];
    if words.len() > 3 {
        candidates.push(words[..3].join(" "));
    }
    if words.len() > 2 {
        candidates.push(words[..2].join(" "));
    }

    dedup(candidates, usize::MAX)
        .into_iter()
        .filter(|v| v.chars().count() >= 3)
        .collect()
}

fn squash(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn dedup(candidates: impl IntoIterator<Item = String>, limit: usize) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();
    for candidate in candidates {
        let squashed = squash(&candidate);
        if squashed.is_empty() || squashed == "\"\"" {
            continue;
        }
        let key = squashed.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        out.push(squashed);
        if out.len() >= limit {
            break;
        }
    }
    out
}
