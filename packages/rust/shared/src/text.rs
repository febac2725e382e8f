//! Text normalisation shared by the search scorer and the identity validator.

/// Legal-entity suffixes stripped when simplifying a business name.
pub const LEGAL_SUFFIXES: &[&str] = &[
    "llc", "l l c", "inc", "incorporated", "corp", "corporation", "co", "company", "ltd",
    "limited", "pllc", "llp", "lp", "pc",
];

/// Contractor-service vocabulary used for scoring bonuses and diagnostics.
pub const CONTRACTOR_KEYWORDS: &[&str] = &[
    "contractor",
    "construction",
    "plumbing",
    "plumber",
    "electrical",
    "electrician",
    "roofing",
    "roofer",
    "hvac",
    "heating",
    "cooling",
    "remodeling",
    "renovation",
    "handyman",
    "painting",
    "flooring",
    "gutter",
    "siding",
    "landscaping",
    "concrete",
    "excavation",
    "septic",
    "drywall",
    "carpentry",
    "cabinets",
    "windows",
    "fencing",
    "builder",
];

/// Lowercase and collapse every run of whitespace to one space.
pub fn collapse_lower(s: &str) -> String {
    s.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercase, replace punctuation with spaces, collapse whitespace.
///
/// `&` becomes `and` so "Heating & Cooling" and "Heating and Cooling" agree.
pub fn clean_name(name: &str) -> String {
    let replaced: String = name
        .to_lowercase()
        .replace('&', " and ")
        .replace('\'', "")
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    collapse_lower(&replaced)
}

/// [`clean_name`] with legal-entity suffix words removed.
pub fn simplify_name(name: &str) -> String {
    let mut cleaned = format!(" {} ", clean_name(name));
    // Multi-word suffixes first ("l l c")
    let mut suffixes: Vec<&str> = LEGAL_SUFFIXES.to_vec();
    suffixes.sort_by_key(|s| std::cmp::Reverse(s.len()));
    for suffix in suffixes {
        let needle = format!(" {suffix} ");
        while cleaned.contains(&needle) {
            cleaned = cleaned.replace(&needle, " ");
        }
    }
    collapse_lower(&cleaned)
}

/// Lowercase alphanumerics only.
pub fn alnum_only(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// ASCII digits only.
pub fn digits_only(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

/// Split into lowercase alphanumeric words.
pub fn words(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Case-insensitive whole-word (or whole-phrase) match.
pub fn contains_word(haystack: &str, word: &str) -> bool {
    contains_phrase(&words(haystack), &words(word))
}

/// Whether `phrase` occurs as a contiguous run of `haystack` words.
///
/// Both sides come from [`words`]; callers matching many phrases against one
/// text split it once.
pub fn contains_phrase(haystack: &[String], phrase: &[String]) -> bool {
    !phrase.is_empty() && haystack.windows(phrase.len()).any(|w| w == phrase)
}

/// The first `max_chars` characters of `s`, on a char boundary.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

const US_STATES: &[(&str, &str)] = &[
    ("AL", "Alabama"),
    ("AK", "Alaska"),
    ("AZ", "Arizona"),
    ("AR", "Arkansas"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DE", "Delaware"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("HI", "Hawaii"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("IA", "Iowa"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("ME", "Maine"),
    ("MD", "Maryland"),
    ("MA", "Massachusetts"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MS", "Mississippi"),
    ("MO", "Missouri"),
    ("MT", "Montana"),
    ("NE", "Nebraska"),
    ("NV", "Nevada"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NY", "New York"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VT", "Vermont"),
    ("VA", "Virginia"),
    ("WA", "Washington"),
    ("WV", "West Virginia"),
    ("WI", "Wisconsin"),
    ("WY", "Wyoming"),
    ("DC", "District of Columbia"),
];

/// Full US state name for a two-letter code (or the name itself).
pub fn state_full_name(state: &str) -> Option<&'static str> {
    let state = state.trim();
    US_STATES
        .iter()
        .find(|(abbr, name)| abbr.eq_ignore_ascii_case(state) || name.eq_ignore_ascii_case(state))
        .map(|(_, name)| *name)
}
