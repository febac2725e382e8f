//! Domain exclusion policy for discovery candidates.
//!
//! Social networks, directories, review aggregators, search engines,
//! government and news sites are never a business's own website.

use leadscout_shared::ExclusionsConfig;
use url::Url;

const EXCLUDED_DOMAINS: &[&str] = &[
    // Social
    "facebook.com",
    "linkedin.com",
    "instagram.com",
    "twitter.com",
    "x.com",
    "youtube.com",
    "tiktok.com",
    "pinterest.com",
    "nextdoor.com",
    // Directories and review aggregators
    "yelp.com",
    "yellowpages.com",
    "whitepages.com",
    "bbb.org",
    "angi.com",
    "angieslist.com",
    "homeadvisor.com",
    "thumbtack.com",
    "houzz.com",
    "porch.com",
    "buildzoom.com",
    "manta.com",
    "mapquest.com",
    "chamberofcommerce.com",
    "bizapedia.com",
    "opencorporates.com",
    "dnb.com",
    "zoominfo.com",
    "directories.com",
    "superpages.com",
    "networx.com",
    // Search engines
    "google.com",
    "bing.com",
    "yahoo.com",
    "duckduckgo.com",
    // Industry associations
    "phccwa.org",
    "phccnational.org",
    "neca.org",
    "nrca.net",
    "abc.org",
    "nahb.org",
    "nari.org",
    // News
    "patch.com",
    "seattletimes.com",
    "bizjournals.com",
];

const EXCLUDED_PATHS: &[&str] = &[
    "/news/",
    "/business-licenses",
    "/business-license/",
    "/directory/",
    "/listing/",
    "/biz/",
    "/profile/",
];

const EXCLUDED_TLD_SUFFIXES: &[&str] = &[".gov", ".org", ".codes", ".edu", ".mil"];

/// Why a URL was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    Unparseable,
    Scheme(String),
    Domain(String),
    Path(String),
    Tld(String),
}

impl std::fmt::Display for Exclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unparseable => f.write_str("unparseable URL"),
            Self::Scheme(s) => write!(f, "unsupported scheme {s}"),
            Self::Domain(d) => write!(f, "excluded domain {d}"),
            Self::Path(p) => write!(f, "excluded path {p}"),
            Self::Tld(t) => write!(f, "excluded TLD {t}"),
        }
    }
}

/// Allow/deny rules applied to every candidate URL.
#[derive(Debug, Clone)]
pub struct ExclusionPolicy {
    domains: Vec<String>,
    paths: Vec<String>,
    tld_suffixes: Vec<String>,
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self {
            domains: EXCLUDED_DOMAINS.iter().map(|s| s.to_string()).collect(),
            paths: EXCLUDED_PATHS.iter().map(|s| s.to_string()).collect(),
            tld_suffixes: EXCLUDED_TLD_SUFFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ExclusionPolicy {
    /// Built-in rules plus the `[exclusions]` additions.
    pub fn from_config(config: &ExclusionsConfig) -> Self {
        let mut policy = Self::default();
        policy
            .domains
            .extend(config.domains.iter().map(|d| d.trim().to_lowercase()));
        policy
            .paths
            .extend(config.paths.iter().map(|p| p.trim().to_lowercase()));
        policy
    }

    /// `Ok(())` if `url` may be a business's own website.
    pub fn check(&self, url: &str) -> Result<(), Exclusion> {
        let parsed = Url::parse(url.trim()).map_err(|_| Exclusion::Unparseable)?;

        match parsed.scheme() {
            "http" | "https" => {}
            other => return Err(Exclusion::Scheme(other.to_string())),
        }

        let host = parsed
            .host_str()
            .ok_or(Exclusion::Unparseable)?
            .trim_end_matches('.')
            .to_lowercase();

        if let Some(domain) = self
            .domains
            .iter()
            .find(|d| host == **d || host.ends_with(&format!(".{d}")))
        {
            return Err(Exclusion::Domain(domain.clone()));
        }

        if let Some(tld) = self.tld_suffixes.iter().find(|t| host.ends_with(t.as_str())) {
            return Err(Exclusion::Tld(tld.clone()));
        }

        let path = parsed.path().to_lowercase();
        if let Some(p) = self.paths.iter().find(|p| path.contains(p.as_str())) {
            return Err(Exclusion::Path(p.clone()));
        }

        Ok(())
    }

    pub fn is_valid(&self, url: &str) -> bool {
        self.check(url).is_ok()
    }
}
