//! HTML → plain text and link extraction.

use scraper::{Html, Node, Selector};
use url::Url;

/// Elements whose text never reaches the extracted output.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "svg", "iframe"];

/// Path fragments that mark a same-site page worth fetching after the homepage.
const KEY_PAGE_HINTS: &[&str] = &["contact", "about", "service", "team", "license"];

/// Strip scripts, styles and tags, returning one line per text node.
pub fn html_to_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut lines: Vec<String> = Vec::new();

    for node in doc.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }

        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !collapsed.is_empty() {
            lines.push(collapsed);
        }
    }

    lines.join("\n")
}

/// Extract all links from a document, resolved against the base URL.
pub fn extract_links(doc: &Html, base_url: &Url) -> Vec<String> {
    let link_sel = Selector::parse("a[href]").expect("anchor selector");
    let mut links = Vec::new();

    for el in doc.select(&link_sel) {
        if let Some(href) = el.value().attr("href") {
            // Skip anchors, javascript:, mailto:, tel:
            if href.starts_with('#')
                || href.starts_with("javascript:")
                || href.starts_with("mailto:")
                || href.starts_with("tel:")
            {
                continue;
            }

            if let Ok(mut resolved) = base_url.join(href) {
                resolved.set_fragment(None);
                let s = resolved.to_string();
                if !links.contains(&s) {
                    links.push(s);
                }
            }
        }
    }

    links
}

/// Same-host links that look like contact/about/services pages, best first.
pub fn key_page_links(links: &[String], home: &Url, limit: usize) -> Vec<Url> {
    let home_host = home.host_str().unwrap_or_default();
    let home_norm = normalize_url(home);
    let mut picked: Vec<Url> = Vec::new();

    for hint in KEY_PAGE_HINTS {
        for link in links {
            if picked.len() >= limit {
                return picked;
            }
            let Ok(url) = Url::parse(link) else { continue };
            if url.host_str().unwrap_or_default() != home_host
                || normalize_url(&url) == home_norm
                || picked.iter().any(|p| normalize_url(p) == normalize_url(&url))
            {
                continue;
            }
            if url.path().to_lowercase().contains(hint) {
                picked.push(url);
            }
        }
    }

    picked
}

/// Normalize a URL for deduplication (strip fragment and trailing slash).
pub fn normalize_url(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    let s = normalized.to_string();
    s.trim_end_matches('/').to_string()
}
