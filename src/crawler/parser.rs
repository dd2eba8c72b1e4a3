//! HTML link extraction
//!
//! This module turns a page body into the hyperlinks the crawler checks:
//! - `<a href="...">` targets, resolved against the page URL and normalized
//! - Hrefs that cannot be turned into a URL at all, kept verbatim so they can
//!   be reported as broken

use crate::url::resolve_link;
use crate::UrlError;
use scraper::{Html, Selector};
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

/// Schemes that never point at a checkable page
const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Links found on one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedLinks {
    /// Normalized absolute URLs, first occurrence order, without duplicates
    pub links: Vec<Url>,

    /// Raw hrefs that could not be resolved into an HTTP(S) URL, trimmed and
    /// without duplicates
    pub invalid: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid selector: {0}")]
    Selector(String),

    #[error("could not parse page: {0}")]
    Parse(String),
}

/// Finds the hyperlinks in a fetched page
pub trait LinkExtractor: Send + Sync {
    fn extract_links(&self, body: &str, base_url: &Url) -> Result<ExtractedLinks, ExtractError>;
}

/// Extracts anchor links with `scraper`
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document, `rel="nofollow"` included
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - Empty and fragment-only hrefs (same page anchors)
/// - `javascript:`, `mailto:`, `tel:` links and data URIs
/// - Any other non-HTTP(S) scheme after resolution
///
/// # Example
///
/// ```
/// use link_ripple::crawler::{HtmlLinkExtractor, LinkExtractor};
/// use url::Url;
///
/// let html = r#"<html><body><a href="/page/">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let found = HtmlLinkExtractor.extract_links(html, &base_url).unwrap();
/// assert_eq!(found.links[0].as_str(), "https://example.com/page");
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlLinkExtractor;

impl LinkExtractor for HtmlLinkExtractor {
    fn extract_links(&self, body: &str, base_url: &Url) -> Result<ExtractedLinks, ExtractError> {
        let selector =
            Selector::parse("a[href]").map_err(|e| ExtractError::Selector(e.to_string()))?;
        let document = Html::parse_document(body);

        let mut found = ExtractedLinks::default();
        let mut seen = HashSet::new();
        let mut seen_invalid = HashSet::new();

        for element in document.select(&selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            let Some(href) = element.value().attr("href") else {
                continue;
            };

            match classify_href(href, base_url) {
                Href::Link(url) => {
                    if seen.insert(url.as_str().to_string()) {
                        found.links.push(url);
                    }
                }
                Href::Invalid => {
                    let href = href.trim();
                    if seen_invalid.insert(href.to_string()) {
                        found.invalid.push(href.to_string());
                    }
                }
                Href::Skipped => {}
            }
        }

        Ok(found)
    }
}

enum Href {
    Link(Url),
    Invalid,
    Skipped,
}

fn classify_href(href: &str, base_url: &Url) -> Href {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return Href::Skipped;
    }

    let lowered = href.to_ascii_lowercase();
    if SKIPPED_SCHEMES.iter().any(|scheme| lowered.starts_with(scheme)) {
        return Href::Skipped;
    }

    match resolve_link(href, base_url) {
        Ok(url) => Href::Link(url),
        Err(UrlError::InvalidScheme(_)) => Href::Skipped,
        Err(UrlError::Parse(_)) | Err(UrlError::MissingDomain) => Href::Invalid,
    }
}
