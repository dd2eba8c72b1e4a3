use crate::UrlError;
use url::Url;

/// Parses and normalizes an absolute URL string
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything that is not HTTP(S) or has no host
/// 3. Lowercase scheme and host, drop the default port (done by the parser)
/// 4. Remove the fragment
/// 5. Remove trailing slashes from the path (except for root `/`)
/// 6. Remove an empty query string (trailing `?`)
///
/// # Examples
///
/// ```
/// use link_ripple::url::normalize_url;
///
/// let url = normalize_url("HTTP://Example.COM:80/docs/#intro").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/docs");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    ensure_http(&url)?;
    Ok(normalize(&url))
}

/// Resolves an href against the page it was found on, then normalizes it
///
/// # Examples
///
/// ```
/// use link_ripple::url::resolve_link;
/// use url::Url;
///
/// let base = Url::parse("http://a.test/guide/intro").unwrap();
/// let url = resolve_link("../faq/", &base).unwrap();
/// assert_eq!(url.as_str(), "http://a.test/faq");
/// ```
pub fn resolve_link(href: &str, base: &Url) -> Result<Url, UrlError> {
    let url = base
        .join(href.trim())
        .map_err(|e| UrlError::Parse(e.to_string()))?;
    ensure_http(&url)?;
    Ok(normalize(&url))
}

/// Returns the canonical form of an already parsed URL
///
/// Normalizing twice yields the same URL, so the result can be used directly
/// as a deduplication key.
pub fn normalize(url: &Url) -> Url {
    let mut normalized = url.clone();
    normalized.set_fragment(None);

    let path = normalized.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        let canonical = if trimmed.is_empty() { "/" } else { trimmed }.to_string();
        normalized.set_path(&canonical);
    }

    if normalized.query() == Some("") {
        normalized.set_query(None);
    }

    normalized
}

fn ensure_http(url: &Url) -> Result<(), UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(UrlError::MissingDomain),
    }
}
