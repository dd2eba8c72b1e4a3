//! Page fetching strategies
//!
//! This module defines the single "fetch page" capability the crawl engine
//! depends on, and its plain HTTP implementation:
//! - Building HTTP clients with proper user agent strings
//! - GET requests to fetch page content
//! - HEAD requests to check that a link exists
//! - Error classification into the kinds the retry controller understands
//!
//! The browser-rendering implementation lives in `crawler::browser`.

use crate::config::UserAgentConfig;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum number of redirects followed before giving up
const MAX_REDIRECTS: usize = 10;

/// A page as returned by a fetch strategy
///
/// `body` is empty for probes and for error statuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// HTTP status code
    pub status_code: u16,
    /// Final URL after redirects
    pub final_url: Url,
    /// Page body content
    pub body: String,
}

/// Why a single fetch attempt produced no response
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("page not found: {0}")]
    PageNotFound(String),

    #[error("rendering failed: {0}")]
    Render(String),

    #[error("{0}")]
    Other(String),
}

impl FetchError {
    /// Returns true for network-level failures that a later attempt may not hit
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::ConnectionFailed(_))
    }
}

/// The capability of retrieving a page
///
/// Implementations must be cheap to share between workers; the crawl engine
/// holds one instance behind an `Arc` for the whole crawl.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the full page body
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchedPage, FetchError>;

    /// Checks that a link resolves, without needing its body
    async fn probe(&self, url: &Url, timeout: Duration) -> Result<FetchedPage, FetchError> {
        self.fetch(url, timeout).await
    }

    fn name(&self) -> &str;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use link_ripple::config::UserAgentConfig;
/// use link_ripple::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Static fetch strategy backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(config)?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(e, timeout))?;

        let status_code = response.status().as_u16();
        let final_url = response.url().clone();

        // Error pages are never parsed, so their bodies are not downloaded
        if status_code >= 400 {
            return Ok(FetchedPage {
                status_code,
                final_url,
                body: String::new(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_error(e, timeout))?;

        Ok(FetchedPage {
            status_code,
            final_url,
            body,
        })
    }

    async fn probe(&self, url: &Url, timeout: Duration) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .head(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(e, timeout))?;

        let status = response.status();
        // Some servers refuse HEAD outright but serve GET
        if matches!(
            status,
            StatusCode::FORBIDDEN | StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
        ) {
            tracing::trace!("HEAD answered {} for {}, falling back to GET", status, url);
            return self.fetch(url, timeout).await;
        }

        Ok(FetchedPage {
            status_code: status.as_u16(),
            final_url: response.url().clone(),
            body: String::new(),
        })
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Maps a reqwest error onto the fetch error kinds
fn classify_error(error: reqwest::Error, timeout: Duration) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(timeout)
    } else if error.is_redirect() {
        FetchError::Other(format!("too many redirects: {}", error))
    } else if error.is_connect() || error.is_request() || error.is_body() {
        FetchError::ConnectionFailed(error.to_string())
    } else {
        FetchError::Other(error.to_string())
    }
}
