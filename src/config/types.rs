use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Link-Ripple
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Builds the immutable runtime settings for one crawl
    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig {
            max_retries: self.retry.max_retries,
            initial_timeout: Duration::from_millis(self.retry.initial_timeout_ms),
            max_timeout: Duration::from_millis(self.retry.max_timeout_ms),
            min_delay: Duration::from_millis(self.retry.min_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            max_workers: self.crawler.max_workers as usize,
            max_depth: self.crawler.max_depth,
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum depth to crawl from the seed URL
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Number of concurrent workers
    #[serde(rename = "max-workers", default = "default_max_workers")]
    pub max_workers: u32,

    /// Extra domain patterns treated as part of the seed's site
    /// (e.g., "docs.example.com" or "*.example.com")
    #[serde(rename = "allowed-domains", default)]
    pub allowed_domains: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_workers: default_max_workers(),
            allowed_domains: Vec::new(),
        }
    }
}

/// Retry and backoff configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Attempts per request (0 behaves like 1)
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Timeout of the first attempt (milliseconds)
    #[serde(rename = "initial-timeout-ms", default = "default_initial_timeout_ms")]
    pub initial_timeout_ms: u64,

    /// Upper bound for the doubled per-attempt timeout (milliseconds)
    #[serde(rename = "max-timeout-ms", default = "default_max_timeout_ms")]
    pub max_timeout_ms: u64,

    /// Lower bound of the randomized delay between attempts (milliseconds)
    #[serde(rename = "min-delay-ms", default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    /// Upper bound of the randomized delay between attempts (milliseconds)
    #[serde(rename = "max-delay-ms", default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_timeout_ms: default_initial_timeout_ms(),
            max_timeout_ms: default_max_timeout_ms(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url", default = "default_contact_url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email", default = "default_contact_email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: default_contact_url(),
            contact_email: default_contact_email(),
        }
    }
}

/// Which page fetching strategy to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchBackend {
    /// Plain HTTP requests
    #[default]
    Static,
    /// Headless Chromium rendering
    Browser,
}

/// Page fetcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    #[serde(default)]
    pub backend: FetchBackend,

    /// Chromium binary used by the browser backend
    #[serde(rename = "chrome-path", default = "default_chrome_path")]
    pub chrome_path: String,

    /// Maximum concurrent Chromium processes
    #[serde(rename = "max-browsers", default = "default_max_browsers")]
    pub max_browsers: u32,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            backend: FetchBackend::default(),
            chrome_path: default_chrome_path(),
            max_browsers: default_max_browsers(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the tab-separated broken link report
    #[serde(rename = "results-path", default = "default_results_path")]
    pub results_path: String,

    /// Path to the markdown summary file
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_path: default_results_path(),
            summary_path: None,
        }
    }
}

/// Immutable runtime settings shared by every component of one crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlConfig {
    pub max_retries: u32,
    pub initial_timeout: Duration,
    pub max_timeout: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub max_workers: usize,
    pub max_depth: u32,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Config::default().crawl_config()
    }
}

fn default_max_depth() -> u32 {
    3
}

fn default_max_workers() -> u32 {
    5
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_timeout_ms() -> u64 {
    20_000
}

fn default_max_timeout_ms() -> u64 {
    80_000
}

fn default_min_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    3_000
}

fn default_crawler_name() -> String {
    "link-ripple".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_contact_url() -> String {
    "https://github.com/link-ripple/link-ripple".to_string()
}

fn default_contact_email() -> String {
    "link-ripple@example.com".to_string()
}

fn default_chrome_path() -> String {
    std::env::var("CHROME_BIN").unwrap_or_else(|_| "chromium".to_string())
}

fn default_max_browsers() -> u32 {
    2
}

fn default_results_path() -> String {
    "broken_links.txt".to_string()
}
