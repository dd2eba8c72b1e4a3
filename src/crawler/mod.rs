//! Crawler module for fetching pages and checking links
//!
//! This module contains the core crawling logic, including:
//! - Fetch strategies (plain HTTP and headless browser rendering)
//! - Retry with randomized backoff around every request
//! - HTML link extraction
//! - The shared frontier and the worker pool driving the crawl

mod browser;
mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod retry;

pub use browser::ChromeFetcher;
pub use coordinator::{run_crawl, Coordinator};
pub use fetcher::{build_http_client, FetchError, FetchedPage, HttpFetcher, PageFetcher};
pub use frontier::{Frontier, WorkLease};
pub use parser::{ExtractError, ExtractedLinks, HtmlLinkExtractor, LinkExtractor};
pub use retry::{
    classify_attempt, AttemptOutcome, RequestKind, RetryController, Sleeper, TokioSleeper,
};
