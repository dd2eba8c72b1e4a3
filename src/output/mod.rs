//! Output module for crawl results and reports
//!
//! This module handles:
//! - Streaming link verdicts to result sinks as they are produced
//! - Writing the broken-link results file
//! - Counting crawl statistics and rendering the end-of-run summary

mod markdown;
mod memory;
pub mod stats;
mod traits;
mod tsv;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use memory::MemorySink;
pub use stats::{print_summary, CrawlStatistics, StatsSnapshot};
pub use traits::{CrawlStatus, CrawlSummary, ResultSink};
pub use tsv::{format_record, TsvFileSink};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
