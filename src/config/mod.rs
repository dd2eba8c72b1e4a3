//! Configuration module for Link-Ripple
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section has defaults, so a crawl can run without any file at all.
//!
//! # Example
//!
//! ```no_run
//! use link_ripple::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("ripple.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlConfig, CrawlerConfig, FetchBackend, FetcherConfig, OutputConfig, RetryConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
