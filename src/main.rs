//! Link-Ripple main entry point
//!
//! This is the command-line interface for the Link-Ripple broken link auditor.

use anyhow::Context;
use clap::Parser;
use link_ripple::config::{load_config_with_hash, validate, Config, FetchBackend};
use link_ripple::crawler::run_crawl;
use link_ripple::output::print_summary;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Link-Ripple: a broken link auditor
///
/// Link-Ripple crawls a website from a seed URL up to a bounded depth, checks
/// every hyperlink it finds, and writes the broken ones to a tab-separated
/// results file.
#[derive(Parser, Debug)]
#[command(name = "link-ripple")]
#[command(version)]
#[command(about = "A broken link auditor", long_about = None)]
struct Cli {
    /// URL the crawl starts from
    #[arg(value_name = "SEED_URL")]
    seed: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Results file for broken links
    #[arg(short, long, value_name = "PATH")]
    output: Option<String>,

    /// Markdown summary file
    #[arg(long, value_name = "PATH")]
    summary: Option<String>,

    /// Render pages with headless Chromium
    #[arg(long)]
    browser: bool,

    /// Maximum link depth from the seed page
    #[arg(long, value_name = "N")]
    max_depth: Option<u32>,

    /// Number of concurrent workers
    #[arg(short, long, value_name = "N")]
    workers: Option<u32>,

    /// Stop the crawl after this many seconds
    #[arg(long, value_name = "SECONDS")]
    max_duration: Option<u64>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the effective settings without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("invalid configuration in {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, hash)
        }
        None => (Config::default(), "defaults".to_string()),
    };

    apply_overrides(&mut config, &cli);
    validate(&config).context("invalid command-line settings")?;

    if cli.dry_run {
        handle_dry_run(&cli.seed, &config, &config_hash)?;
        return Ok(());
    }

    handle_crawl(&cli, config, config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("link_ripple=info,warn"),
            1 => EnvFilter::new("link_ripple=debug,info"),
            2 => EnvFilter::new("link_ripple=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Command-line flags win over the configuration file
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(depth) = cli.max_depth {
        config.crawler.max_depth = depth;
    }
    if let Some(workers) = cli.workers {
        config.crawler.max_workers = workers;
    }
    if cli.browser {
        config.fetcher.backend = FetchBackend::Browser;
    }
    if let Some(output) = &cli.output {
        config.output.results_path = output.clone();
    }
    if let Some(summary) = &cli.summary {
        config.output.summary_path = Some(summary.clone());
    }
}

/// Handles the --dry-run mode: validates the seed and shows the settings
fn handle_dry_run(seed: &str, config: &Config, config_hash: &str) -> anyhow::Result<()> {
    let seed = link_ripple::normalize_url(seed).context("invalid seed URL")?;

    println!("=== Link-Ripple Dry Run ===\n");

    println!("Seed: {}", seed);
    println!("Config hash: {}", config_hash);

    println!("\nCrawler:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Workers: {}", config.crawler.max_workers);
    if config.crawler.allowed_domains.is_empty() {
        println!("  Allowed domains: (seed host only)");
    } else {
        println!("  Allowed domains:");
        for pattern in &config.crawler.allowed_domains {
            println!("    - {}", pattern);
        }
    }

    println!("\nRetry:");
    println!("  Max retries: {}", config.retry.max_retries);
    println!(
        "  Timeout: {}ms doubling up to {}ms",
        config.retry.initial_timeout_ms, config.retry.max_timeout_ms
    );
    println!(
        "  Delay between attempts: {}-{}ms",
        config.retry.min_delay_ms, config.retry.max_delay_ms
    );

    println!("\nFetcher:");
    match config.fetcher.backend {
        FetchBackend::Static => println!("  Backend: static"),
        FetchBackend::Browser => {
            println!("  Backend: browser");
            println!("  Chromium: {}", config.fetcher.chrome_path);
            println!("  Max browsers: {}", config.fetcher.max_browsers);
        }
    }
    println!("  User agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Results: {}", config.output.results_path);
    if let Some(summary) = &config.output.summary_path {
        println!("  Summary: {}", summary);
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(cli: &Cli, config: Config, config_hash: String) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();

    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing in-flight requests");
            on_interrupt.cancel();
        }
    });

    if let Some(seconds) = cli.max_duration {
        let on_deadline = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(seconds)).await;
            tracing::warn!("Time limit of {}s reached, stopping crawl", seconds);
            on_deadline.cancel();
        });
    }

    let summary = run_crawl(&config, &cli.seed, &config_hash, cancel)
        .await
        .context("crawl could not start")?;

    if !cli.quiet {
        print_summary(&summary);
    }

    tracing::info!(
        "Broken links written to {}",
        config.output.results_path
    );

    Ok(())
}
