//! Crawler coordinator - the worker pool
//!
//! This module runs a crawl from a seed URL to completion:
//! - Seeding the frontier
//! - Running a fixed number of workers that fetch, extract and probe
//! - Streaming every link verdict to the result sink
//! - Feeding working same-site links back into the frontier
//! - Producing the end-of-run summary

use crate::config::{Config, CrawlConfig, FetchBackend};
use crate::crawler::browser::ChromeFetcher;
use crate::crawler::fetcher::{FetchedPage, HttpFetcher, PageFetcher};
use crate::crawler::frontier::Frontier;
use crate::crawler::parser::{ExtractedLinks, HtmlLinkExtractor, LinkExtractor};
use crate::crawler::retry::{RequestKind, RetryController, Sleeper, TokioSleeper};
use crate::output::{
    generate_markdown_summary, CrawlStatistics, CrawlStatus, CrawlSummary, ResultSink,
    TsvFileSink,
};
use crate::state::{Classification, LinkVerdict, WorkItem};
use crate::url::{normalize, normalize_url, SiteScope};
use crate::{RippleError, UrlError};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Progress is logged every this many crawled pages
const PROGRESS_INTERVAL: u64 = 10;

/// Main crawler coordinator structure
pub struct Coordinator {
    settings: CrawlConfig,
    seed: Url,
    scope: SiteScope,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn LinkExtractor>,
    sink: Arc<dyn ResultSink>,
    sleeper: Arc<dyn Sleeper>,
    cancel: CancellationToken,
    config_hash: String,
}

/// State shared by the workers of one crawl
struct CrawlContext {
    max_depth: u32,
    scope: SiteScope,
    frontier: Frontier,
    retry: RetryController,
    extractor: Arc<dyn LinkExtractor>,
    sink: Arc<dyn ResultSink>,
    stats: CrawlStatistics,
    cancel: CancellationToken,
    /// Probe results by normalized target; one probe per target per crawl
    probes: Mutex<HashMap<String, Arc<OnceCell<Classification>>>>,
}

impl Coordinator {
    /// Creates a new coordinator
    ///
    /// # Arguments
    ///
    /// * `settings` - Timing, depth and concurrency settings
    /// * `seed` - The URL the crawl starts from
    /// * `allowed_domains` - Extra host patterns treated as same-site
    /// * `fetcher` - The fetch strategy
    /// * `sink` - Receives every link verdict
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(RippleError)` - The seed is not an absolute HTTP(S) URL
    pub fn new(
        settings: CrawlConfig,
        seed: &str,
        allowed_domains: &[String],
        fetcher: Arc<dyn PageFetcher>,
        sink: Arc<dyn ResultSink>,
    ) -> Result<Self, RippleError> {
        let seed = normalize_url(seed)?;
        let scope = SiteScope::new(&seed, allowed_domains).ok_or(UrlError::MissingDomain)?;

        Ok(Self {
            settings,
            seed,
            scope,
            fetcher,
            extractor: Arc::new(HtmlLinkExtractor),
            sink,
            sleeper: Arc::new(TokioSleeper),
            cancel: CancellationToken::new(),
            config_hash: String::new(),
        })
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn LinkExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Stops the crawl early when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_config_hash(mut self, config_hash: impl Into<String>) -> Self {
        self.config_hash = config_hash.into();
        self
    }

    /// Runs the crawl until the frontier drains or the crawl is cancelled
    ///
    /// All workers are joined before the summary is produced.
    pub async fn run(self) -> CrawlSummary {
        let started_at = Utc::now();
        let workers = self.settings.max_workers.max(1);
        let fetcher_name = self.fetcher.name().to_string();

        tracing::info!(
            "Starting crawl of {} (max depth {}, {} workers, {} fetcher)",
            self.seed,
            self.settings.max_depth,
            workers,
            fetcher_name
        );

        let retry = RetryController::new(self.settings, self.fetcher)
            .with_sleeper(self.sleeper)
            .with_cancellation(self.cancel.clone());

        let context = Arc::new(CrawlContext {
            max_depth: self.settings.max_depth,
            scope: self.scope,
            frontier: Frontier::new(self.settings.max_depth, self.cancel.clone()),
            retry,
            extractor: self.extractor,
            sink: self.sink,
            stats: CrawlStatistics::new(),
            cancel: self.cancel.clone(),
            probes: Mutex::new(HashMap::new()),
        });

        context.frontier.try_enqueue(WorkItem::seed(self.seed.clone()));

        let mut pool = JoinSet::new();
        for id in 0..workers {
            let context = context.clone();
            pool.spawn(async move { context.work(id).await });
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task failed: {}", e);
            }
        }

        if let Err(e) = context.sink.finish() {
            tracing::error!("Failed to finish results output: {}", e);
        }

        let status = if self.cancel.is_cancelled() {
            CrawlStatus::Cancelled
        } else {
            CrawlStatus::Completed
        };
        let stats = context.stats.snapshot();

        tracing::info!(
            "Crawl {}: {} pages crawled, {} links checked, {} broken",
            status,
            stats.pages_crawled,
            stats.links_checked,
            stats.links_broken
        );

        CrawlSummary {
            seed: self.seed.to_string(),
            started_at,
            finished_at: Utc::now(),
            status,
            config_hash: self.config_hash,
            fetcher: fetcher_name,
            stats,
        }
    }
}

impl CrawlContext {
    async fn work(&self, id: usize) {
        tracing::debug!("Worker {} started", id);
        while let Some(lease) = self.frontier.dequeue().await {
            self.process(lease.item()).await;
        }
        tracing::debug!("Worker {} finished", id);
    }

    /// Processes a single page
    ///
    /// This method:
    /// 1. Fetches the page through the retry controller
    /// 2. Extracts its links, unless a redirect led off-site
    /// 3. Probes every link and records a verdict for it
    /// 4. Enqueues working same-site links one level deeper
    async fn process(&self, item: &WorkItem) {
        tracing::debug!("Processing {} (depth {})", item.url(), item.depth());

        let page = match self.retry.fetch_with_retry(item.url(), RequestKind::Page).await {
            Ok(page) => page,
            Err(broken) => {
                self.stats.page_failed();
                self.emit(LinkVerdict::new(
                    item.origin().clone(),
                    item.url().as_str(),
                    broken.into(),
                ));
                return;
            }
        };

        let crawled = self.stats.page_crawled();
        if crawled % PROGRESS_INTERVAL == 0 {
            tracing::info!(
                "Progress: {} pages crawled, {} in frontier",
                crawled,
                self.frontier.pending()
            );
        }

        if !self.scope.contains(&page.final_url) {
            tracing::debug!(
                "{} redirected off-site to {}, not extracting links",
                item.url(),
                page.final_url
            );
            return;
        }

        let extracted = match self.extract(page).await {
            Ok(extracted) => extracted,
            Err(message) => {
                tracing::error!("Link extraction failed for {}: {}", item.url(), message);
                self.emit(LinkVerdict::new(
                    item.origin().clone(),
                    item.url().as_str(),
                    Classification::BrokenError(message),
                ));
                return;
            }
        };

        for href in extracted.invalid {
            self.stats.invalid_link();
            self.emit(LinkVerdict::new(
                item.url().clone(),
                href,
                Classification::BrokenError("invalid URL".to_string()),
            ));
        }

        let mut seen = HashSet::new();
        for link in extracted.links {
            let link = normalize(&link);
            if !seen.insert(link.as_str().to_string()) {
                continue;
            }

            if self.cancel.is_cancelled() {
                tracing::debug!("Crawl cancelled, skipping remaining links of {}", item.url());
                break;
            }

            let same_site = self.scope.contains(&link);
            if !same_site {
                self.stats.off_site_link();
            }

            let classification = self.probe(&link).await;
            self.emit(LinkVerdict::new(
                item.url().clone(),
                link.as_str(),
                classification.clone(),
            ));

            if classification.is_ok()
                && same_site
                && item.depth() < self.max_depth
                && self.frontier.try_enqueue(item.child(link))
            {
                self.stats.child_enqueued();
            }
        }
    }

    /// Runs the extractor off the async workers
    ///
    /// Extractor errors and panics are returned as a message.
    async fn extract(&self, page: FetchedPage) -> Result<ExtractedLinks, String> {
        let extractor = self.extractor.clone();
        let FetchedPage {
            body, final_url, ..
        } = page;

        match tokio::task::spawn_blocking(move || extractor.extract_links(&body, &final_url)).await
        {
            Ok(Ok(extracted)) => Ok(extracted),
            Ok(Err(e)) => Err(format!("link extraction failed: {}", e)),
            Err(e) if e.is_panic() => Err("link extraction panicked".to_string()),
            Err(e) => Err(format!("link extraction aborted: {}", e)),
        }
    }

    /// Classifies a link, probing it at most once per crawl
    async fn probe(&self, link: &Url) -> Classification {
        let cell = {
            let mut probes = self
                .probes
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            probes.entry(link.as_str().to_string()).or_default().clone()
        };

        cell.get_or_init(|| async {
            match self.retry.fetch_with_retry(link, RequestKind::Probe).await {
                Ok(_) => Classification::Ok,
                Err(broken) => broken.into(),
            }
        })
        .await
        .clone()
    }

    fn emit(&self, verdict: LinkVerdict) {
        if verdict.is_broken() {
            tracing::warn!(
                "Broken link on {}: {} ({})",
                verdict.origin,
                verdict.target,
                verdict.classification
            );
        }

        self.stats.record_verdict(&verdict);
        if let Err(e) = self.sink.record(&verdict) {
            tracing::error!("Failed to record result for {}: {}", verdict.target, e);
        }
    }
}

/// Runs a complete crawl from configuration
///
/// This function:
/// 1. Validates the seed URL
/// 2. Builds the configured fetch strategy (checking the browser if needed)
/// 3. Creates the results file
/// 4. Runs the worker pool to completion or cancellation
/// 5. Writes the markdown summary when a summary path is configured
///
/// Everything that can go wrong before the first fetch is returned as an
/// error; nothing after that is.
///
/// # Example
///
/// ```no_run
/// use link_ripple::config::load_config;
/// use link_ripple::crawler::run_crawl;
/// use std::path::Path;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let summary = run_crawl(&config, "https://example.com/", "", CancellationToken::new()).await?;
/// println!("{} broken links", summary.stats.links_broken);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: &Config,
    seed: &str,
    config_hash: &str,
    cancel: CancellationToken,
) -> Result<CrawlSummary, RippleError> {
    let seed_url = normalize_url(seed)?;

    let fetcher: Arc<dyn PageFetcher> = match config.fetcher.backend {
        FetchBackend::Static => Arc::new(HttpFetcher::new(&config.user_agent)?),
        FetchBackend::Browser => {
            Arc::new(ChromeFetcher::launch(&config.fetcher, &config.user_agent).await?)
        }
    };

    let sink = Arc::new(TsvFileSink::create(&config.output.results_path)?);
    tracing::info!("Writing broken links to {}", sink.path().display());

    let summary = Coordinator::new(
        config.crawl_config(),
        seed_url.as_str(),
        &config.crawler.allowed_domains,
        fetcher,
        sink,
    )?
    .with_cancellation(cancel)
    .with_config_hash(config_hash)
    .run()
    .await;

    if let Some(summary_path) = &config.output.summary_path {
        generate_markdown_summary(&summary, Path::new(summary_path))?;
        tracing::info!("Summary written to {}", summary_path);
    }

    Ok(summary)
}
