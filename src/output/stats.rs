//! Crawl statistics
//!
//! Counters are updated by every worker while the crawl runs and read once at
//! the end through [`CrawlStatistics::snapshot`].

use crate::output::traits::CrawlSummary;
use crate::state::{Classification, LinkVerdict};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Live counters for one crawl
#[derive(Debug, Default)]
pub struct CrawlStatistics {
    pages_crawled: AtomicU64,
    pages_failed: AtomicU64,
    links_checked: AtomicU64,
    links_ok: AtomicU64,
    links_broken: AtomicU64,
    links_invalid: AtomicU64,
    links_off_site: AtomicU64,
    children_enqueued: AtomicU64,
    reasons: Mutex<HashMap<String, u64>>,
}

/// Point-in-time copy of [`CrawlStatistics`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Pages fetched successfully and scanned for links
    pub pages_crawled: u64,

    /// Pages whose own fetch failed
    pub pages_failed: u64,

    /// Verdicts produced, one per (origin, target) pair
    pub links_checked: u64,
    pub links_ok: u64,
    pub links_broken: u64,

    /// Hrefs that could not be turned into a URL
    pub links_invalid: u64,

    /// Checked links outside the crawl scope
    pub links_off_site: u64,
    pub children_enqueued: u64,

    /// Broken verdicts by reason category, most frequent first
    pub reasons: Vec<(String, u64)>,
}

impl CrawlStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of pages crawled so far, this one included
    pub fn page_crawled(&self) -> u64 {
        self.pages_crawled.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn page_failed(&self) {
        self.pages_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn invalid_link(&self) {
        self.links_invalid.fetch_add(1, Ordering::Relaxed);
    }

    pub fn off_site_link(&self) {
        self.links_off_site.fetch_add(1, Ordering::Relaxed);
    }

    pub fn child_enqueued(&self) {
        self.children_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one verdict
    pub fn record_verdict(&self, verdict: &LinkVerdict) {
        self.links_checked.fetch_add(1, Ordering::Relaxed);

        if verdict.classification.is_ok() {
            self.links_ok.fetch_add(1, Ordering::Relaxed);
            return;
        }

        self.links_broken.fetch_add(1, Ordering::Relaxed);
        let category = reason_category(&verdict.classification);
        let mut reasons = self
            .reasons
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *reasons.entry(category).or_insert(0) += 1;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let mut reasons: Vec<(String, u64)> = self
            .reasons
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(reason, count)| (reason.clone(), *count))
            .collect();
        reasons.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        StatsSnapshot {
            pages_crawled: self.pages_crawled.load(Ordering::Relaxed),
            pages_failed: self.pages_failed.load(Ordering::Relaxed),
            links_checked: self.links_checked.load(Ordering::Relaxed),
            links_ok: self.links_ok.load(Ordering::Relaxed),
            links_broken: self.links_broken.load(Ordering::Relaxed),
            links_invalid: self.links_invalid.load(Ordering::Relaxed),
            links_off_site: self.links_off_site.load(Ordering::Relaxed),
            children_enqueued: self.children_enqueued.load(Ordering::Relaxed),
            reasons,
        }
    }
}

/// Groups broken reasons so the histogram stays small
///
/// Statuses are kept as-is; error messages are cut at their first `:` so
/// per-URL details do not create one bucket per link.
fn reason_category(classification: &Classification) -> String {
    match classification {
        Classification::Ok => "ok".to_string(),
        Classification::BrokenStatus(code) => format!("HTTP {}", code),
        Classification::BrokenError(message) => message
            .split(':')
            .next()
            .unwrap_or(message)
            .trim()
            .to_string(),
    }
}

/// Prints the end-of-run summary to stdout
pub fn print_summary(summary: &CrawlSummary) {
    let stats = &summary.stats;

    println!("=== Crawl Summary ===\n");

    println!("Run:");
    println!("  Seed: {}", summary.seed);
    println!("  Status: {}", summary.status);
    println!("  Fetcher: {}", summary.fetcher);
    println!("  Duration: {} seconds", summary.duration_seconds());
    println!();

    println!("Pages:");
    println!("  Crawled: {}", stats.pages_crawled);
    println!("  Failed: {}", stats.pages_failed);
    println!();

    println!("Links:");
    println!("  Checked: {}", stats.links_checked);
    println!("  OK: {}", stats.links_ok);
    println!("  Broken: {}", stats.links_broken);
    println!("  Invalid: {}", stats.links_invalid);
    println!("  Off-site: {}", stats.links_off_site);
    println!();

    if !stats.reasons.is_empty() {
        println!("Broken Links by Reason:");
        for (reason, count) in &stats.reasons {
            println!("  {}: {}", reason, count);
        }
        println!();
    }

    println!(
        "Broken Rate: {:.1}% ({} / {} links)",
        summary.broken_rate(),
        stats.links_broken,
        stats.links_checked
    );
}
