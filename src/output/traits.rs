//! Result sink trait and summary types

use crate::output::stats::StatsSnapshot;
use crate::output::OutputResult;
use crate::state::LinkVerdict;
use chrono::{DateTime, Utc};
use std::fmt;

/// Receiver of link verdicts
///
/// Sinks are shared by every worker and called concurrently, so
/// implementations serialize their own writes. Every verdict is delivered,
/// working links included; a sink decides what it keeps.
pub trait ResultSink: Send + Sync {
    /// Records one verdict
    fn record(&self, verdict: &LinkVerdict) -> OutputResult<()>;

    /// Flushes anything buffered; called once after the last verdict
    fn finish(&self) -> OutputResult<()> {
        Ok(())
    }
}

/// How a crawl ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlStatus {
    /// The frontier drained
    Completed,
    /// Stopped early by Ctrl-C or the duration limit
    Cancelled,
}

impl CrawlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// End-of-run report
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    // Run metadata
    pub seed: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: CrawlStatus,
    pub config_hash: String,
    pub fetcher: String,

    pub stats: StatsSnapshot,
}

impl CrawlSummary {
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }

    /// Share of checked links that are broken, as a percentage
    pub fn broken_rate(&self) -> f64 {
        if self.stats.links_checked == 0 {
            return 0.0;
        }
        (self.stats.links_broken as f64 / self.stats.links_checked as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn create_test_summary() -> CrawlSummary {
        CrawlSummary {
            seed: "http://a.test/".to_string(),
            started_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            finished_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 2, 30).unwrap(),
            status: CrawlStatus::Completed,
            config_hash: "abc123".to_string(),
            fetcher: "static".to_string(),
            stats: StatsSnapshot::default(),
        }
    }

    #[test]
    fn test_duration_seconds() {
        assert_eq!(create_test_summary().duration_seconds(), 150);
    }

    #[test]
    fn test_broken_rate() {
        let mut summary = create_test_summary();
        summary.stats.links_checked = 80;
        summary.stats.links_broken = 20;

        assert!((summary.broken_rate() - 25.0).abs() < 0.01);
    }

    #[test]
    fn test_broken_rate_no_links() {
        assert_eq!(create_test_summary().broken_rate(), 0.0);
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(CrawlStatus::Completed.to_string(), "completed");
        assert_eq!(CrawlStatus::Cancelled.as_str(), "cancelled");
    }
}
