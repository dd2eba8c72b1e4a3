//! Markdown summary generation
//!
//! This module renders the end-of-run summary as a markdown report, written
//! next to the results file when a summary path is configured.

use crate::output::traits::CrawlSummary;
use crate::output::OutputResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Reasons listed in the report before the rest are folded into one line
const MAX_REASONS: usize = 20;

/// Writes the markdown summary to `output_path`
///
/// # Arguments
///
/// * `summary` - The crawl summary data
/// * `output_path` - Path where the markdown file should be written
pub fn generate_markdown_summary(summary: &CrawlSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl summary as markdown
pub fn format_markdown_summary(summary: &CrawlSummary) -> String {
    let stats = &summary.stats;
    let mut md = String::new();

    md.push_str("# Link-Ripple Crawl Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Seed**: {}\n", summary.seed));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", summary.finished_at.to_rfc3339()));
    let duration = summary.duration_seconds();
    md.push_str(&format!(
        "- **Duration**: {} seconds ({:.2} minutes)\n",
        duration,
        duration as f64 / 60.0
    ));
    md.push_str(&format!("- **Status**: {}\n", summary.status));
    md.push_str(&format!("- **Fetcher**: {}\n", summary.fetcher));
    md.push_str(&format!("- **Config Hash**: {}\n\n", summary.config_hash));

    md.push_str("## Pages\n\n");
    md.push_str("| Outcome | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Crawled | {} |\n", stats.pages_crawled));
    md.push_str(&format!("| Failed | {} |\n", stats.pages_failed));
    md.push_str(&format!(
        "| Enqueued from links | {} |\n\n",
        stats.children_enqueued
    ));

    md.push_str("## Links\n\n");
    md.push_str("| Outcome | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Checked | {} |\n", stats.links_checked));
    md.push_str(&format!("| OK | {} |\n", stats.links_ok));
    md.push_str(&format!("| Broken | {} |\n", stats.links_broken));
    md.push_str(&format!("| Invalid | {} |\n", stats.links_invalid));
    md.push_str(&format!("| Off-site | {} |\n\n", stats.links_off_site));
    md.push_str(&format!(
        "Broken rate: {:.2}%\n\n",
        summary.broken_rate()
    ));

    if !stats.reasons.is_empty() {
        md.push_str("## Broken Links by Reason\n\n");
        md.push_str("| Reason | Count |\n");
        md.push_str("|--------|-------|\n");

        for (reason, count) in stats.reasons.iter().take(MAX_REASONS) {
            md.push_str(&format!("| {} | {} |\n", reason.replace('|', "\\|"), count));
        }
        if stats.reasons.len() > MAX_REASONS {
            let rest: u64 = stats.reasons[MAX_REASONS..].iter().map(|(_, c)| c).sum();
            md.push_str(&format!("| (other) | {} |\n", rest));
        }
        md.push('\n');
    }

    md
}
