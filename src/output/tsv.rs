//! Tab-separated broken link report
//!
//! One line per broken link:
//!
//! ```text
//! <origin URL>\t<target URL or href>\t<status code | error message>
//! ```
//!
//! Each line is flushed as soon as it is written, so an interrupted crawl
//! still leaves every result found so far on disk.
//!
//! Workers append through a short synchronous critical section. The lock is
//! never held across an `.await`, so concurrent producers cannot deadlock and
//! lines never interleave.

use crate::output::traits::ResultSink;
use crate::output::{OutputError, OutputResult};
use crate::state::LinkVerdict;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Writes broken verdicts to a results file
#[derive(Debug)]
pub struct TsvFileSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl TsvFileSink {
    /// Creates the results file, truncating any previous contents
    pub fn create(path: impl AsRef<Path>) -> OutputResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| {
            OutputError::Write(format!("cannot create {}: {}", path.display(), e))
        })?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for TsvFileSink {
    fn record(&self, verdict: &LinkVerdict) -> OutputResult<()> {
        let Some(line) = format_record(verdict) else {
            return Ok(());
        };

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| OutputError::Write("results writer poisoned".to_string()))?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }

    fn finish(&self) -> OutputResult<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| OutputError::Write("results writer poisoned".to_string()))?;
        writer.flush()?;
        Ok(())
    }
}

/// Formats a verdict as a results line, or `None` for working links
pub fn format_record(verdict: &LinkVerdict) -> Option<String> {
    let reason = verdict.classification.reason()?;
    Some(format!(
        "{}\t{}\t{}",
        sanitize(verdict.origin.as_str()),
        sanitize(&verdict.target),
        sanitize(&reason)
    ))
}

fn sanitize(field: &str) -> String {
    field.replace(['\t', '\n', '\r'], " ")
}
