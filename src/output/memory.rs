//! In-memory result sink

use crate::output::traits::ResultSink;
use crate::output::OutputResult;
use crate::state::LinkVerdict;
use std::sync::Mutex;

/// Keeps every verdict in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    verdicts: Mutex<Vec<LinkVerdict>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All verdicts recorded so far, in arrival order
    pub fn verdicts(&self) -> Vec<LinkVerdict> {
        self.verdicts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn broken(&self) -> Vec<LinkVerdict> {
        self.verdicts()
            .into_iter()
            .filter(LinkVerdict::is_broken)
            .collect()
    }
}

impl ResultSink for MemorySink {
    fn record(&self, verdict: &LinkVerdict) -> OutputResult<()> {
        self.verdicts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(verdict.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Classification;
    use url::Url;

    #[test]
    fn test_memory_sink_keeps_arrival_order() {
        let sink = MemorySink::new();
        let origin = Url::parse("http://a.test/").unwrap();

        sink.record(&LinkVerdict::new(origin.clone(), "http://a.test/ok", Classification::Ok))
            .unwrap();
        sink.record(&LinkVerdict::new(
            origin,
            "http://a.test/gone",
            Classification::BrokenStatus(410),
        ))
        .unwrap();
        sink.finish().unwrap();

        let targets: Vec<String> = sink.verdicts().into_iter().map(|v| v.target).collect();
        assert_eq!(targets, vec!["http://a.test/ok", "http://a.test/gone"]);
        assert_eq!(sink.broken().len(), 1);
        assert_eq!(sink.broken()[0].target, "http://a.test/gone");
    }
}
