//! Retry and backoff around a single fetch strategy
//!
//! Every request the crawler makes goes through [`RetryController`]. It owns
//! the timing policy: per-attempt timeouts that double up to a cap, and a
//! random pause between attempts so a struggling server is not hammered.
//!
//! The controller is an explicit state machine:
//!
//! ```text
//! Attempting ──success──────────────▶ Succeeded
//!     │  ──4xx/5xx, render error─────▶ Rejected
//!     │  ──transient, last attempt───▶ ExhaustedFailed
//!     └──transient──▶ Backoff ──sleep──▶ Attempting
//!                        └──cancelled──▶ ExhaustedFailed
//! ```

use crate::config::CrawlConfig;
use crate::crawler::fetcher::{FetchError, FetchedPage, PageFetcher};
use crate::state::Broken;
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Something that can wait
///
/// Injected so tests can record backoff delays instead of waiting for them.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Which fetch strategy operation a request uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Full page download, for pages whose links will be extracted
    Page,
    /// Existence check for a discovered link
    Probe,
}

/// Outcome of one attempt, before retry policy is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success(FetchedPage),
    TransientFailure(FetchError),
    PermanentFailure(Broken),
}

/// Classifies the result of one fetch attempt
///
/// Statuses in [400, 599] are terminal. Any other status the strategy hands
/// back counts as success; redirects have already been followed by then.
pub fn classify_attempt(result: Result<FetchedPage, FetchError>) -> AttemptOutcome {
    match result {
        Ok(page) if (400..=599).contains(&page.status_code) => {
            AttemptOutcome::PermanentFailure(Broken::Status(page.status_code))
        }
        Ok(page) => AttemptOutcome::Success(page),
        Err(e) if e.is_transient() => AttemptOutcome::TransientFailure(e),
        Err(e) => AttemptOutcome::PermanentFailure(Broken::Error(e.to_string())),
    }
}

enum RetryState {
    Attempting {
        attempt: u32,
        timeout: Duration,
    },
    Backoff {
        next_attempt: u32,
        timeout: Duration,
        cause: FetchError,
    },
    Succeeded(FetchedPage),
    Rejected(Broken),
    ExhaustedFailed(FetchError),
}

/// Bounded retries with randomized backoff
pub struct RetryController {
    settings: CrawlConfig,
    fetcher: Arc<dyn PageFetcher>,
    sleeper: Arc<dyn Sleeper>,
    cancel: CancellationToken,
}

impl RetryController {
    pub fn new(settings: CrawlConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            settings,
            fetcher,
            sleeper: Arc::new(TokioSleeper),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Abandons backoff pauses once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Total attempts per request; a zero retry budget still makes one attempt
    pub fn max_attempts(&self) -> u32 {
        self.settings.max_retries.max(1)
    }

    /// Fetches `url`, retrying transient failures
    ///
    /// # Returns
    ///
    /// The page on success, or the terminal reason it is broken. When every
    /// attempt fails transiently, the last cause is reported.
    pub async fn fetch_with_retry(
        &self,
        url: &Url,
        kind: RequestKind,
    ) -> Result<FetchedPage, Broken> {
        let max_attempts = self.max_attempts();
        let mut state = RetryState::Attempting {
            attempt: 1,
            timeout: self.settings.initial_timeout,
        };

        loop {
            state = match state {
                RetryState::Attempting { attempt, timeout } => {
                    let result = match kind {
                        RequestKind::Page => self.fetcher.fetch(url, timeout).await,
                        RequestKind::Probe => self.fetcher.probe(url, timeout).await,
                    };

                    match classify_attempt(result) {
                        AttemptOutcome::Success(page) => RetryState::Succeeded(page),
                        AttemptOutcome::PermanentFailure(broken) => RetryState::Rejected(broken),
                        AttemptOutcome::TransientFailure(cause) if attempt < max_attempts => {
                            tracing::warn!(
                                "Attempt {}/{} for {} failed: {}",
                                attempt,
                                max_attempts,
                                url,
                                cause
                            );
                            RetryState::Backoff {
                                next_attempt: attempt + 1,
                                timeout: self.next_timeout(timeout),
                                cause,
                            }
                        }
                        AttemptOutcome::TransientFailure(cause) => {
                            RetryState::ExhaustedFailed(cause)
                        }
                    }
                }
                RetryState::Backoff {
                    next_attempt,
                    timeout,
                    cause,
                } => {
                    let delay = self.backoff_delay();
                    tracing::debug!("Waiting {:?} before retrying {}", delay, url);

                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => RetryState::ExhaustedFailed(cause),
                        _ = self.sleeper.sleep(delay) => RetryState::Attempting {
                            attempt: next_attempt,
                            timeout,
                        },
                    }
                }
                RetryState::Succeeded(page) => return Ok(page),
                RetryState::Rejected(broken) => return Err(broken),
                RetryState::ExhaustedFailed(cause) => {
                    tracing::debug!("Giving up on {}: {}", url, cause);
                    return Err(Broken::Error(cause.to_string()));
                }
            };
        }
    }

    /// A pause drawn uniformly from the configured delay range
    pub fn backoff_delay(&self) -> Duration {
        let min = self.settings.min_delay.as_millis() as u64;
        let max = self.settings.max_delay.as_millis() as u64;
        if min >= max {
            return self.settings.min_delay;
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }

    fn next_timeout(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.settings.max_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted results and records the timeout of every call
    struct ScriptedFetcher {
        script: Mutex<VecDeque<Result<FetchedPage, FetchError>>>,
        fetch_timeouts: Mutex<Vec<Duration>>,
        probe_calls: Mutex<u32>,
    }

    impl ScriptedFetcher {
        fn new(script: Vec<Result<FetchedPage, FetchError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                fetch_timeouts: Mutex::new(Vec::new()),
                probe_calls: Mutex::new(0),
            })
        }

        fn next(&self) -> Result<FetchedPage, FetchError> {
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("fetcher called more often than scripted")
        }

        fn calls(&self) -> usize {
            self.fetch_timeouts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch(&self, _url: &Url, timeout: Duration) -> Result<FetchedPage, FetchError> {
            self.fetch_timeouts.lock().unwrap().push(timeout);
            self.next()
        }

        async fn probe(&self, _url: &Url, _timeout: Duration) -> Result<FetchedPage, FetchError> {
            *self.probe_calls.lock().unwrap() += 1;
            self.next()
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().unwrap().push(duration);
        }
    }

    fn create_test_settings(max_retries: u32) -> CrawlConfig {
        CrawlConfig {
            max_retries,
            initial_timeout: Duration::from_secs(20),
            max_timeout: Duration::from_secs(50),
            min_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(3000),
            ..CrawlConfig::default()
        }
    }

    fn page(status_code: u16) -> Result<FetchedPage, FetchError> {
        Ok(FetchedPage {
            status_code,
            final_url: Url::parse("http://a.test/").unwrap(),
            body: String::new(),
        })
    }

    fn timeout() -> Result<FetchedPage, FetchError> {
        Err(FetchError::Timeout(Duration::from_secs(20)))
    }

    fn url() -> Url {
        Url::parse("http://a.test/").unwrap()
    }

    fn controller(
        max_retries: u32,
        fetcher: Arc<ScriptedFetcher>,
        sleeper: Arc<RecordingSleeper>,
    ) -> RetryController {
        RetryController::new(create_test_settings(max_retries), fetcher).with_sleeper(sleeper)
    }

    #[test]
    fn test_classify_attempt() {
        assert!(matches!(
            classify_attempt(page(200)),
            AttemptOutcome::Success(_)
        ));
        assert!(matches!(
            classify_attempt(page(399)),
            AttemptOutcome::Success(_)
        ));
        assert_eq!(
            classify_attempt(page(400)),
            AttemptOutcome::PermanentFailure(Broken::Status(400))
        );
        assert_eq!(
            classify_attempt(page(599)),
            AttemptOutcome::PermanentFailure(Broken::Status(599))
        );
        assert!(matches!(
            classify_attempt(timeout()),
            AttemptOutcome::TransientFailure(_)
        ));
        assert_eq!(
            classify_attempt(Err(FetchError::PageNotFound("ERR_FILE_NOT_FOUND".into()))),
            AttemptOutcome::PermanentFailure(Broken::Error(
                "page not found: ERR_FILE_NOT_FOUND".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_success_after_transient_failures() {
        let fetcher = ScriptedFetcher::new(vec![
            timeout(),
            Err(FetchError::ConnectionFailed("reset".into())),
            page(200),
        ]);
        let sleeper = Arc::new(RecordingSleeper::default());

        let result = controller(3, fetcher.clone(), sleeper.clone())
            .fetch_with_retry(&url(), RequestKind::Page)
            .await;

        assert_eq!(result.unwrap().status_code, 200);
        assert_eq!(fetcher.calls(), 3);
        assert_eq!(sleeper.delays.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_error_status_is_not_retried() {
        let fetcher = ScriptedFetcher::new(vec![page(404)]);
        let sleeper = Arc::new(RecordingSleeper::default());

        let result = controller(3, fetcher.clone(), sleeper.clone())
            .fetch_with_retry(&url(), RequestKind::Page)
            .await;

        assert_eq!(result, Err(Broken::Status(404)));
        assert_eq!(fetcher.calls(), 1);
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_render_failure_is_not_retried() {
        let fetcher = ScriptedFetcher::new(vec![Err(FetchError::Render("blank".into()))]);
        let sleeper = Arc::new(RecordingSleeper::default());

        let result = controller(3, fetcher.clone(), sleeper)
            .fetch_with_retry(&url(), RequestKind::Page)
            .await;

        assert_eq!(
            result,
            Err(Broken::Error("rendering failed: blank".to_string()))
        );
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_last_cause() {
        let fetcher = ScriptedFetcher::new(vec![
            timeout(),
            timeout(),
            Err(FetchError::ConnectionFailed("dns error".into())),
        ]);
        let sleeper = Arc::new(RecordingSleeper::default());

        let result = controller(3, fetcher.clone(), sleeper.clone())
            .fetch_with_retry(&url(), RequestKind::Page)
            .await;

        assert_eq!(
            result,
            Err(Broken::Error("connection failed: dns error".to_string()))
        );
        assert_eq!(sleeper.delays.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_timeout_doubles_up_to_cap() {
        let fetcher = ScriptedFetcher::new(vec![timeout(), timeout(), timeout(), timeout()]);
        let sleeper = Arc::new(RecordingSleeper::default());

        let _ = controller(4, fetcher.clone(), sleeper)
            .fetch_with_retry(&url(), RequestKind::Page)
            .await;

        assert_eq!(
            *fetcher.fetch_timeouts.lock().unwrap(),
            vec![
                Duration::from_secs(20),
                Duration::from_secs(40),
                Duration::from_secs(50),
                Duration::from_secs(50),
            ]
        );
    }

    #[tokio::test]
    async fn test_zero_retries_still_attempts_once() {
        let fetcher = ScriptedFetcher::new(vec![timeout()]);
        let sleeper = Arc::new(RecordingSleeper::default());

        let ctl = controller(0, fetcher.clone(), sleeper.clone());
        assert_eq!(ctl.max_attempts(), 1);

        let result = ctl.fetch_with_retry(&url(), RequestKind::Page).await;
        assert!(matches!(result, Err(Broken::Error(_))));
        assert_eq!(fetcher.calls(), 1);
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delays_stay_within_bounds() {
        let fetcher = ScriptedFetcher::new(vec![timeout(); 10]);
        let sleeper = Arc::new(RecordingSleeper::default());

        let _ = controller(10, fetcher, sleeper.clone())
            .fetch_with_retry(&url(), RequestKind::Page)
            .await;

        let delays = sleeper.delays.lock().unwrap();
        assert_eq!(delays.len(), 9);
        for delay in delays.iter() {
            assert!(*delay >= Duration::from_millis(1000));
            assert!(*delay <= Duration::from_millis(3000));
        }
    }

    #[tokio::test]
    async fn test_probe_kind_uses_probe() {
        let fetcher = ScriptedFetcher::new(vec![page(204)]);
        let sleeper = Arc::new(RecordingSleeper::default());

        let result = controller(3, fetcher.clone(), sleeper)
            .fetch_with_retry(&url(), RequestKind::Probe)
            .await;

        assert!(result.is_ok());
        assert_eq!(*fetcher.probe_calls.lock().unwrap(), 1);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_abandons_backoff() {
        let fetcher = ScriptedFetcher::new(vec![timeout(), page(200)]);
        let sleeper = Arc::new(RecordingSleeper::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = controller(3, fetcher.clone(), sleeper)
            .with_cancellation(cancel)
            .fetch_with_retry(&url(), RequestKind::Page)
            .await;

        assert_eq!(
            result,
            Err(Broken::Error("request timed out after 20s".to_string()))
        );
        assert_eq!(fetcher.calls(), 1);
    }

    #[test]
    fn test_fixed_delay_when_range_is_empty() {
        let settings = CrawlConfig {
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(500),
            ..CrawlConfig::default()
        };
        let ctl = RetryController::new(settings, ScriptedFetcher::new(vec![]));
        assert_eq!(ctl.backoff_delay(), Duration::from_millis(500));
    }
}
