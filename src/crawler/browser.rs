//! Browser-rendering fetch strategy
//!
//! Pages are rendered by a headless Chromium process (`--dump-dom`) so links
//! inserted by JavaScript are visible to the extractor. Each render is a
//! separate process, so the number of concurrent renders is capped by a
//! semaphore. Link probes do not need rendering and go through plain HTTP.

use crate::config::{FetcherConfig, UserAgentConfig};
use crate::crawler::fetcher::{FetchError, FetchedPage, HttpFetcher, PageFetcher};
use crate::RippleError;
use async_trait::async_trait;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Semaphore;
use url::Url;

/// How long `--version` may take before the browser counts as unavailable
const LAUNCH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Markers of Chromium's built-in network error page
const ERROR_PAGE_MARKERS: &[&str] = &["id=\"main-frame-error\"", "class=\"neterror\""];

pub struct ChromeFetcher {
    chrome_path: String,
    user_agent: String,
    semaphore: Semaphore,
    http: HttpFetcher,
}

impl ChromeFetcher {
    /// Verifies the Chromium binary runs, then builds the fetcher
    ///
    /// An unusable browser is a startup error: the crawl must not begin with
    /// a strategy that would fail every page.
    pub async fn launch(
        config: &FetcherConfig,
        user_agent: &UserAgentConfig,
    ) -> Result<Self, RippleError> {
        let version = chrome_version(&config.chrome_path).await?;
        tracing::info!(
            "Using {} (max concurrent renders: {})",
            version,
            config.max_browsers
        );

        Ok(Self {
            chrome_path: config.chrome_path.clone(),
            user_agent: user_agent.header_value(),
            semaphore: Semaphore::new(config.max_browsers as usize),
            http: HttpFetcher::new(user_agent)?,
        })
    }

    async fn render(&self, url: &Url, timeout: Duration) -> Result<Output, FetchError> {
        let mut command = Command::new(&self.chrome_path);
        command
            .args([
                "--headless",
                "--disable-gpu",
                "--no-sandbox",
                "--disable-dev-shm-usage",
                "--window-size=1920,1080",
            ])
            .arg(format!("--user-agent={}", self.user_agent))
            .arg("--dump-dom")
            .arg(url.as_str())
            .kill_on_drop(true);

        match tokio::time::timeout(timeout, command.output()).await {
            Err(_) => Err(FetchError::Timeout(timeout)),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::WouldBlock => {
                // fork/resource exhaustion clears up once other renders exit
                Err(FetchError::ConnectionFailed(format!(
                    "could not start Chromium: {}",
                    e
                )))
            }
            Ok(Err(e)) => Err(FetchError::Other(format!("could not start Chromium: {}", e))),
            Ok(Ok(output)) => Ok(output),
        }
    }
}

#[async_trait]
impl PageFetcher for ChromeFetcher {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchedPage, FetchError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| FetchError::Other("browser pool closed".to_string()))?;

        let output = self.render(url, timeout).await?;
        interpret_dump(
            url,
            output.status.success(),
            &String::from_utf8_lossy(&output.stdout),
            &String::from_utf8_lossy(&output.stderr),
            timeout,
        )
    }

    async fn probe(&self, url: &Url, timeout: Duration) -> Result<FetchedPage, FetchError> {
        self.http.probe(url, timeout).await
    }

    fn name(&self) -> &str {
        "browser"
    }
}

async fn chrome_version(chrome_path: &str) -> Result<String, RippleError> {
    let output = tokio::time::timeout(
        LAUNCH_CHECK_TIMEOUT,
        Command::new(chrome_path)
            .arg("--version")
            .kill_on_drop(true)
            .output(),
    )
    .await
    .map_err(|_| {
        RippleError::Startup(format!(
            "Chromium at '{}' did not answer --version within {:?}",
            chrome_path, LAUNCH_CHECK_TIMEOUT
        ))
    })?
    .map_err(|e| RippleError::Startup(format!("Cannot run Chromium at '{}': {}", chrome_path, e)))?;

    if !output.status.success() {
        return Err(RippleError::Startup(format!(
            "Chromium at '{}' exited with {}",
            chrome_path, output.status
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Turns the result of one `--dump-dom` run into a fetch outcome
///
/// Chromium reports no HTTP status. A rendered document counts as 200; network
/// failures are recognized by their `net::ERR_*` code, either in the error
/// page Chromium renders or on stderr.
fn interpret_dump(
    url: &Url,
    success: bool,
    stdout: &str,
    stderr: &str,
    timeout: Duration,
) -> Result<FetchedPage, FetchError> {
    let error_page = ERROR_PAGE_MARKERS.iter().any(|m| stdout.contains(m));
    let code = if error_page {
        find_net_error(stdout)
    } else {
        None
    }
    .or_else(|| find_net_error(stderr));

    if let Some(code) = code {
        return Err(net_error(code, url, timeout));
    }

    if error_page {
        return Err(FetchError::Render(format!(
            "Chromium showed an error page for {}",
            url
        )));
    }

    if !success {
        let detail = stderr.lines().next().unwrap_or("").trim();
        return Err(FetchError::Render(format!(
            "Chromium exited with an error: {}",
            detail
        )));
    }

    if stdout.trim().is_empty() {
        return Err(FetchError::Render(
            "browser returned an empty document".to_string(),
        ));
    }

    Ok(FetchedPage {
        status_code: 200,
        final_url: url.clone(),
        body: stdout.to_string(),
    })
}

/// Finds the first `ERR_*` code in Chromium output
fn find_net_error(text: &str) -> Option<&str> {
    let start = text.find("ERR_")?;
    let rest = &text[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'))
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

fn net_error(code: &str, url: &Url, timeout: Duration) -> FetchError {
    match code {
        "ERR_TIMED_OUT" | "ERR_CONNECTION_TIMED_OUT" => FetchError::Timeout(timeout),
        "ERR_NAME_NOT_RESOLVED"
        | "ERR_CONNECTION_REFUSED"
        | "ERR_CONNECTION_RESET"
        | "ERR_CONNECTION_CLOSED"
        | "ERR_CONNECTION_FAILED"
        | "ERR_ADDRESS_UNREACHABLE"
        | "ERR_INTERNET_DISCONNECTED"
        | "ERR_NETWORK_CHANGED" => FetchError::ConnectionFailed(format!("{} ({})", code, url)),
        "ERR_FILE_NOT_FOUND" | "ERR_HTTP_RESPONSE_CODE_FAILURE" | "ERR_INVALID_URL" => {
            FetchError::PageNotFound(format!("{} ({})", code, url))
        }
        other => FetchError::Other(format!("{} ({})", other, url)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn url() -> Url {
        Url::parse("http://a.test/app").unwrap()
    }

    #[test]
    fn test_rendered_document_is_success() {
        let page = interpret_dump(
            &url(),
            true,
            "<html><body><a href=\"/x\">x</a></body></html>",
            "",
            TIMEOUT,
        )
        .unwrap();

        assert_eq!(page.status_code, 200);
        assert_eq!(page.final_url, url());
        assert!(page.body.contains("href"));
    }

    #[test]
    fn test_empty_document_is_render_failure() {
        let err = interpret_dump(&url(), true, "  \n", "", TIMEOUT).unwrap_err();
        assert!(matches!(err, FetchError::Render(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_error_page_dns_failure_is_transient() {
        let dom = r#"<html><body class="neterror"><div id="main-frame-error">
            <div class="error-code">ERR_NAME_NOT_RESOLVED</div></div></body></html>"#;
        let err = interpret_dump(&url(), true, dom, "", TIMEOUT).unwrap_err();
        assert!(matches!(err, FetchError::ConnectionFailed(_)));
    }

    #[test]
    fn test_stderr_timeout() {
        let err = interpret_dump(
            &url(),
            false,
            "",
            "[0101/000000.0:ERROR] net::ERR_TIMED_OUT loading page",
            TIMEOUT,
        )
        .unwrap_err();
        assert_eq!(err, FetchError::Timeout(TIMEOUT));
    }

    #[test]
    fn test_response_code_failure_is_page_not_found() {
        let err = interpret_dump(
            &url(),
            false,
            "",
            "net::ERR_HTTP_RESPONSE_CODE_FAILURE",
            TIMEOUT,
        )
        .unwrap_err();
        assert!(matches!(err, FetchError::PageNotFound(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_page_text_mentioning_error_codes_is_not_an_error() {
        let dom = "<html><body><p>Chrome shows ERR_CONNECTION_REFUSED when...</p></body></html>";
        assert!(interpret_dump(&url(), true, dom, "", TIMEOUT).is_ok());
    }

    #[test]
    fn test_crash_without_code() {
        let err = interpret_dump(&url(), false, "", "Segmentation fault\nmore", TIMEOUT)
            .unwrap_err();
        assert_eq!(
            err,
            FetchError::Render("Chromium exited with an error: Segmentation fault".to_string())
        );
    }

    #[test]
    fn test_find_net_error() {
        assert_eq!(
            find_net_error("net::ERR_CONNECTION_RESET at x"),
            Some("ERR_CONNECTION_RESET")
        );
        assert_eq!(find_net_error("all good"), None);
    }

    #[tokio::test]
    async fn test_missing_binary_is_startup_error() {
        let config = FetcherConfig {
            chrome_path: "/nonexistent/chromium-for-tests".to_string(),
            ..FetcherConfig::default()
        };

        let result = ChromeFetcher::launch(&config, &UserAgentConfig::default()).await;
        assert!(matches!(result, Err(RippleError::Startup(_))));
    }
}
