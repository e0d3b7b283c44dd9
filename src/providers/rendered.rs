use super::scrape::extract_rate;
use crate::core::rate::{FetchError, Rate, RateSource};
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, instrument, warn};

/// Placeholder in browser arguments that is replaced by the page URL.
pub const URL_PLACEHOLDER: &str = "{url}";

/// Headless browser flags used when none are configured.
pub fn default_browser_args() -> Vec<String> {
    [
        "--headless",
        "--disable-gpu",
        "--no-sandbox",
        "--disable-dev-shm-usage",
        "--disable-setuid-sandbox",
        "--dump-dom",
        URL_PLACEHOLDER,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Reads the rate from the DOM produced by a headless browser.
///
/// Every call launches its own browser process which is killed when the call
/// returns, whatever the outcome.
pub struct RenderedRateSource {
    url: String,
    selector: String,
    program: String,
    args: Vec<String>,
    timeout: Duration,
    live_sessions: Arc<AtomicUsize>,
}

impl RenderedRateSource {
    pub fn new(
        url: &str,
        selector: &str,
        program: &str,
        args: Vec<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            url: url.to_string(),
            selector: selector.to_string(),
            program: program.to_string(),
            args,
            timeout,
            live_sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of browser processes currently owned by this source.
    pub fn live_sessions(&self) -> usize {
        self.live_sessions.load(Ordering::SeqCst)
    }

    async fn render(&self) -> Result<String, FetchError> {
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace(URL_PLACEHOLDER, &self.url))
            .collect();
        let mut session = BrowserSession::launch(&self.program, &args, &self.live_sessions)?;

        match tokio::time::timeout(self.timeout, session.dump_dom()).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Render(format!(
                "Page did not render within {:?}",
                self.timeout
            ))),
        }
    }
}

#[async_trait]
impl RateSource for RenderedRateSource {
    #[instrument(name = "RenderedRateFetch", skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<Rate, FetchError> {
        let html = self.render().await?;
        let rate = extract_rate(&html, &self.selector).map_err(|e| match e {
            FetchError::FieldNotFound(selector) => {
                FetchError::Render(format!("Element {selector} not present in rendered page"))
            }
            other => other,
        })?;
        debug!(%rate, "Parsed rate from rendered page");
        Ok(rate)
    }
}

/// A running browser process. Dropping the session kills the process.
struct BrowserSession {
    child: Child,
    live: Arc<AtomicUsize>,
}

impl BrowserSession {
    fn launch(
        program: &str,
        args: &[String],
        live: &Arc<AtomicUsize>,
    ) -> Result<Self, FetchError> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| FetchError::Render(format!("Failed to launch browser {program}: {e}")))?;

        live.fetch_add(1, Ordering::SeqCst);
        debug!(pid = ?child.id(), "Browser session started");
        Ok(Self {
            child,
            live: Arc::clone(live),
        })
    }

    async fn dump_dom(&mut self) -> Result<String, FetchError> {
        let mut stdout = self
            .child
            .stdout
            .take()
            .ok_or_else(|| FetchError::Render("Browser stdout unavailable".to_string()))?;

        let mut html = String::new();
        stdout
            .read_to_string(&mut html)
            .await
            .map_err(|e| FetchError::Render(format!("Failed to read rendered page: {e}")))?;

        let status = self
            .child
            .wait()
            .await
            .map_err(|e| FetchError::Render(format!("Failed to wait for browser: {e}")))?;
        if !status.success() {
            return Err(FetchError::Render(format!("Browser exited with {status}")));
        }
        Ok(html)
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            if let Err(e) = self.child.start_kill() {
                warn!(error = %e, "Failed to kill browser session");
            }
        }
        self.live.fetch_sub(1, Ordering::SeqCst);
        debug!("Browser session released");
    }
}
