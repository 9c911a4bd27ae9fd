pub mod chromium;
#[cfg(test)]
pub mod testing;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::snapshot::RenderedSnapshot;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("timed out after {after:?} waiting for {what}")]
    Timeout { what: String, after: Duration },
    #[error("no element matches `{0}`")]
    NotFound(String),
    #[error("browser error: {0}")]
    Browser(String),
}

impl DriverError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Timeout { .. })
    }
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// A single live page. Every call is a suspension point; nothing here is
/// invoked concurrently within one discovery run.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn goto(&self, url: &str, timeout: Duration) -> DriverResult<()>;

    /// Number of elements currently matching `selector`.
    async fn count(&self, selector: &str) -> DriverResult<usize>;

    /// Scroll the viewport vertically by `dy` pixels.
    async fn scroll_by(&self, dy: i64) -> DriverResult<()>;

    async fn click(&self, selector: &str) -> DriverResult<()>;

    /// Click the first element matching `selector` whose trimmed text is
    /// exactly `text`, waiting up to `timeout` for it to appear.
    async fn click_text(&self, selector: &str, text: &str, timeout: Duration) -> DriverResult<()>;

    async fn fill(&self, selector: &str, value: &str) -> DriverResult<()>;

    /// Attribute of the first match; `NotFound` when nothing matches.
    async fn attribute(&self, selector: &str, name: &str) -> DriverResult<Option<String>>;

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> DriverResult<()> {
        poll_until_present(self, selector, timeout).await
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> DriverResult<()>;

    async fn snapshot(&self) -> DriverResult<RenderedSnapshot>;
}

/// Re-query `selector` until it matches or `timeout` elapses.
pub async fn poll_until_present<B: Browser + ?Sized>(
    browser: &B,
    selector: &str,
    timeout: Duration,
) -> DriverResult<()> {
    let found = tokio::time::timeout(timeout, async {
        loop {
            match browser.count(selector).await {
                Ok(n) if n > 0 => return Ok(()),
                Ok(_) => {}
                Err(DriverError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    })
    .await;

    match found {
        Ok(result) => result,
        Err(_) => Err(DriverError::Timeout {
            what: format!("`{}`", selector),
            after: timeout,
        }),
    }
}
