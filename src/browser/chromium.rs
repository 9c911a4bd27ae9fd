use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::{Element, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{poll_until_present, Browser, DriverError, DriverResult};
use crate::snapshot::RenderedSnapshot;

const VIEWPORT: (u32, u32) = (1280, 1080);
/// Quiet period after in-flight navigation settles, standing in for network idle.
const IDLE_QUIET: Duration = Duration::from_millis(500);
const TEXT_POLL: Duration = Duration::from_millis(100);

/// Chrome driven over the DevTools protocol, one page per instance.
pub struct ChromiumBrowser {
    browser: CdpBrowser,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromiumBrowser {
    pub async fn launch(headed: bool) -> Result<Self> {
        let mut builder = BrowserConfig::builder().window_size(VIEWPORT.0, VIEWPORT.1);
        if headed {
            builder = builder.with_head();
        }
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Invalid browser config: {}", e))?;

        let (browser, mut handler) = CdpBrowser::launch(config)
            .await
            .context("Failed to launch Chrome")?;

        // The handler must be polled for the connection to make progress.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler stopped: {}", e);
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("Failed to open a browser page")?;

        Ok(Self {
            browser,
            page,
            handler,
        })
    }

    /// Close the browser and wait for the process to exit.
    pub async fn close(mut self) -> Result<()> {
        if let Err(e) = self.browser.close().await {
            warn!("Browser close failed: {}", e);
        }
        self.browser.wait().await?;
        self.handler.await?;
        Ok(())
    }

    async fn first(&self, selector: &str) -> DriverResult<Element> {
        self.page
            .find_elements(selector)
            .await
            .map_err(cdp)?
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::NotFound(selector.to_string()))
    }

    async fn find_by_text(&self, selector: &str, text: &str) -> DriverResult<Option<Element>> {
        for el in self.page.find_elements(selector).await.map_err(cdp)? {
            let inner = el.inner_text().await.map_err(cdp)?;
            if inner.as_deref().map(str::trim) == Some(text) {
                return Ok(Some(el));
            }
        }
        Ok(None)
    }
}

fn cdp(e: CdpError) -> DriverError {
    DriverError::Browser(e.to_string())
}

fn timeout_err(what: impl Into<String>, after: Duration) -> DriverError {
    DriverError::Timeout {
        what: what.into(),
        after,
    }
}

#[async_trait]
impl Browser for ChromiumBrowser {
    async fn goto(&self, url: &str, timeout: Duration) -> DriverResult<()> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(cdp(e)),
            Err(_) => Err(timeout_err(format!("navigation to {}", url), timeout)),
        }
    }

    async fn count(&self, selector: &str) -> DriverResult<usize> {
        Ok(self.page.find_elements(selector).await.map_err(cdp)?.len())
    }

    async fn scroll_by(&self, dy: i64) -> DriverResult<()> {
        self.page
            .evaluate(format!("window.scrollBy(0, {})", dy))
            .await
            .map_err(cdp)?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> DriverResult<()> {
        self.first(selector).await?.click().await.map_err(cdp)?;
        Ok(())
    }

    async fn click_text(&self, selector: &str, text: &str, timeout: Duration) -> DriverResult<()> {
        let found = tokio::time::timeout(timeout, async {
            loop {
                if let Some(el) = self.find_by_text(selector, text).await? {
                    return Ok::<_, DriverError>(el);
                }
                tokio::time::sleep(TEXT_POLL).await;
            }
        })
        .await;

        let el = match found {
            Ok(el) => el?,
            Err(_) => return Err(timeout_err(format!("`{}` with text {:?}", selector, text), timeout)),
        };
        el.click().await.map_err(cdp)?;
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> DriverResult<()> {
        let el = self.first(selector).await?;
        el.click().await.map_err(cdp)?;
        el.type_str(value).await.map_err(cdp)?;
        Ok(())
    }

    async fn attribute(&self, selector: &str, name: &str) -> DriverResult<Option<String>> {
        self.first(selector).await?.attribute(name).await.map_err(cdp)
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> DriverResult<()> {
        poll_until_present(self, selector, timeout).await
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> DriverResult<()> {
        match tokio::time::timeout(timeout, self.page.wait_for_navigation()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(cdp(e)),
            Err(_) => return Err(timeout_err("network idle", timeout)),
        }
        tokio::time::sleep(IDLE_QUIET).await;
        Ok(())
    }

    async fn snapshot(&self) -> DriverResult<RenderedSnapshot> {
        let html = self.page.content().await.map_err(cdp)?;
        Ok(RenderedSnapshot::new(html))
    }
}
