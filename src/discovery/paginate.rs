use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::StopReason;
use crate::browser::{Browser, DriverError, DriverResult};
use crate::config::PaginationConfig;
use crate::parser::Extractor;
use crate::record::ListingRecord;

/// CSS selectors for the controls of a paginated listing.
#[derive(Debug, Clone)]
pub struct PaginationSelectors {
    /// Clickable "rows per page" dropdown.
    pub page_size_toggle: String,
    /// Menu that opens under the toggle.
    pub page_size_menu: String,
    /// Options inside the menu; matched by their text.
    pub page_size_option: String,
    pub next_button: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Page size raised; a fixed number of pages covers the listing.
    Expanded,
    /// Default page size, walked until empty, disabled, or the page cap.
    Sequential,
}

#[derive(Debug)]
enum NavState {
    Init,
    ExpandAttempted,
    SequentialFallback,
    Done,
}

#[derive(Debug)]
pub struct PageBatch {
    pub page: u32,
    pub records: Vec<ListingRecord>,
}

#[derive(Debug)]
pub struct PaginationOutcome {
    pub strategy: Strategy,
    pub batches: Vec<PageBatch>,
    pub pages_visited: u32,
    pub stop: StopReason,
}

impl PaginationOutcome {
    pub fn record_count(&self) -> usize {
        self.batches.iter().map(|b| b.records.len()).sum()
    }

    /// All records in page-visitation order.
    pub fn into_records(self) -> Vec<ListingRecord> {
        self.batches.into_iter().flat_map(|b| b.records).collect()
    }
}

/// Walks a paginated listing on a page that is already showing page one.
pub struct Navigator<'a, B: Browser + ?Sized> {
    browser: &'a B,
    extractor: &'a Extractor,
    selectors: &'a PaginationSelectors,
    config: &'a PaginationConfig,
    cancel: &'a CancellationToken,
}

impl<'a, B: Browser + ?Sized> Navigator<'a, B> {
    pub fn new(
        browser: &'a B,
        extractor: &'a Extractor,
        selectors: &'a PaginationSelectors,
        config: &'a PaginationConfig,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            browser,
            extractor,
            selectors,
            config,
            cancel,
        }
    }

    /// Runs exactly one strategy to completion. Never fails: navigation
    /// faults end the walk and keep what was already gathered.
    pub async fn navigate(&self) -> PaginationOutcome {
        let mut state = NavState::Init;
        let mut outcome = PaginationOutcome {
            strategy: Strategy::Sequential,
            batches: Vec::new(),
            pages_visited: 0,
            stop: StopReason::PageLimit,
        };

        loop {
            state = match state {
                NavState::Init => {
                    if self.expand_page_size().await {
                        NavState::ExpandAttempted
                    } else {
                        NavState::SequentialFallback
                    }
                }
                NavState::ExpandAttempted => {
                    outcome.strategy = Strategy::Expanded;
                    let stop = self
                        .walk(self.config.expanded_visits, false, &mut outcome)
                        .await;
                    outcome.stop = stop;
                    NavState::Done
                }
                NavState::SequentialFallback => {
                    outcome.strategy = Strategy::Sequential;
                    let stop = self.walk(self.config.max_pages, true, &mut outcome).await;
                    outcome.stop = stop;
                    NavState::Done
                }
                NavState::Done => break,
            };
        }

        info!(
            "{:?} pagination: {} records over {} pages ({})",
            outcome.strategy,
            outcome.record_count(),
            outcome.pages_visited,
            outcome.stop
        );
        outcome
    }

    async fn walk(&self, limit: u32, stop_on_empty: bool, outcome: &mut PaginationOutcome) -> StopReason {
        for page in 1..=limit {
            if self.cancel.is_cancelled() {
                return StopReason::Cancelled;
            }
            if page > 1 && !self.next_page().await {
                return StopReason::NoNextPage;
            }

            outcome.pages_visited += 1;
            let records = self.scrape_page(page).await;
            if stop_on_empty && records.is_empty() {
                info!("Page {} has no listings, stopping", page);
                return StopReason::EmptyPage(page);
            }
            outcome.batches.push(PageBatch { page, records });
        }
        StopReason::PageLimit
    }

    async fn expand_page_size(&self) -> bool {
        info!("Setting rows per page to {}...", self.config.page_size);
        match self.try_expand().await {
            Ok(()) => {
                info!("Rows per page set to {}", self.config.page_size);
                true
            }
            Err(e) => {
                warn!("Couldn't set rows per page: {}", e);
                false
            }
        }
    }

    async fn try_expand(&self) -> DriverResult<()> {
        let s = self.selectors;
        let c = self.config;
        self.browser
            .wait_for_selector(&s.page_size_toggle, c.toggle_timeout)
            .await?;
        self.browser.click(&s.page_size_toggle).await?;
        self.browser
            .wait_for_selector(&s.page_size_menu, c.option_timeout)
            .await?;
        self.browser
            .click_text(&s.page_size_option, &c.page_size, c.option_timeout)
            .await?;
        self.browser.wait_for_network_idle(c.idle_timeout).await
    }

    /// Advance one page. `false` when the control is missing, disabled, or
    /// any step of the advance fails.
    async fn next_page(&self) -> bool {
        match self.try_next().await {
            Ok(advanced) => advanced,
            Err(DriverError::NotFound(_)) => {
                info!("No next-page control");
                false
            }
            Err(e) if e.is_timeout() => {
                warn!("Next page did not load in time: {}", e);
                false
            }
            Err(e) => {
                warn!("Error navigating to next page: {}", e);
                false
            }
        }
    }

    async fn try_next(&self) -> DriverResult<bool> {
        let next = &self.selectors.next_button;
        let disabled_attr = self.browser.attribute(next, "disabled").await?.is_some();
        let class = self.browser.attribute(next, "class").await?.unwrap_or_default();
        if disabled_attr || has_disabled_class(&class) {
            info!("Next page is disabled");
            return Ok(false);
        }

        self.browser.click(next).await?;
        self.browser.wait_for_network_idle(self.config.idle_timeout).await?;
        tokio::time::sleep(self.config.settle).await;
        Ok(true)
    }

    /// Records on the current page. Render timeouts and capture faults yield
    /// an empty batch.
    async fn scrape_page(&self, page: u32) -> Vec<ListingRecord> {
        info!("Processing page {}...", page);
        let entity = self.extractor.entity_selector();
        if let Err(e) = self
            .browser
            .wait_for_selector(entity, self.config.page_ready_timeout)
            .await
        {
            warn!("Page {} never showed listings: {}", page, e);
            return Vec::new();
        }

        let snapshot = match self.browser.snapshot().await {
            Ok(s) => s,
            Err(e) => {
                warn!("Error capturing page {}: {}", page, e);
                return Vec::new();
            }
        };

        let mut records = self.extractor.extract(&snapshot);
        for r in &mut records {
            r.page = Some(page);
        }
        info!("Page {}: {} listings", page, records.len());
        records
    }
}

/// Class-based disabled marker: a standalone `disabled` class token.
///
/// Matches whole tokens only, so utility classes such as
/// `disabled:opacity-50` do not stop the walk, unlike a plain substring test.
fn has_disabled_class(class: &str) -> bool {
    class.split_whitespace().any(|c| c == "disabled")
}
