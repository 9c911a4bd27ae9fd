pub mod devpost;
pub mod hack2skill;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::browser::Browser;
use crate::config::Settings;
use crate::discovery::StopReason;
use crate::record::ListingRecord;

/// Records gathered by one site's discovery run.
pub struct Discovery {
    pub records: Vec<ListingRecord>,
    pub stop: StopReason,
    /// Pages visited, for paginated sites.
    pub pages: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    /// Infinite-scroll listing.
    Devpost,
    /// Paginated listing.
    Hack2skill,
}

impl Site {
    pub const ALL: [Site; 2] = [Site::Devpost, Site::Hack2skill];

    pub fn name(self) -> &'static str {
        match self {
            Site::Devpost => devpost::SOURCE,
            Site::Hack2skill => hack2skill::SOURCE,
        }
    }

    pub fn collection(self) -> &'static str {
        match self {
            Site::Devpost => devpost::COLLECTION,
            Site::Hack2skill => hack2skill::COLLECTION,
        }
    }

    pub async fn discover<B: Browser + ?Sized>(
        self,
        browser: &B,
        settings: &Settings,
        cancel: &CancellationToken,
    ) -> Result<Discovery> {
        match self {
            Site::Devpost => {
                devpost::discover(
                    browser,
                    settings.devpost_login.as_ref(),
                    &settings.scroll,
                    cancel,
                )
                .await
            }
            Site::Hack2skill => hack2skill::discover(browser, &settings.pagination, cancel).await,
        }
    }
}
