use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::browser::chromium::ChromiumBrowser;
use crate::browser::Browser;
use crate::config::Settings;
use crate::discovery::StopReason;
use crate::sink::{persist_all, CollectionPath, SaveReport, Sink};
use crate::sources::Site;

/// Outcome of one site run, returned after completion.
pub struct RunSummary {
    pub site: Site,
    pub collection: String,
    pub stop: StopReason,
    pub pages: Option<u32>,
    pub report: SaveReport,
}

/// Discover one site and hand every record to `sink`.
pub async fn run_site<B: Browser + ?Sized, S: Sink + ?Sized>(
    browser: &B,
    sink: &mut S,
    site: Site,
    settings: &Settings,
    cancel: &CancellationToken,
) -> Result<RunSummary> {
    let collection = CollectionPath::parse(site.collection())?;
    let found = site.discover(browser, settings, cancel).await?;
    info!("{}: discovered {} listings ({})", site.name(), found.records.len(), found.stop);

    let report = persist_all(sink, &collection, &found.records);
    Ok(RunSummary {
        site,
        collection: collection.to_string(),
        stop: found.stop,
        pages: found.pages,
        report,
    })
}

/// Everything a multi-site run produced. Sites that completed keep their
/// summaries even when a later (or earlier) site failed.
pub struct RunOutcome {
    pub summaries: Vec<RunSummary>,
    /// First fatal site fault, if any.
    pub error: Option<anyhow::Error>,
}

/// Launch one browser, run `sites` in order, and close the browser whatever
/// happened. Only a failed launch is an `Err` here.
pub async fn run_sites<S: Sink + ?Sized>(
    sites: &[Site],
    sink: &mut S,
    settings: &Settings,
    cancel: &CancellationToken,
) -> Result<RunOutcome> {
    let browser = ChromiumBrowser::launch(settings.headed).await?;

    let outcome = run_sites_with(&browser, sites, sink, settings, cancel).await;

    if let Err(e) = browser.close().await {
        warn!("Browser did not shut down cleanly: {}", e);
    }
    Ok(outcome)
}

/// Run `sites` in order on an open browser. A fatal fault in one site is
/// logged and the next site still runs.
pub async fn run_sites_with<B: Browser + ?Sized, S: Sink + ?Sized>(
    browser: &B,
    sites: &[Site],
    sink: &mut S,
    settings: &Settings,
    cancel: &CancellationToken,
) -> RunOutcome {
    let mut outcome = RunOutcome {
        summaries: Vec::new(),
        error: None,
    };
    for &site in sites {
        if cancel.is_cancelled() {
            break;
        }
        match run_site(browser, sink, site, settings, cancel).await {
            Ok(summary) => outcome.summaries.push(summary),
            Err(e) => {
                error!("{}: fatal error: {:#}", site.name(), e);
                if outcome.error.is_none() {
                    outcome.error = Some(e);
                }
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::testing::ScriptedBrowser;
    use crate::config::{PaginationConfig, ScrollConfig};
    use crate::sink::testing::MemorySink;
    use std::path::PathBuf;
    use std::time::Duration;

    fn settings() -> Settings {
        Settings {
            db_path: PathBuf::from(":memory:"),
            headed: false,
            scroll: ScrollConfig {
                settle: Duration::ZERO,
                ..ScrollConfig::default()
            },
            pagination: PaginationConfig {
                settle: Duration::ZERO,
                ..PaginationConfig::default()
            },
            devpost_login: None,
        }
    }

    #[tokio::test]
    async fn end_to_end_with_failing_write() {
        let html = std::fs::read_to_string("tests/fixtures/devpost.html").unwrap();
        let browser = ScriptedBrowser::scrolling(vec![2, 3]).with_html(&html);
        let mut sink = MemorySink::failing_on(&[2]);

        let summary = run_site(
            &browser,
            &mut sink,
            Site::Devpost,
            &settings(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(summary.report, SaveReport { saved: 2, total: 3 });
        assert_eq!(summary.collection, "hackathons");
        assert_eq!(summary.stop, StopReason::Exhausted);

        let saved: Vec<_> = sink.docs.iter().map(|(_, r)| r.title_or_unknown()).collect();
        assert_eq!(saved, vec!["Build for Good", "Pixel Sprint"]);
        assert!(sink.docs.iter().all(|(c, _)| c == "hackathons"));
    }

    #[tokio::test]
    async fn paginated_site_writes_to_nested_collection() {
        let html = std::fs::read_to_string("tests/fixtures/hack2skill.html").unwrap();
        let browser = ScriptedBrowser::paged(vec![html]);
        let mut sink = MemorySink::default();

        let summary = run_site(
            &browser,
            &mut sink,
            Site::Hack2skill,
            &settings(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(summary.report, SaveReport { saved: 3, total: 3 });
        assert_eq!(summary.pages, Some(1));
        assert!(sink
            .docs
            .iter()
            .all(|(c, _)| c == "hackathons/hack2skill/events"));
    }

    #[tokio::test]
    async fn failed_site_does_not_hide_completed_ones() {
        let html = std::fs::read_to_string("tests/fixtures/devpost.html").unwrap();
        let browser = ScriptedBrowser::scrolling(vec![3])
            .with_html(&html)
            .refusing("hack2skill.com");
        let mut sink = MemorySink::default();

        let out = run_sites_with(
            &browser,
            &[Site::Hack2skill, Site::Devpost],
            &mut sink,
            &settings(),
            &CancellationToken::new(),
        )
        .await;

        assert!(out.error.is_some());
        assert_eq!(out.summaries.len(), 1);
        assert_eq!(out.summaries[0].site, Site::Devpost);
        assert_eq!(out.summaries[0].report, SaveReport { saved: 3, total: 3 });
        assert_eq!(sink.docs.len(), 3);
    }

    #[tokio::test]
    async fn first_fault_is_kept() {
        let browser = ScriptedBrowser::scrolling(vec![3]).unreachable();
        let mut sink = MemorySink::default();

        let out = run_sites_with(
            &browser,
            &Site::ALL,
            &mut sink,
            &settings(),
            &CancellationToken::new(),
        )
        .await;

        let err = format!("{:#}", out.error.unwrap());
        assert!(err.contains("hackathons page"), "{}", err);
        assert!(out.summaries.is_empty());
    }

    #[tokio::test]
    async fn cancelled_run_skips_remaining_sites() {
        let browser = ScriptedBrowser::scrolling(vec![3]);
        let mut sink = MemorySink::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let out = run_sites_with(&browser, &Site::ALL, &mut sink, &settings(), &cancel).await;

        assert!(out.error.is_none());
        assert!(out.summaries.is_empty());
        assert!(browser.visited().is_empty());
    }

    #[tokio::test]
    async fn setup_fault_writes_nothing() {
        let browser = ScriptedBrowser::paged(Vec::new()).unreachable();
        let mut sink = MemorySink::default();
        let result = run_site(
            &browser,
            &mut sink,
            Site::Hack2skill,
            &settings(),
            &CancellationToken::new(),
        )
        .await;
        assert!(result.is_err());
        assert!(sink.docs.is_empty());
    }
}
