use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::Discovery;
use crate::browser::Browser;
use crate::config::{PaginationConfig, LISTING_GOTO_TIMEOUT, LISTING_READY_TIMEOUT};
use crate::discovery::paginate::{Navigator, PaginationSelectors};
use crate::parser::{Extractor, Field, FieldRule, FieldRules, LinkRule, LinkSource};

pub const SOURCE: &str = "hack2skill";
pub const COLLECTION: &str = "hackathons/hack2skill/events";

const BASE_URL: &str = "https://vision.hack2skill.com";
const LISTING_URL: &str = "https://vision.hack2skill.com/hackathons-listing";
const GRID: &str = "div.grid.grid-cols-1";
const CARD: &str = "div.flex.flex-col.gap-4.bg-white";
const EVENT_INFO: &str = r#"div[class*="bg-h2sPurple-50"]"#;
const DATE_INFO: &str = r#"div[class*="text-h2sSlate-500"]"#;

pub fn selectors() -> PaginationSelectors {
    PaginationSelectors {
        page_size_toggle: "div.flex.items-center.justify-between.cursor-pointer.border".into(),
        page_size_menu: "div.absolute.top-10.right-0".into(),
        page_size_option: "div.absolute.top-10.right-0 p".into(),
        next_button: r#"button[aria-label="Next page"]"#.into(),
    }
}

pub fn extractor() -> Result<Extractor> {
    let rules = FieldRules::new(
        CARD,
        LinkRule {
            source: LinkSource::Ancestor,
            required: false,
        },
    )?
    .field(Field::Title, FieldRule::text(r#"p[class*="text-h2sSlate-800"]"#)?)
    .field(Field::ImageUrl, FieldRule::attr("img", "src")?)
    .field(Field::EventType, FieldRule::text("p")?.within(EVENT_INFO)?)
    .field(Field::EventMode, FieldRule::text("p")?.within(EVENT_INFO)?.nth(1))
    .field(
        Field::Dates,
        FieldRule::text(r#"p[class*="text-subtitle2v1"]"#)?.within(DATE_INFO)?,
    );

    Extractor::new(SOURCE, BASE_URL, rules)
}

/// Open the listing and page through it.
pub async fn discover<B: Browser + ?Sized>(
    browser: &B,
    config: &PaginationConfig,
    cancel: &CancellationToken,
) -> Result<Discovery> {
    let extractor = extractor()?;
    let selectors = selectors();

    info!("Navigating to hack2skill hackathons page...");
    browser
        .goto(LISTING_URL, LISTING_GOTO_TIMEOUT)
        .await
        .context("Failed to open hack2skill listing")?;
    browser
        .wait_for_selector(GRID, LISTING_READY_TIMEOUT)
        .await
        .context("Hackathon grid never appeared")?;

    let outcome = Navigator::new(browser, &extractor, &selectors, config, cancel)
        .navigate()
        .await;
    let stop = outcome.stop;
    let pages = outcome.pages_visited;

    Ok(Discovery {
        records: outcome.into_records(),
        stop,
        pages: Some(pages),
    })
}
