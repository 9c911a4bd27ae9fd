use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::Discovery;
use crate::auth::{self, LoginForm};
use crate::browser::Browser;
use crate::config::{Credentials, ScrollConfig, LISTING_GOTO_TIMEOUT, LOGIN_TIMEOUT};
use crate::discovery::scroll;
use crate::parser::{Extractor, Field, FieldRule, FieldRules, LinkRule, LinkSource, TagRule};

pub const SOURCE: &str = "devpost";
pub const COLLECTION: &str = "hackathons";

const BASE_URL: &str = "https://devpost.com";
const LISTING_URL: &str = "https://devpost.com/hackathons";
const CARD: &str = "a.flex-row.tile-anchor";
const LISTING_LINK: &str = r#"a[href="/hackathons"]"#;

const LOGIN: LoginForm = LoginForm {
    url: "https://secure.devpost.com/users/login?ref=top-nav-login",
    email_input: r#"input[name="user[email]"]"#,
    password_input: r#"input[name="user[password]"]"#,
    submit: "#submit-form",
    signed_in: LISTING_LINK,
};

pub fn extractor() -> Result<Extractor> {
    let rules = FieldRules::new(
        CARD,
        LinkRule {
            source: LinkSource::Own,
            required: true,
        },
    )?
    .field(Field::Title, FieldRule::text("h3.mb-4")?)
    .field(
        Field::Status,
        FieldRule::text("div.hackathon-status div.round.label.status-label")?,
    )
    .field(Field::Prize, FieldRule::text("span.prize-amount")?)
    .field(Field::Participants, FieldRule::text("div.participants strong")?)
    .field(Field::Host, FieldRule::text("span.label.round.host-label")?)
    .field(Field::Dates, FieldRule::text("div.submission-period")?)
    .tags(TagRule::attr("span.label.theme-label.mr-2.mb-2", "title")?);

    Extractor::new(SOURCE, BASE_URL, rules)
}

/// Open the listing (logging in first when credentials are given), scroll it
/// to the end, and extract every card.
pub async fn discover<B: Browser + ?Sized>(
    browser: &B,
    login: Option<&Credentials>,
    config: &ScrollConfig,
    cancel: &CancellationToken,
) -> Result<Discovery> {
    let extractor = extractor()?;

    match login {
        Some(creds) => {
            auth::login(browser, &LOGIN, creds, LISTING_GOTO_TIMEOUT, LOGIN_TIMEOUT).await?;
            browser
                .click(LISTING_LINK)
                .await
                .context("Hackathons link not found")?;
        }
        None => browser
            .goto(LISTING_URL, LISTING_GOTO_TIMEOUT)
            .await
            .context("Failed to open hackathons page")?,
    }
    browser
        .wait_for_selector(CARD, LOGIN_TIMEOUT)
        .await
        .context("Hackathon list never appeared")?;

    info!("Loading all hackathons (this may take a while)...");
    let outcome = scroll::stabilize(browser, CARD, config, cancel)
        .await
        .context("Failed to capture hackathon list")?;

    let records = extractor.extract(&outcome.snapshot);
    info!(
        "Found {} hackathons ({} cards seen, {} ticks)",
        records.len(),
        outcome.entities,
        outcome.ticks
    );

    Ok(Discovery {
        records,
        stop: outcome.stop,
        pages: None,
    })
}
