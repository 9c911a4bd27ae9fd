pub mod rules;

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::record::ListingRecord;
use crate::snapshot::RenderedSnapshot;
pub use rules::{Field, FieldRule, FieldRules, LinkRule, LinkSource, TagRule};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("entity has no link")]
    MissingLink,
    #[error("cannot resolve link {href:?}: {source}")]
    BadLink {
        href: String,
        #[source]
        source: url::ParseError,
    },
}

/// Turns snapshots into listing records for one site.
#[derive(Debug)]
pub struct Extractor {
    source: String,
    base: Url,
    rules: FieldRules,
}

impl Extractor {
    pub fn new(source: &str, base_url: &str, rules: FieldRules) -> anyhow::Result<Self> {
        Ok(Self {
            source: source.to_string(),
            base: Url::parse(base_url)?,
            rules,
        })
    }

    pub fn entity_selector(&self) -> &str {
        self.rules.entity_css()
    }

    /// One record per entity fragment. A fragment that cannot be turned into a
    /// record is logged and skipped; this never fails as a whole.
    pub fn extract(&self, snapshot: &RenderedSnapshot) -> Vec<ListingRecord> {
        if snapshot.is_empty() {
            debug!("Empty {} snapshot", self.source);
            return Vec::new();
        }
        let document = Html::parse_document(snapshot.html());
        let mut records = Vec::new();
        let mut skipped = 0usize;

        for (i, fragment) in document.select(&self.rules.entity).enumerate() {
            match self.extract_one(fragment, snapshot.captured_at()) {
                Ok(record) => {
                    record.trace();
                    records.push(record);
                }
                Err(e) => {
                    skipped += 1;
                    warn!("Skipping {} card #{}: {}", self.source, i + 1, e);
                }
            }
        }

        debug!(
            "Extracted {} {} records ({} skipped)",
            records.len(),
            self.source,
            skipped
        );
        records
    }

    fn extract_one(
        &self,
        fragment: ElementRef<'_>,
        scraped_at: DateTime<Utc>,
    ) -> Result<ListingRecord, ExtractError> {
        let mut record = ListingRecord::new(&self.source, scraped_at);

        record.link = match self.rules.link.href(fragment) {
            Some(href) => Some(absolute_link(&self.base, &href)?),
            None if self.rules.link.required => return Err(ExtractError::MissingLink),
            None => None,
        };

        for (field, rule) in &self.rules.fields {
            *field.slot(&mut record) = rule.resolve(fragment);
        }

        if let Some(tags) = &self.rules.tags {
            record.tags = tags.resolve(fragment);
        }

        Ok(record)
    }
}

/// Resolve `href` against the site root; absolute hrefs pass through.
pub fn absolute_link(base: &Url, href: &str) -> Result<String, ExtractError> {
    base.join(href)
        .map(String::from)
        .map_err(|source| ExtractError::BadLink {
            href: href.to_string(),
            source,
        })
}
