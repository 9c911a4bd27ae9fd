use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const UNKNOWN: &str = "Unknown";
pub const NOT_AVAILABLE: &str = "Not available";

/// One hackathon listing as extracted from an entity fragment.
///
/// Scalar fields are `None` when the page did not carry them, so a listing
/// whose host is literally called "Unknown" stays distinguishable from one
/// with no host at all. Sentinels only appear when rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub source: String,
    pub title: Option<String>,
    /// Always absolute when present.
    pub link: Option<String>,
    pub status: Option<String>,
    pub prize: Option<String>,
    pub participants: Option<String>,
    pub host: Option<String>,
    pub dates: Option<String>,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub event_type: Option<String>,
    pub event_mode: Option<String>,
    /// 1-based page the record was found on, for paginated sources.
    pub page: Option<u32>,
    pub scraped_at: DateTime<Utc>,
}

impl ListingRecord {
    pub fn new(source: &str, scraped_at: DateTime<Utc>) -> Self {
        Self {
            source: source.to_string(),
            title: None,
            link: None,
            status: None,
            prize: None,
            participants: None,
            host: None,
            dates: None,
            tags: Vec::new(),
            image_url: None,
            event_type: None,
            event_mode: None,
            page: None,
            scraped_at,
        }
    }

    pub fn title_or_unknown(&self) -> &str {
        or_unknown(&self.title)
    }

    pub fn link_or_unavailable(&self) -> &str {
        self.link.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    /// Log every field at debug level, sentinels filled in.
    pub fn trace(&self) {
        tracing::debug!(
            title = self.title_or_unknown(),
            link = self.link_or_unavailable(),
            status = or_unknown(&self.status),
            prize = or_unknown(&self.prize),
            participants = or_unknown(&self.participants),
            host = or_unknown(&self.host),
            dates = or_unknown(&self.dates),
            tags = ?self.tags,
            "listing"
        );
    }
}

pub fn or_unknown(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or(UNKNOWN)
}
