use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Fully rendered page content captured at one instant.
#[derive(Debug, Clone)]
pub struct RenderedSnapshot {
    html: Arc<str>,
    captured_at: DateTime<Utc>,
}

impl RenderedSnapshot {
    pub fn new(html: impl Into<Arc<str>>) -> Self {
        Self {
            html: html.into(),
            captured_at: Utc::now(),
        }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn is_empty(&self) -> bool {
        self.html.trim().is_empty()
    }
}
