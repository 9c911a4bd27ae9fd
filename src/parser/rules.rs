use std::sync::LazyLock;

use anyhow::{anyhow, Result};
use regex::Regex;
use scraper::{ElementRef, Selector};

use crate::record::ListingRecord;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

pub fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid selector `{}`: {:?}", css, e))
}

/// Scalar listing fields a rule can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Status,
    Prize,
    Participants,
    Host,
    Dates,
    ImageUrl,
    EventType,
    EventMode,
}

impl Field {
    pub fn slot(self, record: &mut ListingRecord) -> &mut Option<String> {
        match self {
            Field::Title => &mut record.title,
            Field::Status => &mut record.status,
            Field::Prize => &mut record.prize,
            Field::Participants => &mut record.participants,
            Field::Host => &mut record.host,
            Field::Dates => &mut record.dates,
            Field::ImageUrl => &mut record.image_url,
            Field::EventType => &mut record.event_type,
            Field::EventMode => &mut record.event_mode,
        }
    }
}

/// Where one scalar value lives inside an entity fragment.
#[derive(Debug)]
pub struct FieldRule {
    scope: Option<Selector>,
    selector: Selector,
    attr: Option<String>,
    nth: usize,
}

impl FieldRule {
    /// Collapsed text of the first match.
    pub fn text(css: &str) -> Result<Self> {
        Ok(Self {
            scope: None,
            selector: parse_selector(css)?,
            attr: None,
            nth: 0,
        })
    }

    /// Attribute value of the first match.
    pub fn attr(css: &str, name: &str) -> Result<Self> {
        Ok(Self {
            attr: Some(name.to_string()),
            ..Self::text(css)?
        })
    }

    /// Use the `n`th match (0-based) instead of the first.
    pub fn nth(mut self, n: usize) -> Self {
        self.nth = n;
        self
    }

    /// Only look inside the first element matching `container_css`.
    pub fn within(mut self, container_css: &str) -> Result<Self> {
        self.scope = Some(parse_selector(container_css)?);
        Ok(self)
    }

    pub fn resolve(&self, fragment: ElementRef<'_>) -> Option<String> {
        let root = match &self.scope {
            Some(scope) => fragment.select(scope).next()?,
            None => fragment,
        };
        let el = root.select(&self.selector).nth(self.nth)?;
        let value = match &self.attr {
            Some(name) => el.value().attr(name).map(str::trim).map(str::to_string),
            None => Some(element_text(el)),
        };
        value.filter(|v| !v.is_empty())
    }
}

/// Multi-valued field; elements without the wanted attribute are skipped.
#[derive(Debug)]
pub struct TagRule {
    selector: Selector,
    attr: Option<String>,
}

impl TagRule {
    pub fn text(css: &str) -> Result<Self> {
        Ok(Self {
            selector: parse_selector(css)?,
            attr: None,
        })
    }

    pub fn attr(css: &str, name: &str) -> Result<Self> {
        Ok(Self {
            attr: Some(name.to_string()),
            ..Self::text(css)?
        })
    }

    pub fn resolve(&self, fragment: ElementRef<'_>) -> Vec<String> {
        fragment
            .select(&self.selector)
            .filter_map(|el| match &self.attr {
                Some(name) => el.value().attr(name).map(|v| v.trim().to_string()),
                None => Some(element_text(el)),
            })
            .filter(|v| !v.is_empty())
            .collect()
    }
}

#[derive(Debug)]
pub enum LinkSource {
    /// `href` on the entity element itself.
    Own,
    /// `href` on the nearest enclosing `<a>`.
    Ancestor,
    Descendant(Selector),
}

#[derive(Debug)]
pub struct LinkRule {
    pub source: LinkSource,
    /// A required link that is missing or unresolvable drops the entity.
    pub required: bool,
}

impl LinkRule {
    pub fn href(&self, fragment: ElementRef<'_>) -> Option<String> {
        let href = match &self.source {
            LinkSource::Own => fragment.value().attr("href"),
            LinkSource::Ancestor => fragment
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|el| el.value().name() == "a")
                .and_then(|a| a.value().attr("href")),
            LinkSource::Descendant(sel) => fragment
                .select(sel)
                .next()
                .and_then(|a| a.value().attr("href")),
        };
        href.map(str::trim).filter(|h| !h.is_empty()).map(str::to_string)
    }
}

/// Per-site description of an entity and its fields.
#[derive(Debug)]
pub struct FieldRules {
    entity_css: String,
    pub(crate) entity: Selector,
    pub(crate) link: LinkRule,
    pub(crate) fields: Vec<(Field, FieldRule)>,
    pub(crate) tags: Option<TagRule>,
}

impl FieldRules {
    pub fn new(entity_css: &str, link: LinkRule) -> Result<Self> {
        Ok(Self {
            entity_css: entity_css.to_string(),
            entity: parse_selector(entity_css)?,
            link,
            fields: Vec::new(),
            tags: None,
        })
    }

    pub fn field(mut self, field: Field, rule: FieldRule) -> Self {
        self.fields.push((field, rule));
        self
    }

    pub fn tags(mut self, rule: TagRule) -> Self {
        self.tags = Some(rule);
        self
    }

    pub fn entity_css(&self) -> &str {
        &self.entity_css
    }
}

/// Text content with runs of whitespace collapsed, like a browser renders it.
pub fn element_text(el: ElementRef<'_>) -> String {
    let raw: String = el.text().collect();
    WHITESPACE_RE.replace_all(raw.trim(), " ").to_string()
}
