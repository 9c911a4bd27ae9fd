//! Scripted in-memory browser for driving discovery loops in tests.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;

use super::{Browser, DriverError, DriverResult};
use crate::discovery::paginate::PaginationSelectors;
use crate::parser::rules::parse_selector;
use crate::parser::{Extractor, Field, FieldRule, FieldRules, LinkRule, LinkSource};
use crate::snapshot::RenderedSnapshot;

pub const CARD: &str = "div.card";
pub const NEXT: &str = "button.next";
pub const TOGGLE: &str = "div.rows-toggle";
pub const MENU: &str = "div.rows-menu";
pub const OPTION: &str = "p.rows-option";

pub fn selectors() -> PaginationSelectors {
    PaginationSelectors {
        page_size_toggle: TOGGLE.into(),
        page_size_menu: MENU.into(),
        page_size_option: OPTION.into(),
        next_button: NEXT.into(),
    }
}

pub fn test_extractor() -> Extractor {
    let rules = FieldRules::new(
        CARD,
        LinkRule {
            source: LinkSource::Descendant(parse_selector("a").unwrap()),
            required: false,
        },
    )
    .unwrap()
    .field(Field::Title, FieldRule::text("p.title").unwrap());
    Extractor::new("test", "https://site.example", rules).unwrap()
}

pub fn cards_page<S: AsRef<str>>(titles: &[S]) -> String {
    let cards: String = titles
        .iter()
        .map(|t| {
            let t = t.as_ref();
            format!(r#"<div class="card"><a href="/e/{t}"><p class="title">{t}</p></a></div>"#)
        })
        .collect();
    format!("<html><body><main>{}</main></body></html>", cards)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisabledBy {
    Never,
    Attribute,
    Class,
}

struct Script {
    scrolling: bool,
    counts: VecDeque<usize>,
    current_count: usize,
    fail_counts: bool,
    scroll_html: String,
    scrolls: usize,

    pages: Vec<String>,
    expanded_pages: Option<Vec<String>>,
    offered_size: String,
    expanded: bool,
    menu_open: bool,
    current: usize,
    disabled_by: DisabledBy,
    hide_next: bool,
    fail_next_at: Option<usize>,

    present: HashSet<String>,
    unreachable: bool,
    refused: Vec<String>,
    idle_fail_from: Option<usize>,
    idle_calls: usize,
    snapshots: usize,
    clicks: Vec<String>,
    fills: Vec<(String, String)>,
    visited: Vec<String>,
}

impl Script {
    fn active_pages(&self) -> &[String] {
        match (&self.expanded_pages, self.expanded) {
            (Some(p), true) => p,
            _ => &self.pages,
        }
    }

    fn current_html(&self) -> String {
        if self.scrolling {
            return self.scroll_html.clone();
        }
        self.active_pages().get(self.current).cloned().unwrap_or_default()
    }

    fn on_last_page(&self) -> bool {
        self.current + 1 >= self.active_pages().len()
    }

    fn matches(&self, selector: &str) -> usize {
        match selector {
            TOGGLE => self.expanded_pages.is_some() as usize,
            MENU => self.menu_open as usize,
            NEXT => (!self.hide_next) as usize,
            s if self.present.contains(s) => 1,
            s => {
                let Ok(sel) = parse_selector(s) else { return 0 };
                Html::parse_document(&self.current_html()).select(&sel).count()
            }
        }
    }
}

pub struct ScriptedBrowser {
    script: Mutex<Script>,
}

impl ScriptedBrowser {
    fn new() -> Self {
        Self {
            script: Mutex::new(Script {
                scrolling: false,
                counts: VecDeque::new(),
                current_count: 0,
                fail_counts: false,
                scroll_html: String::new(),
                scrolls: 0,
                pages: Vec::new(),
                expanded_pages: None,
                offered_size: "102".into(),
                expanded: false,
                menu_open: false,
                current: 0,
                disabled_by: DisabledBy::Never,
                hide_next: false,
                fail_next_at: None,
                present: HashSet::new(),
                unreachable: false,
                refused: Vec::new(),
                idle_fail_from: None,
                idle_calls: 0,
                snapshots: 0,
                clicks: Vec::new(),
                fills: Vec::new(),
                visited: Vec::new(),
            }),
        }
    }

    /// Each scroll tick reveals the next count; the last one repeats. Any
    /// selector other than a control or a `with_present` one counts as the
    /// entity selector.
    pub fn scrolling(counts: Vec<usize>) -> Self {
        let b = Self::new();
        {
            let mut s = b.lock();
            s.scrolling = true;
            s.current_count = counts.first().copied().unwrap_or(0);
            s.counts = counts.into();
        }
        b
    }

    /// One HTML document per page; "next" advances through them.
    pub fn paged(pages: Vec<String>) -> Self {
        let b = Self::new();
        b.lock().pages = pages;
        b
    }

    /// Offer a page-size control that swaps in `pages` once chosen.
    pub fn with_page_size(self, pages: Vec<String>) -> Self {
        self.lock().expanded_pages = Some(pages);
        self
    }

    /// Label of the only option in the page-size menu.
    pub fn offering(self, label: &str) -> Self {
        self.lock().offered_size = label.to_string();
        self
    }

    /// How the next control marks itself disabled on the last page.
    pub fn disabled_by(self, marker: DisabledBy) -> Self {
        self.lock().disabled_by = marker;
        self
    }

    pub fn without_next(self) -> Self {
        self.lock().hide_next = true;
        self
    }

    /// Clicking "next" while on page index `index` fails.
    pub fn failing_next_at(self, index: usize) -> Self {
        self.lock().fail_next_at = Some(index);
        self
    }

    pub fn failing_counts(self) -> Self {
        self.lock().fail_counts = true;
        self
    }

    pub fn with_html(self, html: &str) -> Self {
        self.lock().scroll_html = html.to_string();
        self
    }

    /// Selectors that always match, e.g. login-page widgets.
    pub fn with_present(self, selectors: &[&str]) -> Self {
        self.lock()
            .present
            .extend(selectors.iter().map(|s| s.to_string()));
        self
    }

    pub fn unreachable(self) -> Self {
        self.lock().unreachable = true;
        self
    }

    /// Navigation to any URL containing `fragment` times out.
    pub fn refusing(self, fragment: &str) -> Self {
        self.lock().refused.push(fragment.to_string());
        self
    }

    /// The `call`th network-idle wait (1-based) and every later one time out.
    pub fn failing_idle_from(self, call: usize) -> Self {
        self.lock().idle_fail_from = Some(call);
        self
    }

    pub fn scrolls(&self) -> usize {
        self.lock().scrolls
    }

    pub fn snapshots(&self) -> usize {
        self.lock().snapshots
    }

    pub fn clicks_on(&self, selector: &str) -> usize {
        self.lock().clicks.iter().filter(|c| *c == selector).count()
    }

    pub fn fills(&self) -> Vec<(String, String)> {
        self.lock().fills.clone()
    }

    pub fn visited(&self) -> Vec<String> {
        self.lock().visited.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }
}

#[async_trait]
impl Browser for ScriptedBrowser {
    async fn goto(&self, url: &str, timeout: Duration) -> DriverResult<()> {
        let mut s = self.lock();
        if s.unreachable || s.refused.iter().any(|f| url.contains(f.as_str())) {
            return Err(DriverError::Timeout {
                what: format!("navigation to {}", url),
                after: timeout,
            });
        }
        s.visited.push(url.to_string());
        Ok(())
    }

    async fn count(&self, selector: &str) -> DriverResult<usize> {
        let s = self.lock();
        let control = matches!(selector, TOGGLE | MENU | NEXT) || s.present.contains(selector);
        if s.scrolling && !control {
            if s.fail_counts {
                return Err(DriverError::Browser("count failed".into()));
            }
            return Ok(s.current_count);
        }
        Ok(s.matches(selector))
    }

    async fn scroll_by(&self, _dy: i64) -> DriverResult<()> {
        let mut s = self.lock();
        s.scrolls += 1;
        if let Some(next) = s.counts.pop_front() {
            s.current_count = next;
        }
        Ok(())
    }

    async fn click(&self, selector: &str) -> DriverResult<()> {
        let mut s = self.lock();
        s.clicks.push(selector.to_string());
        match selector {
            TOGGLE if s.expanded_pages.is_some() => {
                s.menu_open = true;
                Ok(())
            }
            NEXT if s.hide_next => Err(DriverError::NotFound(selector.into())),
            NEXT => {
                if s.fail_next_at == Some(s.current) {
                    return Err(DriverError::Browser("element detached".into()));
                }
                if !s.on_last_page() {
                    s.current += 1;
                }
                Ok(())
            }
            other if s.matches(other) > 0 => Ok(()),
            other => Err(DriverError::NotFound(other.into())),
        }
    }

    async fn click_text(&self, selector: &str, text: &str, timeout: Duration) -> DriverResult<()> {
        let mut s = self.lock();
        if selector == OPTION && s.menu_open && text == s.offered_size {
            s.clicks.push(selector.to_string());
            s.menu_open = false;
            s.expanded = true;
            s.current = 0;
            return Ok(());
        }
        Err(DriverError::Timeout {
            what: format!("`{}` with text {:?}", selector, text),
            after: timeout,
        })
    }

    async fn fill(&self, selector: &str, value: &str) -> DriverResult<()> {
        let mut s = self.lock();
        if s.matches(selector) == 0 {
            return Err(DriverError::NotFound(selector.into()));
        }
        s.fills.push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn attribute(&self, selector: &str, name: &str) -> DriverResult<Option<String>> {
        let s = self.lock();
        if selector != NEXT {
            return Ok(None);
        }
        if s.hide_next {
            return Err(DriverError::NotFound(selector.into()));
        }
        let last = s.on_last_page();
        Ok(match (name, s.disabled_by) {
            ("disabled", DisabledBy::Attribute) if last => Some(String::new()),
            ("disabled", _) => None,
            ("class", DisabledBy::Class) if last => Some("btn disabled".into()),
            ("class", _) => Some("btn".into()),
            _ => None,
        })
    }

    /// Resolves immediately: present now, or a timeout.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> DriverResult<()> {
        if self.count(selector).await? > 0 {
            Ok(())
        } else {
            Err(DriverError::Timeout {
                what: format!("`{}`", selector),
                after: timeout,
            })
        }
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> DriverResult<()> {
        let mut s = self.lock();
        s.idle_calls += 1;
        match s.idle_fail_from {
            Some(from) if s.idle_calls >= from => Err(DriverError::Timeout {
                what: "network idle".into(),
                after: timeout,
            }),
            _ => Ok(()),
        }
    }

    async fn snapshot(&self) -> DriverResult<RenderedSnapshot> {
        let mut s = self.lock();
        s.snapshots += 1;
        Ok(RenderedSnapshot::new(s.current_html()))
    }
}
