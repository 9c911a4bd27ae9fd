use std::path::PathBuf;
use std::time::Duration;

// ── Discovery ──

/// Consecutive no-growth scroll ticks before the list counts as exhausted.
pub const STALL_THRESHOLD: u32 = 5;
pub const SETTLE_INTERVAL: Duration = Duration::from_secs(1);
pub const SCROLL_STEP_PX: i64 = 1000;

/// Page visits once the page-size control is set to its largest option.
pub const EXPANDED_PAGE_VISITS: u32 = 2;
pub const MAX_SEQUENTIAL_PAGES: u32 = 13;
pub const EXPANDED_PAGE_SIZE: &str = "102";

// ── Timeouts ──

pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(10);
pub const LISTING_GOTO_TIMEOUT: Duration = Duration::from_secs(60);
pub const LISTING_READY_TIMEOUT: Duration = Duration::from_secs(30);
pub const PAGE_SIZE_TOGGLE_TIMEOUT: Duration = Duration::from_secs(5);
pub const PAGE_SIZE_OPTION_TIMEOUT: Duration = Duration::from_secs(3);
pub const PAGE_READY_TIMEOUT: Duration = Duration::from_secs(15);
pub const NETWORK_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

// ── Storage ──

const DB_PATH: &str = "data/hackathons.sqlite";

#[derive(Debug, Clone)]
pub struct ScrollConfig {
    pub stall_threshold: u32,
    pub settle: Duration,
    pub step_px: i64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            stall_threshold: STALL_THRESHOLD,
            settle: SETTLE_INTERVAL,
            step_px: SCROLL_STEP_PX,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaginationConfig {
    pub expanded_visits: u32,
    pub max_pages: u32,
    pub page_size: String,
    pub settle: Duration,
    pub toggle_timeout: Duration,
    pub option_timeout: Duration,
    pub page_ready_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            expanded_visits: EXPANDED_PAGE_VISITS,
            max_pages: MAX_SEQUENTIAL_PAGES,
            page_size: EXPANDED_PAGE_SIZE.to_string(),
            settle: SETTLE_INTERVAL,
            toggle_timeout: PAGE_SIZE_TOGGLE_TIMEOUT,
            option_timeout: PAGE_SIZE_OPTION_TIMEOUT,
            page_ready_timeout: PAGE_READY_TIMEOUT,
            idle_timeout: NETWORK_IDLE_TIMEOUT,
        }
    }
}

/// Login credentials for sites that gate their listings.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything a run needs, resolved from CLI flags and the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub db_path: PathBuf,
    pub headed: bool,
    pub scroll: ScrollConfig,
    pub pagination: PaginationConfig,
    pub devpost_login: Option<Credentials>,
}

impl Settings {
    /// `flag` wins over `HACKATHONS_DB`, which wins over the built-in path.
    pub fn db_path(flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| std::env::var_os("HACKATHONS_DB").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DB_PATH))
    }

    /// Both `DEVPOST_EMAIL` and `DEVPOST_PASSWORD` must be set and non-empty.
    pub fn devpost_credentials() -> Option<Credentials> {
        let email = std::env::var("DEVPOST_EMAIL").ok().filter(|v| !v.is_empty())?;
        let password = std::env::var("DEVPOST_PASSWORD").ok().filter(|v| !v.is_empty())?;
        Some(Credentials { email, password })
    }
}
