pub mod paginate;
pub mod scroll;
pub mod state;

use std::fmt;

/// Why a discovery run stopped. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Scroll surface stopped growing.
    Exhausted,
    /// Visited every page the chosen strategy allows.
    PageLimit,
    /// "Next page" was missing, disabled, or failed.
    NoNextPage,
    /// A sequential page yielded no records.
    EmptyPage(u32),
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Exhausted => write!(f, "list exhausted"),
            StopReason::PageLimit => write!(f, "page limit reached"),
            StopReason::NoNextPage => write!(f, "no next page"),
            StopReason::EmptyPage(p) => write!(f, "page {} was empty", p),
            StopReason::Cancelled => write!(f, "cancelled"),
        }
    }
}
