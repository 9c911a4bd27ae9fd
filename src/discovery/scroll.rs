use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::state::{DiscoveryState, Observation};
use super::StopReason;
use crate::browser::{Browser, DriverResult};
use crate::config::ScrollConfig;
use crate::snapshot::RenderedSnapshot;

pub struct ScrollOutcome {
    pub snapshot: RenderedSnapshot,
    /// Entity count at the last observation.
    pub entities: usize,
    pub ticks: u32,
    pub stop: StopReason,
}

/// Scroll an infinite list until `entity_selector` stops matching new
/// elements for `stall_threshold` ticks in a row, then capture the page.
///
/// The loop itself cannot fail: count errors are logged and treated as a
/// stall. Only the final capture can return an error.
pub async fn stabilize<B: Browser + ?Sized>(
    browser: &B,
    entity_selector: &str,
    config: &ScrollConfig,
    cancel: &CancellationToken,
) -> DriverResult<ScrollOutcome> {
    let mut state = DiscoveryState::new(config.stall_threshold);

    let stop = loop {
        if cancel.is_cancelled() {
            info!("Scroll cancelled at {} cards", state.count());
            break StopReason::Cancelled;
        }

        if let Err(e) = browser.scroll_by(config.step_px).await {
            warn!("Scroll tick failed: {}", e);
        }
        tokio::time::sleep(config.settle).await;

        let observation = match browser.count(entity_selector).await {
            Ok(n) => state.observe(n),
            Err(e) => {
                warn!("Card count failed: {}", e);
                state.observe_unknown()
            }
        };

        match observation {
            Observation::Grew { count } => info!("Loaded {} cards...", count),
            Observation::Stalled { attempt } => info!(
                "No new cards loaded (attempt {}/{})",
                attempt,
                state.stall_threshold()
            ),
            Observation::Exhausted => {
                info!("Reached end of list at {} cards", state.count());
                break StopReason::Exhausted;
            }
        }
    };

    let snapshot = browser.snapshot().await?;
    Ok(ScrollOutcome {
        snapshot,
        entities: state.count(),
        ticks: state.ticks(),
        stop,
    })
}
