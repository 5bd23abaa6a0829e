//! Idle sweep - periodic backstop for episode auto-close.
//!
//! Per-episode timers close idle episodes on time; this loop only catches
//! episodes whose timer was lost (e.g. a close that failed and left the
//! episode active). It also drops short-term buffers of sessions idle for
//! longer than the episode idle timeout.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;

use crate::{AppEpisodeService, AppSessionService};

/// Start the sweep loop. Returns `None` when `period` is zero.
pub fn maybe_start_sweeper(
    episodes: Arc<AppEpisodeService>,
    sessions: Arc<AppSessionService>,
    period: Duration,
) -> Option<tokio::task::JoinHandle<()>> {
    if period.is_zero() {
        tracing::info!("Idle sweep disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        tracing::info!(interval_secs = period.as_secs(), "Idle sweep started");
        let mut ticker = interval(period);
        // Skip the first immediate tick
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let closed = episodes.sweep_idle().await;
            let dropped = sessions.evict_idle(episodes.idle_timeout()).await;
            if !closed.is_empty() || dropped > 0 {
                tracing::debug!(closed = closed.len(), dropped, "Idle sweep pass finished");
            }
        }
    }))
}
