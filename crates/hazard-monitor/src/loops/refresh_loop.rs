//! Periodic hazard refresh loop.
//!
//! Reloads the hazard store on a fixed interval while the session is active.
//! Failures back off exponentially; the store keeps serving its last good
//! snapshot in the meantime.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};

use crate::backoff::RetryBackoff;
use crate::store::HazardStore;

const MAX_BACKOFF_FACTOR: u32 = 10;

/// Refresh the store every `every` until shutdown.
///
/// The first tick is skipped; the session performs the initial load itself.
pub async fn run_refresh_loop(
    store: Arc<HazardStore>,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    if every.is_zero() {
        tracing::warn!("Periodic hazard refresh disabled: zero interval");
        return;
    }

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    let mut backoff = RetryBackoff::new(every, every.saturating_mul(MAX_BACKOFF_FACTOR));

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::debug!("Hazard refresh loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                if !backoff.is_ready() {
                    continue;
                }

                tokio::select! {
                    _ = shutdown.recv() => {
                        tracing::debug!("Hazard refresh cancelled by shutdown");
                        break;
                    }
                    result = store.refresh() => match result {
                        Ok(_) => backoff.on_success(),
                        Err(err) => {
                            let wait = backoff.on_failure();
                            tracing::warn!(
                                "Periodic hazard refresh failed ({} in a row), next attempt in {:?}: {}",
                                backoff.failures(),
                                wait,
                                err
                            );
                        }
                    }
                }
            }
        }
    }
}
