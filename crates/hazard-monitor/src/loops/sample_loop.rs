//! Location sample loop.
//!
//! Feeds every delivered position through the dispatcher until shutdown or
//! until the stream ends.

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::dispatcher::AlertDispatcher;
use crate::location::LocationSubscription;

pub async fn run_sample_loop(
    dispatcher: Arc<AlertDispatcher>,
    mut subscription: LocationSubscription,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut samples = 0u64;
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                subscription.cancel();
                tracing::debug!("Sample loop shutting down after {} samples", samples);
                break;
            }
            next = subscription.next() => match next {
                Some(position) => {
                    samples += 1;
                    if let Some(event) = dispatcher.evaluate(&position) {
                        tracing::debug!("Alert fired for zone {}", event.zone.id);
                    }
                }
                None => {
                    // The session stays active; a stopped stream is not a stop request.
                    tracing::warn!("Location stream ended after {} samples", samples);
                    break;
                }
            }
        }
    }
}
