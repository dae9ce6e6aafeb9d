//! Location-update streams feeding a monitoring session.

use async_trait::async_trait;
use chrono::Utc;
use hazard_core::{Position, SubscriptionError};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

const SUBSCRIPTION_BUFFER: usize = 16;

/// Desired delivery cadence for location updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationRequest {
    pub interval: Duration,
    /// Fastest rate the stream may deliver at
    pub min_interval: Duration,
    /// Longest a sample may be held back for batching
    pub max_delay: Duration,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            min_interval: Duration::from_secs(15),
            max_delay: Duration::from_secs(60),
        }
    }
}

type CancelHook = Box<dyn FnOnce() + Send>;

/// Receiving end of a location subscription.
///
/// Cancelling (or dropping) closes the channel so producers stop delivering.
pub struct LocationSubscription {
    receiver: mpsc::Receiver<Position>,
    on_cancel: Option<CancelHook>,
}

impl LocationSubscription {
    pub fn new(receiver: mpsc::Receiver<Position>) -> Self {
        Self {
            receiver,
            on_cancel: None,
        }
    }

    /// Run `hook` once when the subscription is cancelled.
    pub fn on_cancel(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_cancel = Some(Box::new(hook));
        self
    }

    /// Next sample, or `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<Position> {
        self.receiver.recv().await
    }

    pub fn cancel(&mut self) {
        self.receiver.close();
        if let Some(hook) = self.on_cancel.take() {
            hook();
        }
    }
}

impl Drop for LocationSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[async_trait]
pub trait LocationStream: Send + Sync {
    async fn subscribe(
        &self,
        request: &LocationRequest,
    ) -> Result<LocationSubscription, SubscriptionError>;
}

#[derive(Default)]
struct ChannelInner {
    denied: AtomicBool,
    sender: Mutex<Option<mpsc::Sender<Position>>>,
}

/// Location stream driven by the host pushing samples.
///
/// Platform glue (an OS location callback, a GPS reader) calls
/// [`ChannelLocationStream::push`]; the active subscription receives them.
#[derive(Clone, Default)]
pub struct ChannelLocationStream {
    inner: Arc<ChannelInner>,
}

impl ChannelLocationStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next subscriptions fail as if location permission was revoked.
    pub fn deny_permission(&self) {
        self.inner.denied.store(true, Ordering::SeqCst);
    }

    pub fn grant_permission(&self) {
        self.inner.denied.store(false, Ordering::SeqCst);
    }

    /// Deliver a sample. Returns false when nobody is subscribed or the
    /// subscriber is saturated.
    pub fn push(&self, position: Position) -> bool {
        let guard = self
            .inner
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.as_ref() {
            Some(sender) => sender.try_send(position).is_ok(),
            None => false,
        }
    }

    /// End the stream for the current subscriber, as when the platform
    /// stops delivering updates.
    pub fn end(&self) {
        self.inner
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
    }

    /// Samples pushed but not yet taken by the subscriber.
    pub fn pending(&self) -> usize {
        self.inner
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map_or(0, |sender| sender.max_capacity() - sender.capacity())
    }

    pub fn is_subscribed(&self) -> bool {
        self.inner
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .is_some_and(|sender| !sender.is_closed())
    }
}

#[async_trait]
impl LocationStream for ChannelLocationStream {
    async fn subscribe(
        &self,
        request: &LocationRequest,
    ) -> Result<LocationSubscription, SubscriptionError> {
        if self.inner.denied.load(Ordering::SeqCst) {
            return Err(SubscriptionError::PermissionDenied);
        }

        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_BUFFER);
        *self
            .inner
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(sender);
        tracing::debug!("Location updates requested every {:?}", request.interval);

        let inner = self.inner.clone();
        Ok(LocationSubscription::new(receiver).on_cancel(move || {
            inner
                .sender
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .take();
        }))
    }
}

/// Replays a recorded track at a fixed pace, then ends.
#[derive(Debug, Clone)]
pub struct ReplayLocationStream {
    positions: Vec<Position>,
    pace: Duration,
    restamp: bool,
}

impl ReplayLocationStream {
    pub fn new(positions: Vec<Position>, pace: Duration) -> Self {
        Self {
            positions,
            pace,
            restamp: false,
        }
    }

    /// Replace recorded timestamps with the wall-clock delivery time.
    pub fn restamped(mut self) -> Self {
        self.restamp = true;
        self
    }

    /// Load a track stored as one JSON [`Position`] per line.
    pub fn from_json_lines(path: impl AsRef<Path>, pace: Duration) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let positions = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                serde_json::from_str::<Position>(line)
                    .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
            })
            .collect::<std::io::Result<Vec<_>>>()?;
        Ok(Self::new(positions, pace))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[async_trait]
impl LocationStream for ReplayLocationStream {
    async fn subscribe(
        &self,
        _request: &LocationRequest,
    ) -> Result<LocationSubscription, SubscriptionError> {
        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let positions = self.positions.clone();
        let pace = self.pace;
        let restamp = self.restamp;

        let producer = tokio::spawn(async move {
            for (idx, mut position) in positions.into_iter().enumerate() {
                if idx > 0 && !pace.is_zero() {
                    tokio::time::sleep(pace).await;
                }
                if restamp {
                    position.timestamp = Utc::now();
                }
                if sender.send(position).await.is_err() {
                    break;
                }
            }
            tracing::debug!("Replay track finished");
        });

        Ok(LocationSubscription::new(receiver).on_cancel(move || producer.abort()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(lat: f64) -> Position {
        Position::new(lat, -71.5375, Utc::now())
    }

    #[tokio::test]
    async fn channel_stream_delivers_until_cancelled() {
        let stream = ChannelLocationStream::new();
        assert!(!stream.push(position(1.0)), "no subscriber yet");

        let mut subscription = stream.subscribe(&LocationRequest::default()).await.unwrap();
        assert!(stream.is_subscribed());
        assert!(stream.push(position(1.0)));
        assert_eq!(subscription.next().await.unwrap().lat, 1.0);

        subscription.cancel();
        assert!(!stream.is_subscribed());
        assert!(!stream.push(position(2.0)));
    }

    #[tokio::test]
    async fn pending_counts_undelivered_samples() {
        let stream = ChannelLocationStream::new();
        assert_eq!(stream.pending(), 0);

        let mut subscription = stream.subscribe(&LocationRequest::default()).await.unwrap();
        stream.push(position(1.0));
        stream.push(position(2.0));
        assert_eq!(stream.pending(), 2);

        subscription.next().await.unwrap();
        assert_eq!(stream.pending(), 1);
        subscription.next().await.unwrap();
        assert_eq!(stream.pending(), 0);
    }

    #[tokio::test]
    async fn denied_permission_fails_subscription() {
        let stream = ChannelLocationStream::new();
        stream.deny_permission();
        assert_eq!(
            stream.subscribe(&LocationRequest::default()).await.err(),
            Some(SubscriptionError::PermissionDenied)
        );

        stream.grant_permission();
        assert!(stream.subscribe(&LocationRequest::default()).await.is_ok());
    }

    #[tokio::test]
    async fn ending_the_channel_ends_the_subscription() {
        let stream = ChannelLocationStream::new();
        let mut subscription = stream.subscribe(&LocationRequest::default()).await.unwrap();
        stream.end();
        assert!(subscription.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn replay_emits_track_in_order_then_ends() {
        let stream = ReplayLocationStream::new(
            vec![position(1.0), position(2.0), position(3.0)],
            Duration::from_secs(15),
        );
        let mut subscription = stream.subscribe(&LocationRequest::default()).await.unwrap();

        let mut seen = Vec::new();
        while let Some(sample) = subscription.next().await {
            seen.push(sample.lat);
        }
        assert_eq!(seen, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn loads_json_lines_track() {
        let path = std::env::temp_dir().join(format!("hazard-track-{}.jsonl", std::process::id()));
        std::fs::write(
            &path,
            "{\"lat\": -16.41, \"lon\": -71.53, \"timestamp\": \"2025-01-01T10:00:00Z\"}\n\n\
             {\"lat\": -16.40, \"lon\": -71.53, \"timestamp\": \"2025-01-01T10:00:30Z\", \"accuracy_m\": 12.0}\n",
        )
        .unwrap();

        let replay = ReplayLocationStream::from_json_lines(&path, Duration::ZERO).unwrap();
        assert_eq!(replay.len(), 2);
        let _ = std::fs::remove_file(&path);
    }
}
