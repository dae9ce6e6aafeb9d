//! Alert dispatch: proximity check, throttle, sink emission.

use hazard_core::{AlertCue, AlertEvent, AlertThrottle, MatchPolicy, Position, SessionConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crate::clock::Clock;
use crate::sinks::AlertSink;
use crate::store::HazardStore;

/// Turns location samples into alerts.
///
/// `evaluate` may be called from several tasks at once. The throttle check,
/// the throttle update and sink emission all run under one mutex, so a burst
/// of samples for the same zone yields a single alert.
pub struct AlertDispatcher {
    store: Arc<HazardStore>,
    clock: Arc<dyn Clock>,
    policy: MatchPolicy,
    sinks: Vec<Arc<dyn AlertSink>>,
    config: RwLock<SessionConfig>,
    throttle: Mutex<AlertThrottle>,
    armed: AtomicBool,
}

impl AlertDispatcher {
    pub fn new(store: Arc<HazardStore>, clock: Arc<dyn Clock>) -> Self {
        let config = SessionConfig::default();
        let throttle = AlertThrottle::new(config.cooldown());
        Self {
            store,
            clock,
            policy: MatchPolicy::default(),
            sinks: Vec::new(),
            config: RwLock::new(config),
            throttle: Mutex::new(throttle),
            armed: AtomicBool::new(true),
        }
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_config(self, config: SessionConfig) -> Self {
        self.set_config(config);
        self
    }

    pub fn store(&self) -> &Arc<HazardStore> {
        &self.store
    }

    /// Evaluate one sample. Returns the alert if one was fired.
    pub fn evaluate(&self, position: &Position) -> Option<AlertEvent> {
        if !self.is_armed() {
            return None;
        }

        let config = self.config();
        let hazards = self.store.snapshot();
        let (zone, distance_m) = self
            .policy
            .find(position, &hazards, config.alert_radius_m)?;

        let now = self.clock.now();
        let mut throttle = self.lock_throttle();
        // Disarming takes this lock, so nothing fires once disarm() returns.
        if !self.is_armed() {
            return None;
        }
        if !throttle.should_fire(&zone.id, now) {
            tracing::debug!(
                "Suppressed alert for {} at {}m (cooldown)",
                zone.id,
                distance_m as i64
            );
            return None;
        }
        throttle.record(&zone.id, now);

        let event = AlertEvent {
            zone: zone.clone(),
            distance_m,
            fired_at: now,
            cue: AlertCue::from_config(&config),
        };
        tracing::info!(
            "Alert for zone {} ({}) at {}m",
            event.zone.id,
            event.zone.severity,
            distance_m as i64
        );

        for sink in &self.sinks {
            if let Err(err) = sink.emit(&event) {
                tracing::warn!("Alert sink {} failed: {}", sink.name(), err);
            }
        }
        drop(throttle);

        Some(event)
    }

    pub fn config(&self) -> SessionConfig {
        self.config
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set_config(&self, config: SessionConfig) {
        self.update_config(|current| *current = config);
    }

    /// Mutate the live settings; the cooldown change applies to the next check.
    pub fn update_config<F>(&self, apply: F) -> SessionConfig
    where
        F: FnOnce(&mut SessionConfig),
    {
        let updated = {
            let mut config = self
                .config
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            apply(&mut config);
            config.clone()
        };
        self.lock_throttle().set_cooldown(updated.cooldown());
        updated
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Stop firing alerts. Waits for an in-progress emission to finish.
    pub fn disarm(&self) {
        let _throttle = self.lock_throttle();
        self.armed.store(false, Ordering::SeqCst);
    }

    pub fn reset_throttle(&self) {
        self.lock_throttle().clear();
    }

    pub fn release_sinks(&self) {
        for sink in &self.sinks {
            sink.release();
        }
    }

    fn lock_throttle(&self) -> MutexGuard<'_, AlertThrottle> {
        self.throttle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::sinks::ChannelSink;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use hazard_core::spatial::destination_point;
    use hazard_core::{EmissionError, FetchError, HazardZone, Severity};
    use hazard_sources::{HazardSource, StaticSource};
    use std::sync::atomic::AtomicUsize;

    const CENTER: (f64, f64) = (-16.4090, -71.5375);

    struct BrokenSpeaker {
        calls: AtomicUsize,
    }

    impl AlertSink for BrokenSpeaker {
        fn name(&self) -> &str {
            "speaker"
        }

        fn emit(&self, _event: &AlertEvent) -> Result<(), EmissionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(EmissionError::Unavailable {
                sink: "speaker".into(),
                reason: "audio device busy".into(),
            })
        }
    }

    struct Never;

    #[async_trait]
    impl HazardSource for Never {
        fn name(&self) -> &str {
            "never"
        }

        async fn fetch_hazards(&self, _limit: usize) -> Result<Vec<HazardZone>, FetchError> {
            Err(FetchError::NoSources)
        }
    }

    fn sample(clock: &ManualClock, east_m: f64) -> Position {
        let (lat, lon) =
            destination_point(CENTER.0, CENTER.1, east_m, std::f64::consts::FRAC_PI_2);
        Position::new(lat, lon, clock.now())
    }

    async fn store_with(zones: Vec<HazardZone>) -> Arc<HazardStore> {
        let store = Arc::new(HazardStore::new(Arc::new(StaticSource::new(zones))));
        store.refresh().await.unwrap();
        store
    }

    fn z1() -> HazardZone {
        HazardZone::new("z1", CENTER.0, CENTER.1, Severity::Medium, "ROBO").with_radius(Some(500.0))
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 2, 14, 19, 0, 0).unwrap(),
        ))
    }

    #[tokio::test]
    async fn arequipa_scenario_fires_throttles_and_refires() {
        let clock = clock();
        let (sink, mut alerts) = ChannelSink::channel();
        let dispatcher = AlertDispatcher::new(store_with(vec![z1()]).await, clock.clone())
            .with_sink(Arc::new(sink));

        let first = dispatcher.evaluate(&sample(&clock, 300.0)).expect("first alert");
        assert_eq!(first.zone.id, "z1");
        assert!((first.distance_m - 300.0).abs() < 0.01);
        assert_eq!(alerts.try_recv().unwrap().zone.id, "z1");

        clock.advance(Duration::seconds(10));
        assert!(dispatcher.evaluate(&sample(&clock, 200.0)).is_none());
        assert!(alerts.try_recv().is_err());

        clock.advance(Duration::seconds(301));
        let third = dispatcher.evaluate(&sample(&clock, 400.0)).expect("cooldown elapsed");
        assert_eq!(third.zone.id, "z1");
        assert_eq!(third.fired_at, clock.now());
        assert!(alerts.try_recv().is_ok());
    }

    #[tokio::test]
    async fn cooldown_boundary_is_inclusive() {
        let clock = clock();
        let dispatcher = AlertDispatcher::new(store_with(vec![z1()]).await, clock.clone());

        assert!(dispatcher.evaluate(&sample(&clock, 100.0)).is_some());
        clock.advance(Duration::milliseconds(299_999));
        assert!(dispatcher.evaluate(&sample(&clock, 100.0)).is_none());
        clock.advance(Duration::milliseconds(1));
        assert!(dispatcher.evaluate(&sample(&clock, 100.0)).is_some());
    }

    #[tokio::test]
    async fn out_of_range_positions_never_alert() {
        let clock = clock();
        let (sink, mut alerts) = ChannelSink::channel();
        let dispatcher = AlertDispatcher::new(store_with(vec![z1()]).await, clock.clone())
            .with_sink(Arc::new(sink));

        for east_m in [500.5, 750.0, 5_000.0] {
            assert!(dispatcher.evaluate(&sample(&clock, east_m)).is_none());
        }
        assert!(alerts.try_recv().is_err());
    }

    #[tokio::test]
    async fn empty_store_never_alerts() {
        let clock = clock();
        let store = Arc::new(HazardStore::new(Arc::new(Never)));
        let _ = store.refresh().await;
        let dispatcher = AlertDispatcher::new(store, clock.clone());
        assert!(dispatcher.evaluate(&sample(&clock, 0.0)).is_none());
    }

    #[tokio::test]
    async fn sink_failure_still_counts_as_fired() {
        let clock = clock();
        let speaker = Arc::new(BrokenSpeaker {
            calls: AtomicUsize::new(0),
        });
        let (sink, mut alerts) = ChannelSink::channel();
        let dispatcher = AlertDispatcher::new(store_with(vec![z1()]).await, clock.clone())
            .with_sink(speaker.clone())
            .with_sink(Arc::new(sink));

        assert!(dispatcher.evaluate(&sample(&clock, 50.0)).is_some());
        assert_eq!(speaker.calls.load(Ordering::SeqCst), 1);
        assert!(alerts.try_recv().is_ok(), "later sinks still run");

        clock.advance(Duration::seconds(5));
        assert!(dispatcher.evaluate(&sample(&clock, 50.0)).is_none());
        assert_eq!(speaker.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zones_are_throttled_independently() {
        let clock = clock();
        let (lat, lon) = destination_point(CENTER.0, CENTER.1, 2_000.0, 0.0);
        let z2 = HazardZone::new("z2", lat, lon, Severity::High, "HOMICIDIO");
        let dispatcher = AlertDispatcher::new(store_with(vec![z1(), z2]).await, clock.clone());

        assert_eq!(dispatcher.evaluate(&sample(&clock, 0.0)).unwrap().zone.id, "z1");
        let near_z2 = Position::new(lat, lon, clock.now());
        assert_eq!(dispatcher.evaluate(&near_z2).unwrap().zone.id, "z2");
    }

    #[tokio::test]
    async fn settings_flow_into_cue_radius_and_cooldown() {
        let clock = clock();
        let zone = z1().with_radius(None);
        let dispatcher = AlertDispatcher::new(store_with(vec![zone]).await, clock.clone());

        dispatcher.update_config(|config| {
            config.set_alert_radius_m(200.0);
            config.cooldown_ms = 60_000;
            config.sound_enabled = false;
        });
        assert!(dispatcher.evaluate(&sample(&clock, 250.0)).is_none());

        let event = dispatcher.evaluate(&sample(&clock, 150.0)).unwrap();
        assert!(!event.cue.play_sound);
        assert!(event.cue.vibrate);

        clock.advance(Duration::seconds(60));
        assert!(dispatcher.evaluate(&sample(&clock, 150.0)).is_some());
    }

    #[tokio::test]
    async fn disarmed_dispatcher_is_silent() {
        let clock = clock();
        let (sink, mut alerts) = ChannelSink::channel();
        let dispatcher = AlertDispatcher::new(store_with(vec![z1()]).await, clock.clone())
            .with_sink(Arc::new(sink));

        dispatcher.disarm();
        assert!(dispatcher.evaluate(&sample(&clock, 10.0)).is_none());
        assert!(alerts.try_recv().is_err());

        dispatcher.arm();
        assert!(dispatcher.evaluate(&sample(&clock, 10.0)).is_some());
    }

    #[tokio::test]
    async fn reset_throttle_allows_immediate_refire() {
        let clock = clock();
        let dispatcher = AlertDispatcher::new(store_with(vec![z1()]).await, clock.clone());
        assert!(dispatcher.evaluate(&sample(&clock, 10.0)).is_some());
        dispatcher.reset_throttle();
        assert!(dispatcher.evaluate(&sample(&clock, 10.0)).is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_burst_fires_once() {
        let clock = clock();
        let (sink, mut alerts) = ChannelSink::channel();
        let dispatcher = Arc::new(
            AlertDispatcher::new(store_with(vec![z1()]).await, clock.clone())
                .with_sink(Arc::new(sink)),
        );

        let position = sample(&clock, 120.0);
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move { dispatcher.evaluate(&position).is_some() })
            })
            .collect();

        let mut fired = 0;
        for handle in handles {
            if handle.await.unwrap() {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
        assert!(alerts.try_recv().is_ok());
        assert!(alerts.try_recv().is_err());
    }
}
