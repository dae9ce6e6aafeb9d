//! Monitoring session lifecycle.
//!
//! A session owns the background work of one monitoring run: the initial
//! hazard load, the location sample loop and the optional periodic refresh.
//! All of it hangs off one broadcast shutdown channel, so `stop` never waits
//! on the network.

use hazard_core::{ConfigStoreError, FetchError, SessionConfig, SubscriptionError};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::config_store::{ConfigKey, ConfigStore};
use crate::dispatcher::AlertDispatcher;
use crate::location::{LocationRequest, LocationStream};
use crate::loops::{refresh_loop::run_refresh_loop, sample_loop::run_sample_loop};
use crate::store::HazardStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Stopped,
    Starting,
    Active,
    Stopping,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Stopped => "stopped",
            SessionState::Starting => "starting",
            SessionState::Active => "active",
            SessionState::Stopping => "stopping",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("monitoring session is already {0}")]
    AlreadyRunning(SessionState),

    #[error("location subscription failed: {0}")]
    Subscription(#[from] SubscriptionError),
}

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub location_request: LocationRequest,
    /// Periodic hazard refresh while active; `None` loads once per start.
    pub refresh_interval: Option<Duration>,
}

struct Running {
    shutdown: broadcast::Sender<()>,
    tasks: Vec<JoinHandle<()>>,
}

pub struct MonitoringSession {
    dispatcher: Arc<AlertDispatcher>,
    locations: Arc<dyn LocationStream>,
    settings: Arc<dyn ConfigStore>,
    options: SessionOptions,
    state: watch::Sender<SessionState>,
    running: Mutex<Option<Running>>,
    lifecycle: tokio::sync::Mutex<()>,
}

impl MonitoringSession {
    pub fn new(
        dispatcher: Arc<AlertDispatcher>,
        locations: Arc<dyn LocationStream>,
        settings: Arc<dyn ConfigStore>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Stopped);
        Self {
            dispatcher,
            locations,
            settings,
            options: SessionOptions::default(),
            state,
            running: Mutex::new(None),
            lifecycle: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn dispatcher(&self) -> &Arc<AlertDispatcher> {
        &self.dispatcher
    }

    pub fn store(&self) -> &Arc<HazardStore> {
        self.dispatcher.store()
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Start monitoring. Only valid from `Stopped`.
    ///
    /// The initial hazard load runs in the background; the call returns once
    /// the location subscription is in place.
    pub async fn start(&self) -> Result<(), SessionError> {
        let _lifecycle = self.lifecycle.lock().await;
        let current = self.state();
        if current != SessionState::Stopped {
            return Err(SessionError::AlreadyRunning(current));
        }
        self.transition(SessionState::Starting);

        self.dispatcher
            .set_config(self.settings.load_session_config());
        self.dispatcher.reset_throttle();
        self.dispatcher.arm();

        let (shutdown, _) = broadcast::channel(4);
        let mut tasks = vec![tokio::spawn(initial_refresh(
            self.store().clone(),
            shutdown.subscribe(),
        ))];

        let subscription = match self
            .locations
            .subscribe(&self.options.location_request)
            .await
        {
            Ok(subscription) => subscription,
            Err(err) => {
                tracing::warn!("Location subscription failed, monitoring not started: {}", err);
                self.dispatcher.disarm();
                let _ = shutdown.send(());
                join_all(tasks).await;
                self.persist_detection(false);
                self.transition(SessionState::Stopped);
                return Err(err.into());
            }
        };

        tasks.push(tokio::spawn(run_sample_loop(
            self.dispatcher.clone(),
            subscription,
            shutdown.subscribe(),
        )));
        if let Some(every) = self.options.refresh_interval.filter(|every| !every.is_zero()) {
            tasks.push(tokio::spawn(run_refresh_loop(
                self.store().clone(),
                every,
                shutdown.subscribe(),
            )));
        }

        *self
            .running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Running { shutdown, tasks });
        self.transition(SessionState::Active);
        self.persist_detection(true);
        Ok(())
    }

    /// Stop monitoring and clear the persisted detection flag.
    /// Stopping a stopped session is a no-op.
    pub async fn stop(&self) {
        self.halt(true).await;
    }

    /// Stop monitoring for process exit. The persisted detection flag is
    /// left alone so the next launch resumes.
    pub async fn shutdown(&self) {
        self.halt(false).await;
    }

    async fn halt(&self, clear_detection: bool) {
        let _lifecycle = self.lifecycle.lock().await;
        let running = {
            let mut slot = self
                .running
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let running = slot.take();
            // Under the slot lock so `reload` never sees a run that is gone
            // without also seeing `Stopping`.
            if running.is_some() {
                self.transition(SessionState::Stopping);
            }
            running
        };
        let Some(running) = running else {
            return;
        };

        self.dispatcher.disarm();
        let _ = running.shutdown.send(());
        join_all(running.tasks).await;

        self.dispatcher.release_sinks();
        self.dispatcher.reset_throttle();
        if clear_detection {
            self.persist_detection(false);
        }
        self.transition(SessionState::Stopped);
    }

    /// Start if the settings say detection was on when the process last ran.
    pub async fn resume_if_persisted(&self) -> Result<bool, SessionError> {
        if !self.settings.get_bool(ConfigKey::DetectionActive) {
            return Ok(false);
        }
        if self.state() != SessionState::Stopped {
            return Ok(false);
        }
        tracing::info!("Resuming monitoring from persisted settings");
        self.start().await?;
        Ok(true)
    }

    /// User-triggered hazard reload.
    ///
    /// While a run is active the reload is tied to its shutdown channel, so
    /// `stop` cancels it and a late fetch never reaches the store.
    pub async fn reload(&self) -> Result<usize, FetchError> {
        let shutdown = {
            let slot = self
                .running
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match slot.as_ref() {
                Some(running) => Some(running.shutdown.subscribe()),
                None if self.state() == SessionState::Stopping => {
                    return Err(FetchError::Cancelled)
                }
                None => None,
            }
        };

        let Some(mut shutdown) = shutdown else {
            return self.store().refresh().await;
        };
        tokio::select! {
            biased;
            _ = shutdown.recv() => {
                tracing::debug!("Hazard reload cancelled by stop");
                Err(FetchError::Cancelled)
            }
            result = self.store().refresh() => result,
        }
    }

    pub fn config(&self) -> SessionConfig {
        self.dispatcher.config()
    }

    pub fn set_alert_radius_m(&self, radius_m: f64) -> Result<SessionConfig, ConfigStoreError> {
        self.apply_settings(|config| config.set_alert_radius_m(radius_m))
    }

    pub fn set_cooldown_ms(&self, cooldown_ms: u64) -> Result<SessionConfig, ConfigStoreError> {
        self.apply_settings(|config| config.cooldown_ms = cooldown_ms)
    }

    pub fn set_sound_enabled(&self, enabled: bool) -> Result<SessionConfig, ConfigStoreError> {
        self.apply_settings(|config| config.sound_enabled = enabled)
    }

    pub fn set_vibration_enabled(&self, enabled: bool) -> Result<SessionConfig, ConfigStoreError> {
        self.apply_settings(|config| config.vibration_enabled = enabled)
    }

    pub fn set_volume_percent(&self, volume: i64) -> Result<SessionConfig, ConfigStoreError> {
        self.apply_settings(|config| config.set_volume_percent(volume))
    }

    /// Applied live, then persisted. A failed write keeps the live change.
    fn apply_settings<F>(&self, apply: F) -> Result<SessionConfig, ConfigStoreError>
    where
        F: FnOnce(&mut SessionConfig),
    {
        let updated = self.dispatcher.update_config(apply);
        self.settings.save_session_config(&updated)?;
        Ok(updated)
    }

    fn persist_detection(&self, active: bool) {
        if let Err(err) = self.settings.set(ConfigKey::DetectionActive, active.into()) {
            tracing::warn!("Failed to persist detection flag: {}", err);
        }
    }

    fn transition(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        tracing::info!("Monitoring session {} -> {}", previous, next);
    }
}

impl Drop for MonitoringSession {
    fn drop(&mut self) {
        let running = self
            .running
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(running) = running {
            self.dispatcher.disarm();
            let _ = running.shutdown.send(());
        }
    }
}

async fn initial_refresh(store: Arc<HazardStore>, mut shutdown: broadcast::Receiver<()>) {
    tokio::select! {
        _ = shutdown.recv() => {
            tracing::debug!("Initial hazard load cancelled");
        }
        result = store.refresh() => {
            if let Err(err) = result {
                tracing::debug!("Initial hazard load failed: {}", err);
            }
        }
    }
}

async fn join_all(tasks: Vec<JoinHandle<()>>) {
    for task in tasks {
        if let Err(err) = task.await {
            if err.is_panic() {
                tracing::error!("Monitoring task panicked: {}", err);
            }
        }
    }
}
