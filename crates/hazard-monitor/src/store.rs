//! Copy-on-write hazard zone store.

use chrono::{DateTime, Utc};
use hazard_core::{FetchError, HazardZone};
use hazard_sources::HazardSource;
use std::sync::{Arc, RwLock};
use std::time::Duration;

pub const DEFAULT_FETCH_LIMIT: usize = 1000;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Holds the current hazard set and refreshes it from a [`HazardSource`].
///
/// Readers get an `Arc` snapshot; a refresh builds the new set off-lock and
/// swaps it in, so evaluations never observe a partially loaded set. A failed
/// refresh leaves the previous snapshot in place.
pub struct HazardStore {
    source: Arc<dyn HazardSource>,
    zones: RwLock<Arc<[HazardZone]>>,
    last_refreshed: RwLock<Option<DateTime<Utc>>>,
    fetch_limit: usize,
    fetch_timeout: Duration,
}

impl HazardStore {
    pub fn new(source: Arc<dyn HazardSource>) -> Self {
        Self {
            source,
            zones: RwLock::new(Arc::from(Vec::new())),
            last_refreshed: RwLock::new(None),
            fetch_limit: DEFAULT_FETCH_LIMIT,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_limits(mut self, fetch_limit: usize, fetch_timeout: Duration) -> Self {
        self.fetch_limit = fetch_limit.max(1);
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Reload the whole zone set from the source.
    ///
    /// Returns the number of zones now held.
    pub async fn refresh(&self) -> Result<usize, FetchError> {
        let fetched = match tokio::time::timeout(
            self.fetch_timeout,
            self.source.fetch_hazards(self.fetch_limit),
        )
        .await
        {
            Ok(Ok(zones)) => zones,
            Ok(Err(err)) => {
                tracing::warn!(
                    "Hazard refresh from {} failed, keeping {} cached zones: {}",
                    self.source.name(),
                    self.len(),
                    err
                );
                return Err(err);
            }
            Err(_) => {
                tracing::warn!(
                    "Hazard refresh from {} timed out after {:?}",
                    self.source.name(),
                    self.fetch_timeout
                );
                return Err(FetchError::Timeout(self.fetch_timeout));
            }
        };

        let total = fetched.len();
        let zones: Vec<HazardZone> = fetched
            .into_iter()
            .filter(HazardZone::has_valid_center)
            .collect();
        if zones.len() < total {
            tracing::warn!("Dropped {} zone(s) with invalid coordinates", total - zones.len());
        }

        let count = zones.len();
        *self.zones.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = Arc::from(zones);
        *self
            .last_refreshed
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Utc::now());

        tracing::info!("Loaded {} hazard zones from {}", count, self.source.name());
        Ok(count)
    }

    /// Current zone set in source order.
    pub fn snapshot(&self) -> Arc<[HazardZone]> {
        self.zones
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// When the last successful refresh completed.
    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        *self
            .last_refreshed
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
