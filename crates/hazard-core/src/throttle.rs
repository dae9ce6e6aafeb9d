//! Per-zone alert cooldown bookkeeping.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Tracks when each zone last fired an alert.
///
/// The throttle is not synchronized. Callers that evaluate concurrently must
/// hold one lock across [`AlertThrottle::should_fire`] and the following
/// [`AlertThrottle::record`], otherwise two samples can both pass the check.
#[derive(Debug, Clone)]
pub struct AlertThrottle {
    cooldown: Duration,
    last_fired: HashMap<String, DateTime<Utc>>,
}

impl Default for AlertThrottle {
    fn default() -> Self {
        Self::new(Duration::milliseconds(crate::models::DEFAULT_COOLDOWN_MS as i64))
    }
}

impl AlertThrottle {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_fired: HashMap::new(),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn set_cooldown(&mut self, cooldown: Duration) {
        self.cooldown = cooldown;
    }

    /// True if `zone_id` never fired or its cooldown has fully elapsed at `now`.
    pub fn should_fire(&self, zone_id: &str, now: DateTime<Utc>) -> bool {
        match self.last_fired.get(zone_id) {
            Some(last) => now.signed_duration_since(*last) >= self.cooldown,
            None => true,
        }
    }

    /// Record that an alert for `zone_id` was dispatched at `now`.
    pub fn record(&mut self, zone_id: &str, now: DateTime<Utc>) {
        self.last_fired.insert(zone_id.to_string(), now);
    }

    pub fn last_fired(&self, zone_id: &str) -> Option<DateTime<Utc>> {
        self.last_fired.get(zone_id).copied()
    }

    pub fn len(&self) -> usize {
        self.last_fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_fired.is_empty()
    }

    pub fn clear(&mut self) {
        self.last_fired.clear();
    }
}
