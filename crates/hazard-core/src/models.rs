//! Core data models for hazard proximity alerting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default alert radius applied to zones without a radius of their own.
pub const DEFAULT_ALERT_RADIUS_M: f64 = 500.0;
/// Minimum time between two alerts for the same zone.
pub const DEFAULT_COOLDOWN_MS: u64 = 300_000;
pub const DEFAULT_VOLUME_PERCENT: u8 = 80;
/// Vibration pattern (off/on pairs in milliseconds) attached to every alert.
pub const VIBRATION_PATTERN_MS: [u64; 4] = [0, 500, 200, 500];

/// Danger level of a reported incident.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
}

impl Severity {
    /// Alert radius used when a zone does not carry its own.
    pub fn default_radius_m(self) -> f64 {
        match self {
            Severity::High => 800.0,
            Severity::Medium => 500.0,
            Severity::Low => 300.0,
        }
    }

    /// Lenient parse for upstream feeds; unknown labels map to `Medium`.
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or_default()
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIGH" | "ALTO" => Ok(Severity::High),
            "MEDIUM" | "MEDIO" => Ok(Severity::Medium),
            "LOW" | "BAJO" => Ok(Severity::Low),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        };
        f.write_str(label)
    }
}

/// A reported incident location with its alerting radius.
///
/// Zones are immutable once built; the hazard store replaces the whole
/// set on refresh instead of mutating zones in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardZone {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub severity: Severity,
    /// Zone specific alert radius in meters
    #[serde(default)]
    pub radius_m: Option<f64>,
    /// Free-text label, usually the crime type
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reported_at: Option<DateTime<Utc>>,
}

impl HazardZone {
    /// Create a zone whose radius is derived from its severity.
    pub fn new(
        id: impl Into<String>,
        lat: f64,
        lon: f64,
        severity: Severity,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            lat,
            lon,
            severity,
            radius_m: Some(severity.default_radius_m()),
            label: label.into(),
            description: None,
            reported_at: None,
        }
    }

    /// Override the alert radius. `None` defers to the session default.
    pub fn with_radius(mut self, radius_m: Option<f64>) -> Self {
        self.radius_m = radius_m;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_reported_at(mut self, reported_at: DateTime<Utc>) -> Self {
        self.reported_at = Some(reported_at);
        self
    }

    /// Radius that decides whether a position qualifies for this zone.
    pub fn effective_radius_m(&self, default_radius_m: f64) -> f64 {
        match self.radius_m {
            Some(radius) if radius.is_finite() && radius > 0.0 => radius,
            _ => default_radius_m,
        }
    }

    /// True when the center is a usable WGS84 coordinate.
    pub fn has_valid_center(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// A single location sample from the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    pub timestamp: DateTime<Utc>,
    /// Reported horizontal accuracy in meters
    #[serde(default)]
    pub accuracy_m: Option<f64>,
}

impl Position {
    pub fn new(lat: f64, lon: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            lat,
            lon,
            timestamp,
            accuracy_m: None,
        }
    }

    pub fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy_m = Some(accuracy_m);
        self
    }
}

/// How the alert sinks should present an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCue {
    pub play_sound: bool,
    pub volume_percent: u8,
    pub vibrate: bool,
    pub vibration_pattern_ms: Vec<u64>,
}

impl AlertCue {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            play_sound: config.sound_enabled && config.volume_percent > 0,
            volume_percent: config.volume_percent,
            vibrate: config.vibration_enabled,
            vibration_pattern_ms: VIBRATION_PATTERN_MS.to_vec(),
        }
    }
}

/// An alert fired for a qualifying, non-throttled sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub zone: HazardZone,
    pub distance_m: f64,
    pub fired_at: DateTime<Utc>,
    pub cue: AlertCue,
}

impl AlertEvent {
    /// One-line notification text, e.g. `ROBBERY - 312m away`.
    pub fn headline(&self) -> String {
        format!("{} - {}m away", self.zone.label, self.distance_m as i64)
    }
}

/// User adjustable alerting settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub alert_radius_m: f64,
    pub cooldown_ms: u64,
    pub sound_enabled: bool,
    pub vibration_enabled: bool,
    pub volume_percent: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            alert_radius_m: DEFAULT_ALERT_RADIUS_M,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            sound_enabled: true,
            vibration_enabled: true,
            volume_percent: DEFAULT_VOLUME_PERCENT,
        }
    }
}

impl SessionConfig {
    /// Set the volume, clamped to 0..=100.
    pub fn set_volume_percent(&mut self, volume: i64) {
        self.volume_percent = volume.clamp(0, 100) as u8;
    }

    /// Set the default radius; non-positive or non-finite values are ignored.
    pub fn set_alert_radius_m(&mut self, radius_m: f64) {
        if radius_m.is_finite() && radius_m > 0.0 {
            self.alert_radius_m = radius_m;
        }
    }

    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.cooldown_ms.min(i64::MAX as u64) as i64)
    }
}
