//! Persisted user settings.
//!
//! Keys keep the names the mobile client stored them under so an exported
//! settings file can be dropped in unchanged.

use dashmap::DashMap;
use hazard_core::models::{DEFAULT_ALERT_RADIUS_M, DEFAULT_COOLDOWN_MS, DEFAULT_VOLUME_PERCENT};
use hazard_core::{ConfigStoreError, SessionConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    AlertRadiusM,
    CooldownMs,
    SoundEnabled,
    VibrationEnabled,
    VolumePercent,
    DetectionActive,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 6] = [
        ConfigKey::AlertRadiusM,
        ConfigKey::CooldownMs,
        ConfigKey::SoundEnabled,
        ConfigKey::VibrationEnabled,
        ConfigKey::VolumePercent,
        ConfigKey::DetectionActive,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ConfigKey::AlertRadiusM => "distancia_alerta",
            ConfigKey::CooldownMs => "cooldown_ms",
            ConfigKey::SoundEnabled => "sonido_activo",
            ConfigKey::VibrationEnabled => "vibracion_activa",
            ConfigKey::VolumePercent => "volumen_alerta",
            ConfigKey::DetectionActive => "deteccion_activa",
        }
    }

    pub fn default_value(self) -> ConfigValue {
        match self {
            ConfigKey::AlertRadiusM => ConfigValue::Float(DEFAULT_ALERT_RADIUS_M),
            ConfigKey::CooldownMs => ConfigValue::Int(DEFAULT_COOLDOWN_MS as i64),
            ConfigKey::SoundEnabled => ConfigValue::Bool(true),
            ConfigKey::VibrationEnabled => ConfigValue::Bool(true),
            ConfigKey::VolumePercent => ConfigValue::Int(i64::from(DEFAULT_VOLUME_PERCENT)),
            ConfigKey::DetectionActive => ConfigValue::Bool(false),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl ConfigValue {
    fn from_json(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(b),
            ConfigValue::Int(0) => Some(false),
            ConfigValue::Int(1) => Some(true),
            _ => None,
        }
    }

    pub fn as_i64(self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(i),
            ConfigValue::Float(f) if f.is_finite() => Some(f.round() as i64),
            _ => None,
        }
    }

    pub fn as_f64(self) -> Option<f64> {
        match self {
            ConfigValue::Int(i) => Some(i as f64),
            ConfigValue::Float(f) => Some(f),
            ConfigValue::Bool(_) => None,
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Int(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Float(value)
    }
}

pub trait ConfigStore: Send + Sync {
    /// Stored value, if any.
    fn get_raw(&self, key: ConfigKey) -> Option<ConfigValue>;

    fn set(&self, key: ConfigKey, value: ConfigValue) -> Result<(), ConfigStoreError>;

    /// Stored value, or the key's default when absent.
    fn get(&self, key: ConfigKey) -> ConfigValue {
        self.get_raw(key).unwrap_or_else(|| key.default_value())
    }

    fn get_bool(&self, key: ConfigKey) -> bool {
        self.get(key)
            .as_bool()
            .or_else(|| key.default_value().as_bool())
            .unwrap_or(false)
    }

    fn get_i64(&self, key: ConfigKey) -> i64 {
        self.get(key)
            .as_i64()
            .or_else(|| key.default_value().as_i64())
            .unwrap_or(0)
    }

    fn get_f64(&self, key: ConfigKey) -> f64 {
        self.get(key)
            .as_f64()
            .or_else(|| key.default_value().as_f64())
            .unwrap_or(0.0)
    }

    fn load_session_config(&self) -> SessionConfig {
        let mut config = SessionConfig::default();
        config.set_alert_radius_m(self.get_f64(ConfigKey::AlertRadiusM));
        config.cooldown_ms = self.get_i64(ConfigKey::CooldownMs).max(0) as u64;
        config.sound_enabled = self.get_bool(ConfigKey::SoundEnabled);
        config.vibration_enabled = self.get_bool(ConfigKey::VibrationEnabled);
        config.set_volume_percent(self.get_i64(ConfigKey::VolumePercent));
        config
    }

    fn save_session_config(&self, config: &SessionConfig) -> Result<(), ConfigStoreError> {
        self.set(ConfigKey::AlertRadiusM, config.alert_radius_m.into())?;
        self.set(
            ConfigKey::CooldownMs,
            (config.cooldown_ms.min(i64::MAX as u64) as i64).into(),
        )?;
        self.set(ConfigKey::SoundEnabled, config.sound_enabled.into())?;
        self.set(ConfigKey::VibrationEnabled, config.vibration_enabled.into())?;
        self.set(
            ConfigKey::VolumePercent,
            i64::from(config.volume_percent).into(),
        )
    }
}

/// In-process settings; lost on exit.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    values: DashMap<ConfigKey, ConfigValue>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get_raw(&self, key: ConfigKey) -> Option<ConfigValue> {
        self.values.get(&key).map(|entry| *entry.value())
    }

    fn set(&self, key: ConfigKey, value: ConfigValue) -> Result<(), ConfigStoreError> {
        self.values.insert(key, value);
        Ok(())
    }
}

/// Settings kept in a flat JSON object, rewritten on every `set`.
///
/// Unknown keys in the file are preserved.
#[derive(Debug)]
pub struct JsonFileConfigStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, Value>>,
}

impl JsonFileConfigStore {
    /// Open the settings file; a missing file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigStoreError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        tracing::debug!("Loaded {} settings from {}", values.len(), path.display());
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, Value>) -> Result<(), ConfigStoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let payload = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, payload)?;
        Ok(())
    }
}

impl ConfigStore for JsonFileConfigStore {
    fn get_raw(&self, key: ConfigKey) -> Option<ConfigValue> {
        let values = self
            .values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        values.get(key.name()).and_then(ConfigValue::from_json)
    }

    fn set(&self, key: ConfigKey, value: ConfigValue) -> Result<(), ConfigStoreError> {
        let mut values = self
            .values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        values.insert(key.name().to_string(), serde_json::to_value(value)?);
        self.persist(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("hazard-settings-{}-{}", tag, std::process::id()))
            .join("alert_settings.json")
    }

    #[test]
    fn key_names_are_unique() {
        let mut names: Vec<_> = ConfigKey::ALL.iter().map(|k| k.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ConfigKey::ALL.len());
        assert_eq!(ConfigKey::AlertRadiusM.name(), "distancia_alerta");
    }

    #[test]
    fn absent_keys_read_defaults() {
        let store = MemoryConfigStore::new();
        assert_eq!(store.get_f64(ConfigKey::AlertRadiusM), 500.0);
        assert_eq!(store.get_i64(ConfigKey::CooldownMs), 300_000);
        assert_eq!(store.get_i64(ConfigKey::VolumePercent), 80);
        assert!(store.get_bool(ConfigKey::SoundEnabled));
        assert!(!store.get_bool(ConfigKey::DetectionActive));
        assert_eq!(store.load_session_config(), SessionConfig::default());
    }

    #[test]
    fn mistyped_values_fall_back_to_defaults() {
        let store = MemoryConfigStore::new();
        store.set(ConfigKey::AlertRadiusM, true.into()).unwrap();
        store.set(ConfigKey::SoundEnabled, ConfigValue::Float(0.5)).unwrap();
        assert_eq!(store.get_f64(ConfigKey::AlertRadiusM), 500.0);
        assert!(store.get_bool(ConfigKey::SoundEnabled));
    }

    #[test]
    fn session_config_round_trips_through_store() {
        let store = MemoryConfigStore::new();
        let mut config = SessionConfig::default();
        config.set_alert_radius_m(750.0);
        config.cooldown_ms = 60_000;
        config.sound_enabled = false;
        config.set_volume_percent(35);
        store.save_session_config(&config).unwrap();

        assert_eq!(store.load_session_config(), config);
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let path = temp_path("reopen");
        let _ = std::fs::remove_file(&path);

        let store = JsonFileConfigStore::open(&path).unwrap();
        assert!(!store.get_bool(ConfigKey::DetectionActive));
        store.set(ConfigKey::DetectionActive, true.into()).unwrap();
        store.set(ConfigKey::AlertRadiusM, 650.0.into()).unwrap();
        drop(store);

        let reopened = JsonFileConfigStore::open(&path).unwrap();
        assert!(reopened.get_bool(ConfigKey::DetectionActive));
        assert_eq!(reopened.get_f64(ConfigKey::AlertRadiusM), 650.0);

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["deteccion_activa"], Value::Bool(true));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn file_store_keeps_unknown_keys() {
        let path = temp_path("unknown");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"tema": "oscuro", "volumen_alerta": 40}"#).unwrap();

        let store = JsonFileConfigStore::open(&path).unwrap();
        assert_eq!(store.get_i64(ConfigKey::VolumePercent), 40);
        store.set(ConfigKey::SoundEnabled, false.into()).unwrap();

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["tema"], Value::String("oscuro".to_string()));
        assert_eq!(raw["sonido_activo"], Value::Bool(false));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let path = temp_path("corrupt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            JsonFileConfigStore::open(&path),
            Err(ConfigStoreError::Serialization(_))
        ));
        let _ = std::fs::remove_file(&path);
    }
}
