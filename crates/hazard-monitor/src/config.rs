//! Service configuration from environment.

use hazard_core::MatchPolicy;
use hazard_sources::{ApiSource, FileSource, HazardSource, RecordsSource, SourceChain};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::store::{DEFAULT_FETCH_LIMIT, DEFAULT_FETCH_TIMEOUT};

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: Option<String>,
    pub records_url: Option<String>,
    pub file_path: Option<PathBuf>,
    pub fetch_limit: usize,
    pub fetch_timeout: Duration,
    /// `None` disables periodic refresh
    pub refresh_interval: Option<Duration>,
    pub config_path: PathBuf,
    pub replay_path: Option<PathBuf>,
    pub replay_interval: Duration,
    pub webhook_url: Option<String>,
    pub match_policy: MatchPolicy,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unparseable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            api_url: text("HAZARD_API_URL"),
            records_url: text("HAZARD_RECORDS_URL"),
            file_path: text("HAZARD_FILE_PATH").map(PathBuf::from),
            fetch_limit: text("HAZARD_FETCH_LIMIT")
                .and_then(|s| s.parse().ok())
                .filter(|limit| *limit > 0)
                .unwrap_or(DEFAULT_FETCH_LIMIT),
            fetch_timeout: text("HAZARD_FETCH_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_FETCH_TIMEOUT),
            refresh_interval: text("HAZARD_REFRESH_SECS")
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            config_path: text("HAZARD_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/alert_settings.json")),
            replay_path: text("HAZARD_REPLAY_PATH").map(PathBuf::from),
            replay_interval: text("HAZARD_REPLAY_INTERVAL_MS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(Duration::from_millis(1000)),
            webhook_url: text("HAZARD_WEBHOOK_URL"),
            match_policy: text("HAZARD_MATCH_POLICY")
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
        }
    }

    /// Chain the configured sources in priority order: API, records feed, file.
    pub fn build_source(&self) -> SourceChain {
        let mut sources: Vec<Arc<dyn HazardSource>> = Vec::new();
        if let Some(url) = &self.api_url {
            sources.push(Arc::new(ApiSource::with_timeout(url.clone(), self.fetch_timeout)));
        }
        if let Some(url) = &self.records_url {
            sources.push(Arc::new(RecordsSource::with_timeout(
                url.clone(),
                self.fetch_timeout,
            )));
        }
        if let Some(path) = &self.file_path {
            sources.push(Arc::new(FileSource::new(path.clone())));
        }
        SourceChain::new(sources)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = Config::default();
        assert_eq!(config.fetch_limit, 1000);
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
        assert_eq!(config.refresh_interval, None);
        assert_eq!(config.config_path, PathBuf::from("data/alert_settings.json"));
        assert_eq!(config.replay_interval, Duration::from_millis(1000));
        assert_eq!(config.match_policy, MatchPolicy::First);
        assert!(config.build_source().is_empty());
    }

    #[test]
    fn unparseable_values_fall_back() {
        let config = config(&[
            ("HAZARD_FETCH_LIMIT", "lots"),
            ("HAZARD_FETCH_TIMEOUT_SECS", "0"),
            ("HAZARD_REFRESH_SECS", "-5"),
            ("HAZARD_MATCH_POLICY", "closest"),
            ("HAZARD_API_URL", "   "),
        ]);
        assert_eq!(config.fetch_limit, 1000);
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
        assert_eq!(config.refresh_interval, None);
        assert_eq!(config.match_policy, MatchPolicy::First);
        assert_eq!(config.api_url, None);
    }

    #[test]
    fn sources_chain_in_priority_order() {
        let config = config(&[
            ("HAZARD_FILE_PATH", "data/zones.json"),
            ("HAZARD_RECORDS_URL", "http://localhost:5000"),
            ("HAZARD_API_URL", "http://localhost:3000"),
            ("HAZARD_REFRESH_SECS", "120"),
            ("HAZARD_MATCH_POLICY", "nearest"),
        ]);
        assert_eq!(config.refresh_interval, Some(Duration::from_secs(120)));
        assert_eq!(config.match_policy, MatchPolicy::Nearest);
        assert_eq!(config.build_source().names(), vec!["api", "records", "file"]);
    }
}
