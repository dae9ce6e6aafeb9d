//! Hazard zones loaded from a JSON file on disk.

use async_trait::async_trait;
use hazard_core::{FetchError, HazardZone};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::source::HazardSource;

/// Reads a JSON array of [`HazardZone`] on every fetch.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl HazardSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch_hazards(&self, limit: usize) -> Result<Vec<HazardZone>, FetchError> {
        let bytes = fs::read(&self.path).await.map_err(|err| FetchError::Io {
            path: self.path.display().to_string(),
            message: err.to_string(),
        })?;
        let mut zones: Vec<HazardZone> =
            serde_json::from_slice(&bytes).map_err(|err| FetchError::Malformed {
                source_name: self.name().to_string(),
                message: err.to_string(),
            })?;
        zones.truncate(limit);
        Ok(zones)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("hazard-file-source-{}-{}", std::process::id(), name))
    }

    #[tokio::test]
    async fn reads_zone_array() {
        let path = temp_path("ok.json");
        let body = r#"[
            {"id": "z1", "lat": -16.409, "lon": -71.5375, "severity": "HIGH", "radius_m": 800.0, "label": "ROBBERY"},
            {"id": "z2", "lat": -16.400, "lon": -71.5300, "label": "THEFT"}
        ]"#;
        fs::write(&path, body).await.unwrap();

        let zones = FileSource::new(&path).fetch_hazards(10).await.unwrap();
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].id, "z1");

        let zones = FileSource::new(&path).fetch_hazards(1).await.unwrap();
        assert_eq!(zones.len(), 1);

        let _ = fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let err = FileSource::new(temp_path("missing.json"))
            .fetch_hazards(10)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Io { .. }));
    }

    #[tokio::test]
    async fn garbage_is_malformed() {
        let path = temp_path("bad.json");
        fs::write(&path, b"{not json").await.unwrap();

        let err = FileSource::new(&path).fetch_hazards(10).await.unwrap_err();
        assert!(matches!(err, FetchError::Malformed { .. }));

        let _ = fs::remove_file(&path).await;
    }
}
