//! The hazard source trait and the in-memory source.

use async_trait::async_trait;
use hazard_core::{FetchError, HazardZone};

/// A backend that can list hazard zones.
#[async_trait]
pub trait HazardSource: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Fetch at most `limit` zones in the backend's preferred order.
    async fn fetch_hazards(&self, limit: usize) -> Result<Vec<HazardZone>, FetchError>;
}

/// Fixed list of zones, handy for demos and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    zones: Vec<HazardZone>,
}

impl StaticSource {
    pub fn new(zones: Vec<HazardZone>) -> Self {
        Self { zones }
    }
}

#[async_trait]
impl HazardSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_hazards(&self, limit: usize) -> Result<Vec<HazardZone>, FetchError> {
        Ok(self.zones.iter().take(limit).cloned().collect())
    }
}
