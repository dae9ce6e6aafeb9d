//! Client for the crime-records feed (`/records?limit=N`).
//!
//! Records are raw incident rows; their severity is derived from the crime
//! type and the zone radius from that severity.

use async_trait::async_trait;
use hazard_core::{classify_crime, FetchError, HazardZone};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::http::{build_client, get_json, parse_timestamp, string_or_number, DEFAULT_HTTP_TIMEOUT};
use crate::source::HazardSource;

const SOURCE_NAME: &str = "records";

#[derive(Debug, Deserialize)]
pub struct RecordsPage {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub records: Vec<CrimeRecord>,
}

/// One incident row as served by the feed.
#[derive(Debug, Clone, Deserialize)]
pub struct CrimeRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub primary_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub arrest: bool,
    #[serde(default)]
    pub domestic: bool,
}

impl CrimeRecord {
    /// Convert to a zone; rows without coordinates yield `None`.
    pub fn into_zone(self) -> Option<HazardZone> {
        let (lat, lon) = (self.latitude?, self.longitude?);
        let primary_type = self
            .primary_type
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "UNKNOWN".to_string());
        let severity = classify_crime(&primary_type, self.arrest, self.domestic);

        let mut zone = HazardZone::new(self.id, lat, lon, severity, primary_type);
        if let Some(description) = self.description {
            zone = zone.with_description(description);
        }
        if let Some(reported_at) = self.date.as_deref().and_then(parse_timestamp) {
            zone = zone.with_reported_at(reported_at);
        }
        Some(zone)
    }
}

/// Turn a feed page into zones, skipping rows without a location.
pub fn zones_from_page(page: RecordsPage, limit: usize) -> Vec<HazardZone> {
    let total = page.records.len();
    let zones: Vec<HazardZone> = page
        .records
        .into_iter()
        .filter_map(CrimeRecord::into_zone)
        .take(limit)
        .collect();
    if zones.len() < total.min(limit) {
        tracing::debug!(
            "Skipped {} record(s) without coordinates",
            total.min(limit) - zones.len()
        );
    }
    zones
}

/// HTTP client for the records feed.
pub struct RecordsSource {
    client: Client,
    base_url: String,
}

impl RecordsSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_HTTP_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl HazardSource for RecordsSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch_hazards(&self, limit: usize) -> Result<Vec<HazardZone>, FetchError> {
        let url = format!("{}/records", self.base_url);
        let request = self.client.get(url).query(&[("limit", limit)]);
        let page: RecordsPage = get_json(request, SOURCE_NAME).await?;
        tracing::debug!("Records feed reported {} row(s)", page.count);
        Ok(zones_from_page(page, limit))
    }
}
