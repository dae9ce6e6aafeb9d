//! Client for the hazard REST API (`/api/ubicaciones`).

use async_trait::async_trait;
use hazard_core::{FetchError, HazardZone, Severity};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::http::{build_client, get_json, parse_timestamp, string_or_number, DEFAULT_HTTP_TIMEOUT};
use crate::source::HazardSource;

const SOURCE_NAME: &str = "api";

/// Envelope returned by every API endpoint.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Hazard location as serialized by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiLocation {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub latitud: f64,
    pub longitud: f64,
    pub tipo_crimen: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub fecha: Option<String>,
    #[serde(default)]
    pub nivel_peligro: Option<String>,
    #[serde(default)]
    pub radio_metros: Option<f64>,
}

impl ApiLocation {
    pub fn into_zone(self) -> HazardZone {
        let severity = self
            .nivel_peligro
            .as_deref()
            .map(Severity::from_label)
            .unwrap_or_default();
        let radius = self
            .radio_metros
            .filter(|radius| radius.is_finite() && *radius > 0.0)
            .unwrap_or_else(|| severity.default_radius_m());

        let mut zone = HazardZone::new(self.id, self.latitud, self.longitud, severity, self.tipo_crimen)
            .with_radius(Some(radius));
        if let Some(description) = self.descripcion.filter(|d| !d.trim().is_empty()) {
            zone = zone.with_description(description);
        }
        if let Some(reported_at) = self.fecha.as_deref().and_then(parse_timestamp) {
            zone = zone.with_reported_at(reported_at);
        }
        zone
    }
}

/// Unwrap an API envelope into zones, keeping at most `limit`.
pub fn zones_from_response(
    response: ApiResponse<Vec<ApiLocation>>,
    limit: usize,
) -> Result<Vec<HazardZone>, FetchError> {
    if !response.success {
        return Err(FetchError::Upstream {
            source_name: SOURCE_NAME.to_string(),
            message: response
                .message
                .unwrap_or_else(|| "request was not successful".to_string()),
        });
    }

    Ok(response
        .data
        .unwrap_or_default()
        .into_iter()
        .take(limit)
        .map(ApiLocation::into_zone)
        .collect())
}

/// HTTP client for the hazard REST API.
pub struct ApiSource {
    client: Client,
    base_url: String,
}

impl ApiSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_HTTP_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Zones within `radius_m` of a point, as filtered by the server.
    pub async fn fetch_nearby(
        &self,
        lat: f64,
        lon: f64,
        radius_m: f64,
    ) -> Result<Vec<HazardZone>, FetchError> {
        let url = format!("{}/api/ubicaciones/cercanas", self.base_url);
        let request = self
            .client
            .get(url)
            .query(&[("lat", lat), ("lng", lon), ("radio", radius_m)]);
        let response: ApiResponse<Vec<ApiLocation>> = get_json(request, SOURCE_NAME).await?;
        zones_from_response(response, usize::MAX)
    }
}

#[async_trait]
impl HazardSource for ApiSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch_hazards(&self, limit: usize) -> Result<Vec<HazardZone>, FetchError> {
        let url = format!("{}/api/ubicaciones", self.base_url);
        let response: ApiResponse<Vec<ApiLocation>> =
            get_json(self.client.get(url), SOURCE_NAME).await?;
        let zones = zones_from_response(response, limit)?;
        tracing::debug!("Fetched {} zones from {}", zones.len(), self.base_url);
        Ok(zones)
    }
}
