//! Shared HTTP plumbing for the REST-backed sources.

use chrono::{DateTime, NaiveDateTime, Utc};
use hazard_core::FetchError;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Upper bound for a single upstream request.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()
        .unwrap_or_else(|err| {
            tracing::warn!("Falling back to default HTTP client: {}", err);
            Client::new()
        })
}

/// GET `request` and decode a JSON body, mapping every failure to a [`FetchError`].
pub(crate) async fn get_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    source_name: &str,
) -> Result<T, FetchError> {
    let response = request.send().await.map_err(|err| FetchError::Http {
        source_name: source_name.to_string(),
        message: err.to_string(),
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|err| FetchError::Http {
        source_name: source_name.to_string(),
        message: err.to_string(),
    })?;

    if !status.is_success() {
        return Err(FetchError::Upstream {
            source_name: source_name.to_string(),
            message: format!("HTTP {}: {}", status, truncate(&body, 200)),
        });
    }

    serde_json::from_str(&body).map_err(|err| FetchError::Malformed {
        source_name: source_name.to_string(),
        message: err.to_string(),
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Accept ids sent either as JSON strings or numbers.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Int(value) => value.to_string(),
        Id::Float(value) => value.to_string(),
    })
}

/// Parse the timestamp formats the upstream feeds emit.
///
/// RFC 3339 first, then naive ISO and `yyyy-MM-dd HH:mm:ss`, both read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}
