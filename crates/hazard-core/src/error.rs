//! Error taxonomy shared by the alerting runtime and its collaborators.

use thiserror::Error;

/// Hazard data could not be loaded. Never fatal: the previous snapshot stays live.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {source_name} failed: {message}")]
    Http { source_name: String, message: String },

    #[error("{source_name} reported failure: {message}")]
    Upstream { source_name: String, message: String },

    #[error("malformed response from {source_name}: {message}")]
    Malformed { source_name: String, message: String },

    #[error("reading {path} failed: {message}")]
    Io { path: String, message: String },

    #[error("hazard fetch timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("no hazard sources configured")]
    NoSources,

    #[error("hazard fetch cancelled by session stop")]
    Cancelled,
}

/// The location stream refused or failed to start.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("location stream unavailable: {0}")]
    Unavailable(String),
}

/// An alert sink could not present an alert.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmissionError {
    #[error("alert sink {sink} unavailable: {reason}")]
    Unavailable { sink: String, reason: String },

    #[error("alert sink {sink} rejected the alert: {reason}")]
    Rejected { sink: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigStoreError {
    #[error("config store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
