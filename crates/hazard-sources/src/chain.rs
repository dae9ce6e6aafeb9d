//! Prioritized fallback across several hazard sources.

use async_trait::async_trait;
use hazard_core::{FetchError, HazardZone};
use std::sync::Arc;

use crate::source::HazardSource;

/// Tries each source in order until one returns a non-empty zone set.
///
/// An empty success falls through to the next source. When every source is
/// exhausted the result is an empty success if any source succeeded, otherwise
/// the last error.
#[derive(Clone, Default)]
pub struct SourceChain {
    sources: Vec<Arc<dyn HazardSource>>,
}

impl SourceChain {
    pub fn new(sources: Vec<Arc<dyn HazardSource>>) -> Self {
        Self { sources }
    }

    pub fn push(mut self, source: Arc<dyn HazardSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }
}

#[async_trait]
impl HazardSource for SourceChain {
    fn name(&self) -> &str {
        "chain"
    }

    async fn fetch_hazards(&self, limit: usize) -> Result<Vec<HazardZone>, FetchError> {
        let mut last_error = None;
        let mut any_success = false;

        for source in &self.sources {
            match source.fetch_hazards(limit).await {
                Ok(zones) if !zones.is_empty() => {
                    tracing::debug!("Source {} returned {} zones", source.name(), zones.len());
                    return Ok(zones);
                }
                Ok(_) => {
                    tracing::debug!("Source {} returned no zones, trying next", source.name());
                    any_success = true;
                }
                Err(err) => {
                    tracing::warn!("Source {} failed: {}", source.name(), err);
                    last_error = Some(err);
                }
            }
        }

        if any_success {
            return Ok(Vec::new());
        }
        Err(last_error.unwrap_or(FetchError::NoSources))
    }
}
