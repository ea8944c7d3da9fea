//! Authoritative configuration sources.
//!
//! The engine treats the source as an opaque, possibly slow lookup.
//! Production wiring plugs in a real adapter; [`DeviceDefaultsSource`]
//! stands in when none is available.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::models::{ConfigurationRecord, parse_device_id};

/// Ground-truth lookup the cache stands in front of.
#[async_trait]
pub trait ConfigurationSource: Send + Sync {
    /// Resolve `id`, or `Ok(None)` if the source has no such device.
    async fn lookup(&self, id: &str) -> Result<Option<ConfigurationRecord>>;
}

/// Resolves structured ids (`INV-NORTH-000001`) to their category defaults.
///
/// Ids that do not follow the naming scheme are reported as not found.
pub struct DeviceDefaultsSource {
    clock: Arc<dyn Clock>,
    latency: Option<Duration>,
}

impl DeviceDefaultsSource {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            latency: None,
        }
    }

    /// Simulate a slow upstream.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

impl Default for DeviceDefaultsSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigurationSource for DeviceDefaultsSource {
    async fn lookup(&self, id: &str) -> Result<Option<ConfigurationRecord>> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let Some(parts) = parse_device_id(id) else {
            debug!("No defaults for unstructured id {}", id);
            return Ok(None);
        };

        Ok(Some(parts.category.default_record(id, parts.location, self.clock.now())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StorageInterval;

    #[tokio::test]
    async fn test_structured_id_resolves_to_defaults() {
        let record = DeviceDefaultsSource::new()
            .lookup("GW-WEST-000010")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.device_id, "GW-WEST-000010");
        assert_eq!(record.device_type, "Gateway");
        assert_eq!(record.storage_interval, StorageInterval::Daily);
        assert_eq!(record.max_data_age_days, 180);
        assert!(record.storage_enabled);
        assert_eq!(record.additional_properties.get("location").unwrap(), "WEST");
    }

    #[tokio::test]
    async fn test_latency_is_applied() {
        let source = DeviceDefaultsSource::new().with_latency(Duration::from_millis(20));
        let started = std::time::Instant::now();
        assert!(source.lookup("BAT-EAST-000002").await.unwrap().is_some());
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let found = DeviceDefaultsSource::new().lookup("PRDV-?").await.unwrap();
        assert!(found.is_none());
    }
}
