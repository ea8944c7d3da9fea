//! Cache-aside configuration engine.
//!
//! Read path: backend, then authoritative source on a miss, then a
//! best-effort write-back. Nothing on the read path surfaces an error to
//! the caller; failures are logged and treated as "not found".
//!
//! Write paths stamp id and timestamp onto each record and propagate
//! backend failures.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{CacheError, Result};
use crate::models::ConfigurationRecord;
use crate::source::ConfigurationSource;
use crate::storage::{BackendKind, StorageBackend};

/// TTL applied to every cache write unless configured otherwise.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Stateless orchestrator over a storage backend and an authoritative source.
///
/// Calls are independent and may run concurrently for the same id. Two
/// concurrent misses may both hit the source and both populate the
/// backend; the last write wins.
#[derive(Clone)]
pub struct ConfigurationService {
    backend: Arc<dyn StorageBackend>,
    source: Arc<dyn ConfigurationSource>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl ConfigurationService {
    pub fn new(backend: Arc<dyn StorageBackend>, source: Arc<dyn ConfigurationSource>) -> Self {
        Self {
            backend,
            source,
            clock: Arc::new(SystemClock),
            ttl: DEFAULT_TTL,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Resolve a configuration, populating the cache on a miss.
    ///
    /// Returns `None` for an empty id, for ids unknown to the source, and
    /// whenever the source is unavailable. A returned record always carries
    /// `device_id == id`.
    pub async fn get_configuration(&self, id: &str) -> Option<ConfigurationRecord> {
        if id.is_empty() {
            debug!("Rejected lookup with empty id");
            return None;
        }

        match self.backend.get(id).await {
            Ok(Some(entry)) => {
                debug!("Cache hit for {}", id);
                let mut record = entry.payload;
                record.device_id = id.to_string();
                return Some(record);
            }
            Ok(None) => debug!("Cache miss for {}", id),
            Err(e) => warn!("Cache read for {} failed, treating as miss: {}", id, e),
        }

        let mut record = match self.source.lookup(id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("Source has no configuration for {}", id);
                return None;
            }
            Err(e) => {
                warn!("Source lookup for {} failed, treating as not found: {}", id, e);
                return None;
            }
        };

        record.stamp(id, self.clock.now());

        if let Err(e) = self.backend.set(id, &record, self.ttl).await {
            warn!("Failed to populate cache for {}: {}", id, e);
        }

        Some(record)
    }

    /// True if `id` resolves via [`get_configuration`](Self::get_configuration).
    ///
    /// The cache is consulted through a full read so an entry that fails to
    /// decode counts as a miss. A miss falls through to the source, which
    /// populates the cache when it knows the id.
    pub async fn exists(&self, id: &str) -> bool {
        self.get_configuration(id).await.is_some()
    }

    /// Store a configuration under `id`.
    ///
    /// # Errors
    /// `Validation` for an empty id, otherwise whatever the backend raised.
    pub async fn set_configuration(&self, id: &str, mut record: ConfigurationRecord) -> Result<()> {
        if id.is_empty() {
            return Err(CacheError::Validation("device id must not be empty".to_string()));
        }

        record.stamp(id, self.clock.now());
        self.backend.set(id, &record, self.ttl).await?;

        debug!("Updated configuration for {}", id);
        Ok(())
    }

    /// Store many configurations, returning the backend's success count.
    ///
    /// Entries with an empty id are dropped and not counted. Partial
    /// failures are reflected in the count; only total failure errors.
    pub async fn set_configurations_batch(
        &self,
        records: HashMap<String, ConfigurationRecord>,
    ) -> Result<usize> {
        let now = self.clock.now();
        let submitted = records.len();

        let stamped: HashMap<String, ConfigurationRecord> = records
            .into_iter()
            .filter(|(id, _)| {
                if id.is_empty() {
                    warn!("Dropping batch entry with empty device id");
                }
                !id.is_empty()
            })
            .map(|(id, mut record)| {
                record.stamp(&id, now);
                (id, record)
            })
            .collect();

        if stamped.is_empty() {
            return Ok(0);
        }

        let persisted = self.backend.set_batch(stamped, self.ttl).await?;
        info!("Batch update persisted {}/{} configurations", persisted, submitted);
        Ok(persisted)
    }
}

impl std::fmt::Debug for ConfigurationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationService")
            .field("backend", &self.backend.kind())
            .field("ttl", &self.ttl)
            .finish()
    }
}
