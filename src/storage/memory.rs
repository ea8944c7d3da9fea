//! Flat key-value backend on Moka.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{BackendKind, StorageBackend, expiry_after};
use crate::cache::{CacheConfig, TypedCache};
use crate::clock::{Clock, SystemClock};
use crate::codec::{JsonCodec, RecordCodec};
use crate::error::Result;
use crate::models::{CacheEntry, ConfigurationRecord};

/// String-keyed cache holding each record as a JSON string.
///
/// Never reports `BackendUnavailable`. A payload that fails to decode is
/// reported as `DecodeFailed`.
#[derive(Clone)]
pub struct MemoryBackend {
    cache: TypedCache<String, String>,
    codec: JsonCodec,
    clock: Arc<dyn Clock>,
}

impl MemoryBackend {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache: TypedCache::new("device_configurations", config),
            codec: JsonCodec,
            clock,
        }
    }

    /// Number of entries held, including ones not yet evicted.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Live entry for `id`, dropping it if the clock says it expired.
    fn live_entry(&self, id: &str) -> Option<CacheEntry<String>> {
        let key = id.to_string();
        let entry = self.cache.get(&key)?;
        if entry.is_expired(self.clock.now()) {
            debug!("Entry for {} expired", id);
            self.cache.invalidate(&key);
            return None;
        }
        Some(entry)
    }

    #[cfg(test)]
    pub(crate) fn insert_raw(&self, id: &str, payload: &str, ttl: Duration) {
        let expires_at = expiry_after(self.clock.now(), ttl).unwrap();
        self.cache
            .insert(id.to_string(), CacheEntry::new(payload.to_string(), expires_at));
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("cache", &self.cache)
            .finish()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn get(&self, id: &str) -> Result<Option<CacheEntry<ConfigurationRecord>>> {
        let Some(entry) = self.live_entry(id) else {
            return Ok(None);
        };
        let record = self.codec.decode(id, &entry.payload)?;
        Ok(Some(CacheEntry::new(record, entry.expires_at)))
    }

    async fn set(&self, id: &str, record: &ConfigurationRecord, ttl: Duration) -> Result<()> {
        let expires_at = expiry_after(self.clock.now(), ttl)?;
        let payload = self.codec.encode(record)?;
        self.cache
            .insert(id.to_string(), CacheEntry::new(payload, expires_at));
        debug!("Cached configuration for {}", id);
        Ok(())
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.live_entry(id).is_some())
    }

    async fn set_batch(
        &self,
        records: HashMap<String, ConfigurationRecord>,
        ttl: Duration,
    ) -> Result<usize> {
        let expires_at = expiry_after(self.clock.now(), ttl)?;
        let total = records.len();
        let mut persisted = 0;

        for (id, record) in records {
            match self.codec.encode(&record) {
                Ok(payload) => {
                    self.cache.insert(id, CacheEntry::new(payload, expires_at));
                    persisted += 1;
                }
                Err(e) => warn!("Skipping {} in batch: {}", id, e),
            }
        }

        debug!("Batch cached {}/{} configurations", persisted, total);
        Ok(persisted)
    }
}
