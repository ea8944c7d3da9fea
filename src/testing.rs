//! Test doubles shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{CacheError, Result};
use crate::models::{CacheEntry, ConfigurationRecord, StorageInterval};
use crate::source::ConfigurationSource;
use crate::storage::{BackendKind, StorageBackend};

pub fn sample_record(id: &str) -> ConfigurationRecord {
    let mut record = ConfigurationRecord::new(id);
    record.storage_interval = StorageInterval::Hourly;
    record.storage_enabled = true;
    record.max_data_age_days = 365;
    record.device_type = "Meter".to_string();
    record
        .additional_properties
        .insert("location".to_string(), "EAST".to_string());
    record
}

enum Script {
    Found(ConfigurationRecord),
    NotFound,
    Fail,
}

/// Source returning a fixed answer and counting lookups.
pub struct ScriptedSource {
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedSource {
    fn new(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_record(record: ConfigurationRecord) -> Self {
        Self::new(Script::Found(record))
    }

    pub fn empty() -> Self {
        Self::new(Script::NotFound)
    }

    pub fn failing() -> Self {
        Self::new(Script::Fail)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigurationSource for ScriptedSource {
    async fn lookup(&self, _id: &str) -> Result<Option<ConfigurationRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Found(record) => Ok(Some(record.clone())),
            Script::NotFound => Ok(None),
            Script::Fail => Err(CacheError::SourceUnavailable("scripted outage".to_string())),
        }
    }
}

/// Backend whose every call fails at the transport level.
pub struct UnreachableBackend;

impl UnreachableBackend {
    fn down<T>() -> Result<T> {
        Err(CacheError::BackendUnavailable("connection refused".to_string()))
    }
}

#[async_trait]
impl StorageBackend for UnreachableBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn get(&self, _id: &str) -> Result<Option<CacheEntry<ConfigurationRecord>>> {
        Self::down()
    }

    async fn set(&self, _id: &str, _record: &ConfigurationRecord, _ttl: Duration) -> Result<()> {
        Self::down()
    }

    async fn exists(&self, _id: &str) -> Result<bool> {
        Self::down()
    }

    async fn set_batch(
        &self,
        _records: HashMap<String, ConfigurationRecord>,
        _ttl: Duration,
    ) -> Result<usize> {
        Self::down()
    }
}

/// Backend whose batch writes drop every Nth item.
pub struct EveryNthFailingBackend {
    n: usize,
    seen: Mutex<Vec<(String, ConfigurationRecord)>>,
}

impl EveryNthFailingBackend {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Every item submitted through `set_batch`.
    pub fn seen(&self) -> Vec<(String, ConfigurationRecord)> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl StorageBackend for EveryNthFailingBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn get(&self, _id: &str) -> Result<Option<CacheEntry<ConfigurationRecord>>> {
        Ok(None)
    }

    async fn set(&self, _id: &str, _record: &ConfigurationRecord, _ttl: Duration) -> Result<()> {
        Ok(())
    }

    async fn exists(&self, _id: &str) -> Result<bool> {
        Ok(false)
    }

    async fn set_batch(
        &self,
        records: HashMap<String, ConfigurationRecord>,
        _ttl: Duration,
    ) -> Result<usize> {
        let mut seen = self.seen.lock();
        let mut persisted = 0;
        for (position, (id, record)) in records.into_iter().enumerate() {
            if (position + 1) % self.n != 0 {
                persisted += 1;
            }
            seen.push((id, record));
        }
        Ok(persisted)
    }
}

/// Backend that records the peak number of overlapping calls.
pub struct PeakConcurrencyBackend {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    delay: Duration,
}

impl PeakConcurrencyBackend {
    pub fn new(delay: Duration) -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn track(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageBackend for PeakConcurrencyBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn get(&self, _id: &str) -> Result<Option<CacheEntry<ConfigurationRecord>>> {
        self.track().await;
        Ok(None)
    }

    async fn set(&self, _id: &str, _record: &ConfigurationRecord, _ttl: Duration) -> Result<()> {
        self.track().await;
        Ok(())
    }

    async fn exists(&self, _id: &str) -> Result<bool> {
        self.track().await;
        Ok(false)
    }

    async fn set_batch(
        &self,
        records: HashMap<String, ConfigurationRecord>,
        _ttl: Duration,
    ) -> Result<usize> {
        self.track().await;
        Ok(records.len())
    }
}
