//! Storage backends.
//!
//! A backend stores encoded [`ConfigurationRecord`]s keyed by device id,
//! each with an absolute expiry. Two implementations exist:
//!
//! - [`MemoryBackend`] - flat string-keyed cache (Moka), JSON payloads
//! - [`MongoBackend`] - structured store with a partition/sort key,
//!   binary payloads and transactional batch upserts
//!
//! ## Error policy
//!
//! Both backends are strict: a stored payload that cannot be decoded is
//! reported as [`CacheError::DecodeFailed`], transport failures as
//! [`CacheError::BackendUnavailable`]. The engine's read path turns both
//! into a miss.
//!
//! [`CacheError::DecodeFailed`]: crate::error::CacheError::DecodeFailed
//! [`CacheError::BackendUnavailable`]: crate::error::CacheError::BackendUnavailable

mod memory;
mod mongo;
mod retry;

pub use memory::MemoryBackend;
pub use mongo::{Database, MongoBackend, MAX_TRANSACTION_ITEMS, PARTITION_KEY};
pub use retry::RetryPolicy;

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{CacheError, Result};
use crate::models::{CacheEntry, ConfigurationRecord};

/// Which concrete backend is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    Mongo,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Mongo => "mongo",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw record storage keyed by device id.
///
/// Every read path treats an expired entry as absent, whether or not the
/// backend has physically evicted it.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Fetch a live entry.
    async fn get(&self, id: &str) -> Result<Option<CacheEntry<ConfigurationRecord>>>;

    /// Upsert a record expiring `ttl` from now.
    async fn set(&self, id: &str, record: &ConfigurationRecord, ttl: Duration) -> Result<()>;

    /// True only if an entry is present and not expired.
    async fn exists(&self, id: &str) -> Result<bool>;

    /// Upsert many records, returning how many were persisted.
    ///
    /// Individual item failures are logged and skipped. Errors only when
    /// the backend cannot be reached at all.
    async fn set_batch(
        &self,
        records: HashMap<String, ConfigurationRecord>,
        ttl: Duration,
    ) -> Result<usize>;
}

/// Absolute expiry for an entry written at `now`.
pub fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| CacheError::Validation(format!("ttl out of range: {ttl:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_after() {
        let now = Utc::now();
        let expires = expiry_after(now, Duration::from_secs(3600)).unwrap();
        assert_eq!(expires - now, chrono::Duration::hours(1));
    }

    #[test]
    fn test_expiry_after_rejects_huge_ttl() {
        let err = expiry_after(Utc::now(), Duration::from_secs(u64::MAX)).unwrap_err();
        assert!(matches!(err, CacheError::Validation(_)));
    }
}
