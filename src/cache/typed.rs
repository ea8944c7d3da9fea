//! Typed cache wrapper around Moka with per-entry expiry.

use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use moka::Expiry;
use moka::sync::Cache;

use super::CacheConfig;
use crate::models::CacheEntry;

/// Evicts each entry when its own `expires_at` passes.
struct EntryExpiry;

impl EntryExpiry {
    fn remaining<P>(entry: &CacheEntry<P>) -> Option<Duration> {
        Some((entry.expires_at - Utc::now()).to_std().unwrap_or(Duration::ZERO))
    }
}

impl<K, P> Expiry<K, CacheEntry<P>> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &K,
        value: &CacheEntry<P>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Self::remaining(value)
    }

    fn expire_after_update(
        &self,
        _key: &K,
        value: &CacheEntry<P>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Self::remaining(value)
    }
}

/// A typed cache of expiring entries.
///
/// This cache is:
/// - Thread-safe (uses Arc internally)
/// - Bounded, with native eviction at each entry's expiry
/// - Clone-friendly (cloning is cheap, shares the same underlying cache)
///
/// Native eviction runs on the wall clock. Readers still check
/// [`CacheEntry::is_expired`] against their own clock.
pub struct TypedCache<K, P>
where
    K: Hash + Eq + Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
{
    inner: Arc<Cache<K, CacheEntry<P>>>,
    name: Arc<str>,
}

// Manual Clone implementation that doesn't require K: Clone, P: Clone
impl<K, P> Clone for TypedCache<K, P>
where
    K: Hash + Eq + Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            name: Arc::clone(&self.name),
        }
    }
}

impl<K, P> TypedCache<K, P>
where
    K: Hash + Eq + Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
{
    /// Create a new typed cache with the given name and config.
    pub fn new(name: impl Into<Arc<str>>, config: CacheConfig) -> Self {
        let mut builder = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(EntryExpiry);

        if let Some(ttl) = config.ttl {
            builder = builder.time_to_live(ttl);
        }

        Self {
            inner: Arc::new(builder.build()),
            name: name.into(),
        }
    }

    /// Get the name of this cache.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert or replace an entry.
    pub fn insert(&self, key: K, entry: CacheEntry<P>) {
        self.inner.insert(key, entry);
    }

    /// Get an entry, if it has not been evicted yet.
    pub fn get(&self, key: &K) -> Option<CacheEntry<P>> {
        self.inner.get(key)
    }

    /// Remove a key from the cache.
    pub fn invalidate(&self, key: &K) {
        self.inner.invalidate(key);
    }

    /// Get the number of entries in the cache.
    ///
    /// Note: This may not be perfectly accurate due to concurrent operations.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

impl<K, P> std::fmt::Debug for TypedCache<K, P>
where
    K: Hash + Eq + Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedCache")
            .field("name", &self.name)
            .field("entry_count", &self.inner.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let cache: TypedCache<String, u32> = TypedCache::new("test", CacheConfig::with_capacity(10));
        let expires_at = Utc::now() + chrono::Duration::hours(1);
        cache.insert("a".to_string(), CacheEntry::new(7, expires_at));

        let entry = cache.get(&"a".to_string()).unwrap();
        assert_eq!(entry.payload, 7);
        assert_eq!(cache.name(), "test");
    }

    #[test]
    fn test_already_expired_entry_is_evicted() {
        let cache: TypedCache<String, u32> = TypedCache::new("test", CacheConfig::default());
        let expires_at = Utc::now() - chrono::Duration::seconds(1);
        cache.insert("a".to_string(), CacheEntry::new(7, expires_at));

        assert!(cache.get(&"a".to_string()).is_none());
    }

    #[test]
    fn test_invalidate() {
        let cache: TypedCache<String, u32> = TypedCache::new("test", CacheConfig::default());
        let expires_at = Utc::now() + chrono::Duration::hours(1);
        cache.insert("a".to_string(), CacheEntry::new(7, expires_at));
        cache.invalidate(&"a".to_string());

        assert!(cache.get(&"a".to_string()).is_none());
    }
}
