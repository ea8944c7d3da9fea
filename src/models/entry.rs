//! Backend cache entry.

use chrono::{DateTime, Utc};

/// An encoded payload plus its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<P> {
    pub payload: P,
    pub expires_at: DateTime<Utc>,
}

impl<P> CacheEntry<P> {
    pub fn new(payload: P, expires_at: DateTime<Utc>) -> Self {
        Self { payload, expires_at }
    }

    /// An entry at or past its expiry is treated as absent.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
