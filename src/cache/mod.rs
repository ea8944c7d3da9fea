//! In-process caching on top of Moka.
//!
//! Backs the flat key-value storage backend. Entries carry their own
//! absolute expiry which Moka honours natively; readers still perform
//! a lazy expiry check against the injected clock.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let cache: TypedCache<String, Arc<str>> = TypedCache::new("configs", CacheConfig::default());
//!
//! cache.insert(id.clone(), CacheEntry::new(payload, expires_at));
//! let entry = cache.get(&id);
//! ```

mod config;
mod typed;

pub use config::CacheConfig;
pub use typed::TypedCache;
