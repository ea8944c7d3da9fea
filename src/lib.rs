//! PRDV configuration cache.
//!
//! Looks up per-device configuration records by PRDV identifier using a
//! cache-aside pattern in front of a slow authoritative source.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `models` - Configuration record, cache entry and device categories
//! - `codec` - JSON and binary record encodings
//! - `cache` - Moka-based expiring cache
//! - `storage` - Backend trait with Moka and MongoDB implementations
//! - `source` - Authoritative source adapters
//! - `engine` - Cache-aside orchestration
//! - `loadgen` - Bounded-concurrency load generator

pub mod cache;
pub mod clock;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod loadgen;
pub mod models;
pub mod source;
pub mod storage;

#[cfg(test)]
mod testing;

pub use engine::{ConfigurationService, DEFAULT_TTL};
pub use error::{CacheError, Result};
pub use models::{ConfigurationRecord, StorageInterval};
