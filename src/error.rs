//! Error taxonomy for the configuration cache.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors raised by backends, sources and the engine.
///
/// The read path never hands these to callers; see
/// [`ConfigurationService`](crate::engine::ConfigurationService).
#[derive(Debug, Error)]
pub enum CacheError {
    /// Empty or malformed identifier, rejected before any backend is touched.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Transport-level failure talking to a storage backend.
    #[error("storage backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A stored payload could not be interpreted as a configuration record.
    #[error("failed to decode stored record for '{id}': {reason}")]
    DecodeFailed { id: String, reason: String },

    /// A record could not be encoded for storage.
    #[error("failed to encode record for '{id}': {reason}")]
    EncodeFailed { id: String, reason: String },

    /// Authoritative lookup failed.
    #[error("authoritative source unavailable: {0}")]
    SourceUnavailable(String),

    /// Load test dispatch loop failed and the run was aborted.
    #[error("load test aborted: {0}")]
    LoadTest(String),
}

impl CacheError {
    /// Build a `DecodeFailed` for the given key.
    pub fn decode(id: &str, reason: impl ToString) -> Self {
        Self::DecodeFailed {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Build an `EncodeFailed` for the given key.
    pub fn encode(id: &str, reason: impl ToString) -> Self {
        Self::EncodeFailed {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<mongodb::error::Error> for CacheError {
    fn from(e: mongodb::error::Error) -> Self {
        Self::BackendUnavailable(e.to_string())
    }
}
