//! Record codecs.
//!
//! Converts [`ConfigurationRecord`] to and from a backend's storage
//! representation. Two representations exist:
//!
//! - [`JsonCodec`] - field-per-property JSON text, human-inspectable
//! - [`BinaryCodec`] - compact bincode payload, opaque
//!
//! Both decode into the same in-memory record with no information loss.
//! Interval labels that are not recognized decode to `Unknown`.

mod binary;
mod json;

pub use binary::BinaryCodec;
pub use json::JsonCodec;

use crate::error::Result;
use crate::models::ConfigurationRecord;

/// Stateless, bidirectional record mapping.
pub trait RecordCodec: Send + Sync {
    /// Native representation produced by this codec.
    type Encoded: Send + Sync;

    fn encode(&self, record: &ConfigurationRecord) -> Result<Self::Encoded>;

    /// Decode a payload stored under `id`.
    fn decode(&self, id: &str, payload: &Self::Encoded) -> Result<ConfigurationRecord>;
}
