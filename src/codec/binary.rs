//! Compact binary representation.

use crate::error::{CacheError, Result};
use crate::models::ConfigurationRecord;

use super::RecordCodec;

/// Encodes records as a single bincode payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec;

impl RecordCodec for BinaryCodec {
    type Encoded = Vec<u8>;

    fn encode(&self, record: &ConfigurationRecord) -> Result<Vec<u8>> {
        bincode::serialize(record).map_err(|e| CacheError::encode(&record.device_id, e))
    }

    fn decode(&self, id: &str, payload: &Vec<u8>) -> Result<ConfigurationRecord> {
        bincode::deserialize(payload).map_err(|e| CacheError::decode(id, e))
    }
}
