//! Field-per-property JSON representation.

use crate::error::{CacheError, Result};
use crate::models::ConfigurationRecord;

use super::RecordCodec;

/// Encodes records as a flat JSON object, one key per field.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl RecordCodec for JsonCodec {
    type Encoded = String;

    fn encode(&self, record: &ConfigurationRecord) -> Result<String> {
        serde_json::to_string(record).map_err(|e| CacheError::encode(&record.device_id, e))
    }

    fn decode(&self, id: &str, payload: &String) -> Result<ConfigurationRecord> {
        serde_json::from_str(payload).map_err(|e| CacheError::decode(id, e))
    }
}
