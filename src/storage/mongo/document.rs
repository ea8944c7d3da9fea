//! Row layout of the structured store.
//!
//! ```text
//! { pk: "DEVICE_CONFIG", sk: <device id>, payload: Binary, expires_at: Date, updated_at: Date }
//! ```

use chrono::{DateTime, TimeZone, Utc};
use mongodb::bson::spec::BinarySubtype;
use mongodb::bson::{Binary, Bson, Document, doc};

use crate::error::{CacheError, Result};
use crate::models::CacheEntry;

/// Fixed partition key shared by every configuration row.
pub const PARTITION_KEY: &str = "DEVICE_CONFIG";

pub const PK: &str = "pk";
pub const SK: &str = "sk";
pub const PAYLOAD: &str = "payload";
pub const EXPIRES_AT: &str = "expires_at";
pub const UPDATED_AT: &str = "updated_at";

/// Filter addressing a single row.
pub fn key_filter(id: &str) -> Document {
    doc! { PK: PARTITION_KEY, SK: id }
}

fn to_bson_date(at: DateTime<Utc>) -> mongodb::bson::DateTime {
    mongodb::bson::DateTime::from_millis(at.timestamp_millis())
}

fn from_bson_date(id: &str, at: &mongodb::bson::DateTime) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(at.timestamp_millis())
        .single()
        .ok_or_else(|| CacheError::decode(id, "expiry out of range"))
}

/// Build the full row for an upsert.
pub fn to_document(
    id: &str,
    payload: Vec<u8>,
    expires_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> Document {
    doc! {
        PK: PARTITION_KEY,
        SK: id,
        PAYLOAD: Bson::Binary(Binary { subtype: BinarySubtype::Generic, bytes: payload }),
        EXPIRES_AT: to_bson_date(expires_at),
        UPDATED_AT: to_bson_date(updated_at),
    }
}

/// Read the expiry out of a row.
pub fn expiry_from_document(id: &str, row: &Document) -> Result<DateTime<Utc>> {
    let expires_at = row
        .get_datetime(EXPIRES_AT)
        .map_err(|e| CacheError::decode(id, e))?;
    from_bson_date(id, expires_at)
}

/// Split a row into its binary payload and expiry.
pub fn entry_from_document(id: &str, row: &Document) -> Result<CacheEntry<Vec<u8>>> {
    let payload = row
        .get_binary_generic(PAYLOAD)
        .map_err(|e| CacheError::decode(id, e))?;
    let expires_at = expiry_from_document(id, row)?;
    Ok(CacheEntry::new(payload.clone(), expires_at))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_round_trip() {
        let expires_at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let row = to_document("INV-NORTH-000001", vec![1, 2, 3], expires_at, Utc::now());

        assert_eq!(row.get_str(PK).unwrap(), PARTITION_KEY);
        assert_eq!(row.get_str(SK).unwrap(), "INV-NORTH-000001");

        let entry = entry_from_document("INV-NORTH-000001", &row).unwrap();
        assert_eq!(entry.payload, vec![1, 2, 3]);
        assert_eq!(entry.expires_at, expires_at);
    }

    #[test]
    fn test_missing_payload_is_decode_failure() {
        let row = doc! { PK: PARTITION_KEY, SK: "A", EXPIRES_AT: mongodb::bson::DateTime::now() };
        let err = entry_from_document("A", &row).unwrap_err();
        assert!(matches!(err, CacheError::DecodeFailed { .. }));
    }

    #[test]
    fn test_key_filter() {
        let filter = key_filter("A");
        assert_eq!(filter.get_str(PK).unwrap(), PARTITION_KEY);
        assert_eq!(filter.get_str(SK).unwrap(), "A");
    }
}
