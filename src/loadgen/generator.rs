//! Record synthesis for load tests.

use chrono::Utc;

use super::ids::SyntheticDevice;
use crate::models::ConfigurationRecord;

/// Builds the record written for a synthesized device.
pub trait RecordGenerator: Send + Sync {
    fn generate(&self, device: &SyntheticDevice) -> ConfigurationRecord;
}

/// Uses each category's default interval and retention.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceTypeDefaults;

impl RecordGenerator for DeviceTypeDefaults {
    fn generate(&self, device: &SyntheticDevice) -> ConfigurationRecord {
        let mut record = device
            .category
            .default_record(&device.id, device.location, Utc::now());
        record
            .additional_properties
            .insert("generatedBy".to_string(), "load-generator".to_string());
        record
    }
}
