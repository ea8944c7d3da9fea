//! Data models.

pub mod configuration;
pub mod device;
pub mod entry;

pub use configuration::{ConfigurationRecord, StorageInterval};
pub use device::{DeviceCategory, DeviceIdParts, parse_device_id};
pub use entry::CacheEntry;
