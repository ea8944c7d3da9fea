//! Device categories and their storage defaults.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::{ConfigurationRecord, StorageInterval};

/// Known device families, identified by the prefix of their PRDV id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceCategory {
    Inverter,
    Meter,
    Sensor,
    Gateway,
    Battery,
}

impl DeviceCategory {
    pub const ALL: [DeviceCategory; 5] = [
        Self::Inverter,
        Self::Meter,
        Self::Sensor,
        Self::Gateway,
        Self::Battery,
    ];

    /// Id prefix, e.g. `INV` in `INV-NORTH-000001`.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Inverter => "INV",
            Self::Meter => "MET",
            Self::Sensor => "SEN",
            Self::Gateway => "GW",
            Self::Battery => "BAT",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.prefix() == prefix)
    }

    /// Device type label stored on records.
    pub fn device_type(&self) -> &'static str {
        match self {
            Self::Inverter => "Inverter",
            Self::Meter => "Meter",
            Self::Sensor => "Sensor",
            Self::Gateway => "Gateway",
            Self::Battery => "Battery",
        }
    }

    /// Default storage interval and retention (days).
    pub fn defaults(&self) -> (StorageInterval, u32) {
        match self {
            Self::Inverter => (StorageInterval::Every15Minutes, 90),
            Self::Meter => (StorageInterval::Hourly, 365),
            Self::Sensor => (StorageInterval::Every15Minutes, 30),
            Self::Gateway => (StorageInterval::Daily, 180),
            Self::Battery => (StorageInterval::Hourly, 730),
        }
    }

    /// Record carrying this category's defaults.
    pub fn default_record(&self, id: &str, location: &str, now: DateTime<Utc>) -> ConfigurationRecord {
        let (storage_interval, max_data_age_days) = self.defaults();
        let mut additional_properties = HashMap::new();
        additional_properties.insert("category".to_string(), self.prefix().to_string());
        additional_properties.insert("location".to_string(), location.to_string());

        ConfigurationRecord {
            device_id: id.to_string(),
            storage_interval,
            storage_enabled: storage_interval != StorageInterval::NoStorage,
            max_data_age_days,
            device_type: self.device_type().to_string(),
            last_updated: now,
            additional_properties,
        }
    }
}

/// Parts of an id shaped `<PREFIX>-<LOCATION>-<serial>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdParts<'a> {
    pub category: DeviceCategory,
    pub location: &'a str,
    pub serial: u64,
}

/// Split a structured id, or `None` if it does not follow the scheme.
pub fn parse_device_id(id: &str) -> Option<DeviceIdParts<'_>> {
    let mut parts = id.splitn(3, '-');
    let category = DeviceCategory::from_prefix(parts.next()?)?;
    let location = parts.next().filter(|l| !l.is_empty())?;
    let serial = parts.next()?.parse().ok()?;
    Some(DeviceIdParts {
        category,
        location,
        serial,
    })
}
