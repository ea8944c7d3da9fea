//! Device configuration record.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How often a device persists its readings.
///
/// Stored as a label string; any label that is not recognized decodes
/// to [`StorageInterval::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StorageInterval {
    Every15Minutes,
    Hourly,
    Daily,
    Weekly,
    Every15Days,
    Monthly,
    NoStorage,
    #[default]
    Unknown,
}

impl StorageInterval {
    /// Stored label for this interval.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Every15Minutes => "Every15Minutes",
            Self::Hourly => "Hourly",
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Every15Days => "Every15Days",
            Self::Monthly => "Monthly",
            Self::NoStorage => "NoStorage",
            Self::Unknown => "Unknown",
        }
    }

    /// Parse a stored label, falling back to `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Every15Minutes" => Self::Every15Minutes,
            "Hourly" => Self::Hourly,
            "Daily" => Self::Daily,
            "Weekly" => Self::Weekly,
            "Every15Days" => Self::Every15Days,
            "Monthly" => Self::Monthly,
            "NoStorage" => Self::NoStorage,
            _ => Self::Unknown,
        }
    }
}

impl From<String> for StorageInterval {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<StorageInterval> for String {
    fn from(interval: StorageInterval) -> Self {
        interval.as_str().to_string()
    }
}

impl fmt::Display for StorageInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a single device, keyed by its PRDV identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationRecord {
    /// PRDV identifier. Re-stamped by the engine on every write.
    pub device_id: String,

    #[serde(default)]
    pub storage_interval: StorageInterval,

    #[serde(default)]
    pub storage_enabled: bool,

    /// Retention in days.
    #[serde(default)]
    pub max_data_age_days: u32,

    /// Free-form device type, may be empty.
    #[serde(default)]
    pub device_type: String,

    pub last_updated: DateTime<Utc>,

    /// Open-ended property bag.
    #[serde(default)]
    pub additional_properties: HashMap<String, String>,
}

impl ConfigurationRecord {
    /// Create a record with empty attributes.
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            storage_interval: StorageInterval::Unknown,
            storage_enabled: false,
            max_data_age_days: 0,
            device_type: String::new(),
            last_updated: Utc::now(),
            additional_properties: HashMap::new(),
        }
    }

    /// Overwrite identity and timestamp before persisting.
    pub fn stamp(&mut self, device_id: &str, now: DateTime<Utc>) {
        if self.device_id != device_id {
            self.device_id = device_id.to_string();
        }
        self.last_updated = now;
    }
}
