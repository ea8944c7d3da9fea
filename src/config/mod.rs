//! Configuration module.
//!
//! Loads configuration from environment variables (and `.env`).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::loadgen::{LoadTestOptions, WriteMode};

/// Longest accepted cache TTL (ten years).
pub const MAX_CACHE_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Storage backend selection
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BackendChoice {
    #[default]
    Memory,
    Mongo,
}

/// MongoDB connection settings
#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub collection: String,
}

/// Report persistence settings
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub enabled: bool,
    pub output_dir: PathBuf,
    pub version: String,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendChoice,
    pub cache_ttl: Duration,
    pub cache_max_capacity: u64,

    /// Present only when `backend` is `Mongo`.
    pub mongo: Option<MongoConfig>,

    pub load_test: LoadTestOptions,
    pub report: ReportConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Returns error if a value does not parse or a required variable is missing.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let backend = match get("CACHE_BACKEND").map(|v| v.to_lowercase()).as_deref() {
            None | Some("memory") => BackendChoice::Memory,
            Some("mongo") | Some("mongodb") => BackendChoice::Mongo,
            Some(other) => bail!("CACHE_BACKEND must be 'memory' or 'mongo', got '{other}'"),
        };

        let mongo = match backend {
            BackendChoice::Mongo => Some(MongoConfig {
                uri: get("MONGODB_URI").context("MONGODB_URI must be set when CACHE_BACKEND is mongo")?,
                database: get("MONGODB_DATABASE").unwrap_or_else(|| "prdv".to_string()),
                collection: get("MONGODB_COLLECTION")
                    .unwrap_or_else(|| "device_configurations".to_string()),
            }),
            BackendChoice::Memory => None,
        };

        let mode = match get("LOADTEST_MODE").map(|v| v.to_lowercase()).as_deref() {
            None | Some("batch") => WriteMode::Batch,
            Some("individual") => WriteMode::Individual,
            Some(other) => bail!("LOADTEST_MODE must be 'batch' or 'individual', got '{other}'"),
        };

        let load_test = LoadTestOptions::new(
            parse_or(&get, "LOADTEST_RECORDS", 1_000)?,
            parse_or(&get, "LOADTEST_BATCH_SIZE", 100)?,
            parse_or(&get, "LOADTEST_CONCURRENCY", 10)?,
        )
        .mode(mode);

        let report = ReportConfig {
            enabled: parse_or(&get, "REPORT_ENABLED", false)?,
            output_dir: get("REPORT_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("reports")),
            version: get("REPORT_VERSION").unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
        };

        let ttl_secs: u64 = parse_or(&get, "CACHE_TTL_SECS", 3_600)?;
        if ttl_secs == 0 || ttl_secs > MAX_CACHE_TTL_SECS {
            bail!("CACHE_TTL_SECS must be between 1 and {MAX_CACHE_TTL_SECS}, got {ttl_secs}");
        }

        Ok(Self {
            backend,
            cache_ttl: Duration::from_secs(ttl_secs),
            cache_max_capacity: parse_or(&get, "CACHE_MAX_CAPACITY", 100_000)?,
            mongo,
            load_test,
            report,
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} has invalid value '{raw}': {e}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.backend, BackendChoice::Memory);
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.load_test, LoadTestOptions::new(1_000, 100, 10));
        assert!(!config.report.enabled);
        assert!(config.mongo.is_none());
    }

    #[test]
    fn test_mongo_requires_uri() {
        assert!(config(&[("CACHE_BACKEND", "mongo")]).is_err());

        let config = config(&[
            ("CACHE_BACKEND", "Mongo"),
            ("MONGODB_URI", "mongodb://localhost:27017"),
        ])
        .unwrap();
        let mongo = config.mongo.unwrap();
        assert_eq!(mongo.database, "prdv");
        assert_eq!(mongo.collection, "device_configurations");
    }

    #[test]
    fn test_cache_ttl_bounds() {
        assert!(config(&[("CACHE_TTL_SECS", "0")]).is_err());
        assert!(config(&[("CACHE_TTL_SECS", "40000000000")]).is_err());

        let max = MAX_CACHE_TTL_SECS.to_string();
        let config = config(&[("CACHE_TTL_SECS", max.as_str())]).unwrap();
        assert_eq!(config.cache_ttl, Duration::from_secs(MAX_CACHE_TTL_SECS));
    }

    #[test]
    fn test_invalid_numbers_are_errors() {
        assert!(config(&[("CACHE_TTL_SECS", "soon")]).is_err());
        assert!(config(&[("LOADTEST_RECORDS", "-5")]).is_err());
        assert!(config(&[("REPORT_ENABLED", "maybe")]).is_err());
    }

    #[test]
    fn test_load_test_overrides() {
        let config = config(&[
            ("LOADTEST_RECORDS", "500"),
            ("LOADTEST_BATCH_SIZE", "25"),
            ("LOADTEST_CONCURRENCY", "8"),
            ("LOADTEST_MODE", "individual"),
            ("REPORT_ENABLED", "true"),
            ("REPORT_VERSION", "nightly"),
        ])
        .unwrap();

        assert_eq!(
            config.load_test,
            LoadTestOptions::new(500, 25, 8).mode(WriteMode::Individual)
        );
        assert!(config.report.enabled);
        assert_eq!(config.report.version, "nightly");
    }

    #[test]
    fn test_unknown_backend_is_error() {
        assert!(config(&[("CACHE_BACKEND", "redis")]).is_err());
    }
}
