//! Load test results and their optional persistence.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tracing::info;

fn as_secs<S: Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Outcome of one load test run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadTestReport {
    pub records_processed: usize,
    /// Wall-clock duration, serialized in seconds.
    #[serde(serialize_with = "as_secs")]
    pub total_duration: Duration,
    pub records_per_second: f64,
    pub average_latency_ms: f64,
    pub successful_operations: u64,
    pub failed_operations: u64,
    pub batch_size: usize,
    pub concurrent_tasks: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub backend_type: String,
    /// Every id written, in synthesis order.
    #[serde(skip)]
    pub device_ids: Vec<String>,
}

impl LoadTestReport {
    /// Successes per second of wall-clock time.
    pub fn throughput(successes: u64, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs > 0.0 { successes as f64 / secs } else { 0.0 }
    }

    /// Elapsed time divided across every attempted record.
    pub fn average_latency_ms(attempted: usize, elapsed: Duration) -> f64 {
        if attempted == 0 {
            0.0
        } else {
            elapsed.as_secs_f64() * 1000.0 / attempted as f64
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportDocument<'a> {
    version: &'a str,
    generated_at: DateTime<Utc>,
    report: &'a LoadTestReport,
}

/// Writes reports as JSON documents when enabled.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    enabled: bool,
    output_dir: PathBuf,
    version: String,
}

impl ReportWriter {
    pub fn new(enabled: bool, output_dir: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            enabled,
            output_dir: output_dir.into(),
            version: version.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Persist `report`, returning the file written, or `None` when disabled.
    pub async fn write(&self, report: &LoadTestReport) -> Result<Option<PathBuf>> {
        if !self.enabled {
            return Ok(None);
        }

        let generated_at = Utc::now();
        let document = ReportDocument {
            version: &self.version,
            generated_at,
            report,
        };
        let body = serde_json::to_vec_pretty(&document).context("Failed to serialize report")?;

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.output_dir.display()))?;

        let path = self
            .output_dir
            .join(format!("load-test-{}.json", generated_at.format("%Y%m%dT%H%M%S%.3fZ")));
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!("Load test report written to {}", path.display());
        Ok(Some(path))
    }
}
