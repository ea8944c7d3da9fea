//! Load generator.
//!
//! Drives the engine's write paths with synthesized devices under bounded
//! concurrency and reports throughput. Used for capacity validation.
//!
//! ## Flow
//!
//! 1. Synthesize `record_count` distinct ids
//! 2. Split them into chunks of `batch_size`
//! 3. Admit at most `max_concurrency` chunks at once (semaphore)
//! 4. Each chunk generates its records and writes them
//! 5. Tally successes and failures atomically

mod generator;
mod ids;
mod report;

pub use generator::{DeviceTypeDefaults, RecordGenerator};
pub use ids::{LOCATIONS, SyntheticDevice, synthesize};
pub use report::{LoadTestReport, ReportWriter};

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::engine::ConfigurationService;
use crate::error::{CacheError, Result};

/// Upper safety limit on records per run.
pub const MAX_RECORDS: usize = 100_000;

/// Upper limit on concurrently processed chunks.
pub const MAX_CONCURRENCY: usize = 50;

/// Which engine write path each chunk uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// One `set_configurations_batch` call per chunk.
    #[default]
    Batch,
    /// One `set_configuration` call per record.
    Individual,
}

/// Parameters of a load test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTestOptions {
    pub record_count: usize,
    pub batch_size: usize,
    pub max_concurrency: usize,
    pub mode: WriteMode,
}

impl LoadTestOptions {
    pub fn new(record_count: usize, batch_size: usize, max_concurrency: usize) -> Self {
        Self {
            record_count,
            batch_size,
            max_concurrency,
            mode: WriteMode::default(),
        }
    }

    #[must_use]
    pub fn mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    /// Check bounds before anything is dispatched.
    pub fn validate(&self) -> Result<()> {
        if self.record_count == 0 || self.record_count > MAX_RECORDS {
            return Err(CacheError::Validation(format!(
                "record count must be between 1 and {MAX_RECORDS}, got {}",
                self.record_count
            )));
        }
        if self.batch_size == 0 {
            return Err(CacheError::Validation("batch size must be positive".to_string()));
        }
        if self.max_concurrency == 0 || self.max_concurrency > MAX_CONCURRENCY {
            return Err(CacheError::Validation(format!(
                "max concurrency must be between 1 and {MAX_CONCURRENCY}, got {}",
                self.max_concurrency
            )));
        }
        Ok(())
    }
}

/// Success/failure tallies shared by all chunk tasks.
#[derive(Debug, Default)]
struct Tally {
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl Tally {
    fn record(&self, succeeded: u64, failed: u64) {
        self.succeeded.fetch_add(succeeded, Ordering::Relaxed);
        self.failed.fetch_add(failed, Ordering::Relaxed);
    }

    fn snapshot(&self) -> (u64, u64) {
        (
            self.succeeded.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
        )
    }
}

/// Runs load tests against a [`ConfigurationService`].
#[derive(Clone)]
pub struct LoadGenerator {
    service: Arc<ConfigurationService>,
    generator: Arc<dyn RecordGenerator>,
}

impl LoadGenerator {
    pub fn new(service: Arc<ConfigurationService>) -> Self {
        Self::with_generator(service, Arc::new(DeviceTypeDefaults))
    }

    pub fn with_generator(
        service: Arc<ConfigurationService>,
        generator: Arc<dyn RecordGenerator>,
    ) -> Self {
        Self { service, generator }
    }

    /// Run one load test.
    ///
    /// Chunk and item failures are counted, never fatal. Only invalid
    /// options or a broken dispatch loop abort the run.
    pub async fn run(&self, options: LoadTestOptions) -> Result<LoadTestReport> {
        options.validate()?;

        let devices = synthesize(options.record_count);
        let chunk_count = devices.len().div_ceil(options.batch_size);
        info!(
            "Load test: {} records in {} chunks of {}, concurrency {}, {:?} writes",
            options.record_count, chunk_count, options.batch_size, options.max_concurrency, options.mode
        );

        let start_time = Utc::now();
        let timer = Instant::now();
        let tally = Arc::new(Tally::default());
        let semaphore = Arc::new(Semaphore::new(options.max_concurrency));
        let mut tasks = JoinSet::new();

        for (index, chunk) in devices.chunks(options.batch_size).enumerate() {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| CacheError::LoadTest(format!("concurrency limiter closed: {e}")))?;

            let chunk = chunk.to_vec();
            let service = Arc::clone(&self.service);
            let generator = Arc::clone(&self.generator);
            let tally = Arc::clone(&tally);
            let mode = options.mode;

            tasks.spawn(async move {
                let _permit = permit;
                let (succeeded, failed) =
                    process_chunk(&service, generator.as_ref(), &chunk, mode).await;
                debug!("Chunk {} done: {} ok, {} failed", index, succeeded, failed);
                tally.record(succeeded, failed);
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Chunk task did not complete: {}", e);
            }
        }

        let elapsed = timer.elapsed();
        let end_time = Utc::now();

        let (succeeded, mut failed) = tally.snapshot();
        // Chunks whose task died never reported; count their items as failed.
        let unaccounted = (options.record_count as u64).saturating_sub(succeeded + failed);
        if unaccounted > 0 {
            warn!("{} records unaccounted for, counting as failed", unaccounted);
            failed += unaccounted;
        }

        let report = LoadTestReport {
            records_processed: options.record_count,
            total_duration: elapsed,
            records_per_second: LoadTestReport::throughput(succeeded, elapsed),
            average_latency_ms: LoadTestReport::average_latency_ms(options.record_count, elapsed),
            successful_operations: succeeded,
            failed_operations: failed,
            batch_size: options.batch_size,
            concurrent_tasks: options.max_concurrency,
            start_time,
            end_time,
            backend_type: self.service.backend_kind().to_string(),
            device_ids: devices.into_iter().map(|d| d.id).collect(),
        };

        info!(
            "Load test finished in {:.2?}: {} ok, {} failed, {:.1} records/s",
            elapsed, report.successful_operations, report.failed_operations, report.records_per_second
        );
        Ok(report)
    }
}

/// Write one chunk, returning (succeeded, failed).
async fn process_chunk(
    service: &ConfigurationService,
    generator: &dyn RecordGenerator,
    chunk: &[SyntheticDevice],
    mode: WriteMode,
) -> (u64, u64) {
    let total = chunk.len() as u64;

    match mode {
        WriteMode::Batch => {
            let records: HashMap<_, _> = chunk
                .iter()
                .map(|device| (device.id.clone(), generator.generate(device)))
                .collect();

            match service.set_configurations_batch(records).await {
                Ok(persisted) => {
                    let persisted = (persisted as u64).min(total);
                    (persisted, total - persisted)
                }
                Err(e) => {
                    warn!("Batch of {} records failed: {}", total, e);
                    (0, total)
                }
            }
        }
        WriteMode::Individual => {
            let mut succeeded = 0;
            for device in chunk {
                match service.set_configuration(&device.id, generator.generate(device)).await {
                    Ok(()) => succeeded += 1,
                    Err(e) => warn!("Write for {} failed: {}", device.id, e),
                }
            }
            (succeeded, total - succeeded)
        }
    }
}
