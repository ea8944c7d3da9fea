//! PRDV configuration cache - load test runner.
//!
//! Builds the configured backend, drives one load test through the
//! cache-aside engine and optionally persists the report.

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use prdv_config_cache::cache::CacheConfig;
use prdv_config_cache::config::{BackendChoice, Config};
use prdv_config_cache::loadgen::{LoadGenerator, ReportWriter};
use prdv_config_cache::source::DeviceDefaultsSource;
use prdv_config_cache::storage::{Database, MemoryBackend, MongoBackend, StorageBackend};
use prdv_config_cache::ConfigurationService;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // If RUST_LOG is not set, default to "info" level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("prdv_config_cache=info,mongodb=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    info!("Starting PRDV configuration cache...");

    let config = Config::from_env()?;
    info!("Configuration loaded successfully");
    info!("Backend: {:?}, TTL: {:?}", config.backend, config.cache_ttl);

    let backend: Arc<dyn StorageBackend> = match (&config.backend, &config.mongo) {
        (BackendChoice::Mongo, Some(mongo)) => {
            info!("Connecting to MongoDB...");
            let backend = MongoBackend::new(Database::connect(mongo).await?);
            backend.initialize().await?;
            Arc::new(backend)
        }
        _ => Arc::new(MemoryBackend::new(
            CacheConfig::with_capacity(config.cache_max_capacity).ttl(config.cache_ttl),
        )),
    };

    let service = Arc::new(
        ConfigurationService::new(backend, Arc::new(DeviceDefaultsSource::new()))
            .with_ttl(config.cache_ttl),
    );

    let report = LoadGenerator::new(Arc::clone(&service))
        .run(config.load_test)
        .await?;

    info!(
        "Processed {} records on {} backend: {} ok, {} failed, {:.1} records/s, {:.3} ms avg",
        report.records_processed,
        report.backend_type,
        report.successful_operations,
        report.failed_operations,
        report.records_per_second,
        report.average_latency_ms
    );

    let writer = ReportWriter::new(
        config.report.enabled,
        &config.report.output_dir,
        &config.report.version,
    );
    if writer.write(&report).await?.is_none() {
        info!("Report persistence disabled");
    }

    // Spot check the read path on a freshly written id.
    if let Some(id) = report.device_ids.first() {
        match service.get_configuration(id).await {
            Some(record) => info!(
                "Read back {}: {} every {}, {} days",
                record.device_id, record.device_type, record.storage_interval, record.max_data_age_days
            ),
            None => warn!("Read back of {} found nothing", id),
        }
    }

    Ok(())
}
