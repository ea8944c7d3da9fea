//! Structured-store backend on MongoDB.
//!
//! Rows are addressed by a fixed partition key plus the device id as sort
//! key, and carry a bincode payload. A TTL index on `expires_at` lets the
//! server evict expired rows; reads still check expiry themselves because
//! the server sweeps lazily.

mod database;
mod document;

pub use database::Database;
pub use document::PARTITION_KEY;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{Document, doc};
use mongodb::options::{FindOneOptions, IndexOptions, ReplaceOptions};
use mongodb::{Collection, IndexModel};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::{BackendKind, RetryPolicy, StorageBackend, expiry_after};
use crate::clock::{Clock, SystemClock};
use crate::codec::{BinaryCodec, RecordCodec};
use crate::error::{CacheError, Result};
use crate::models::{CacheEntry, ConfigurationRecord};
use document::{EXPIRES_AT, PK, SK, entry_from_document, expiry_from_document, key_filter, to_document};

/// Maximum rows written in one transaction.
pub const MAX_TRANSACTION_ITEMS: usize = 100;

/// Partition/sort-key store with transactional batch upserts.
///
/// Strict decoding: a row whose payload cannot be read yields
/// `DecodeFailed`.
///
/// The collection and its indexes are created on first use, retried per
/// [`RetryPolicy`]. Every operation waits for that to finish.
pub struct MongoBackend {
    db: Database,
    collection: Collection<Document>,
    codec: BinaryCodec,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    initialized: OnceCell<()>,
}

impl MongoBackend {
    pub fn new(db: Database) -> Self {
        Self {
            collection: db.configurations(),
            db,
            codec: BinaryCodec,
            clock: Arc::new(SystemClock),
            retry: RetryPolicy::default(),
            initialized: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Create the collection and indexes if needed.
    ///
    /// Runs at most once successfully; a failed run is retried by the next
    /// caller.
    pub async fn initialize(&self) -> Result<()> {
        self.initialized
            .get_or_try_init(|| {
                self.retry
                    .run("MongoDB backend initialization", |attempt| async move {
                        debug!("Initializing {} (attempt {})", self.db.collection_name(), attempt);
                        self.create_schema().await
                    })
            })
            .await?;
        Ok(())
    }

    async fn create_schema(&self) -> Result<()> {
        if self.db.ensure_collection().await? {
            info!("Created collection {}", self.db.collection_name());
        }

        let key_index = IndexModel::builder()
            .keys(doc! { PK: 1, SK: 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let ttl_index = IndexModel::builder()
            .keys(doc! { EXPIRES_AT: 1 })
            .options(IndexOptions::builder().expire_after(Duration::ZERO).build())
            .build();

        self.collection.create_indexes([key_index, ttl_index]).await?;
        info!("MongoDB backend ready ({})", self.db.collection_name());
        Ok(())
    }

    fn upsert_options() -> ReplaceOptions {
        ReplaceOptions::builder().upsert(true).build()
    }

    /// Upsert one chunk inside a transaction.
    async fn write_transaction(
        &self,
        chunk: &[(String, Vec<u8>)],
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut session = self.db.client().start_session().await?;
        session.start_transaction().await?;

        for (id, payload) in chunk {
            let row = to_document(id, payload.clone(), expires_at, now);
            let written = self
                .collection
                .replace_one(key_filter(id), row)
                .with_options(Self::upsert_options())
                .session(&mut session)
                .await;

            if let Err(e) = written {
                if let Err(abort) = session.abort_transaction().await {
                    debug!("Abort after failed upsert of {} also failed: {}", id, abort);
                }
                return Err(e.into());
            }
        }

        session.commit_transaction().await?;
        Ok(())
    }
}

impl std::fmt::Debug for MongoBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoBackend")
            .field("collection", &self.db.collection_name())
            .field("initialized", &self.initialized.initialized())
            .finish()
    }
}

/// Split encoded rows into transaction-sized chunks.
fn transaction_chunks<T>(rows: &[T]) -> std::slice::Chunks<'_, T> {
    rows.chunks(MAX_TRANSACTION_ITEMS)
}

/// Sum the rows of committed transactions.
///
/// Fails with the last error only when no transaction committed; an empty
/// batch persists nothing and succeeds.
fn tally_transactions(outcomes: impl IntoIterator<Item = (usize, Result<()>)>) -> Result<usize> {
    let mut persisted = 0;
    let mut last_error: Option<CacheError> = None;

    for (rows, outcome) in outcomes {
        match outcome {
            Ok(()) => persisted += rows,
            Err(e) => last_error = Some(e),
        }
    }

    match last_error {
        Some(e) if persisted == 0 => Err(e),
        _ => Ok(persisted),
    }
}

#[async_trait]
impl StorageBackend for MongoBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Mongo
    }

    async fn get(&self, id: &str) -> Result<Option<CacheEntry<ConfigurationRecord>>> {
        self.initialize().await?;

        let Some(row) = self.collection.find_one(key_filter(id)).await? else {
            return Ok(None);
        };

        let entry = entry_from_document(id, &row)?;
        if entry.is_expired(self.clock.now()) {
            debug!("Row for {} expired, awaiting TTL sweep", id);
            return Ok(None);
        }

        let record = self.codec.decode(id, &entry.payload)?;
        Ok(Some(CacheEntry::new(record, entry.expires_at)))
    }

    async fn set(&self, id: &str, record: &ConfigurationRecord, ttl: Duration) -> Result<()> {
        self.initialize().await?;

        let now = self.clock.now();
        let expires_at = expiry_after(now, ttl)?;
        let payload = self.codec.encode(record)?;

        self.collection
            .replace_one(key_filter(id), to_document(id, payload, expires_at, now))
            .with_options(Self::upsert_options())
            .await?;

        debug!("Stored configuration for {}", id);
        Ok(())
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        self.initialize().await?;

        let options = FindOneOptions::builder()
            .projection(doc! { EXPIRES_AT: 1 })
            .build();
        let row = self
            .collection
            .find_one(key_filter(id))
            .with_options(options)
            .await?;

        match row {
            Some(row) => Ok(expiry_from_document(id, &row)? > self.clock.now()),
            None => Ok(false),
        }
    }

    async fn set_batch(
        &self,
        records: HashMap<String, ConfigurationRecord>,
        ttl: Duration,
    ) -> Result<usize> {
        self.initialize().await?;

        let now = self.clock.now();
        let expires_at = expiry_after(now, ttl)?;
        let total = records.len();

        let mut rows = Vec::with_capacity(total);
        for (id, record) in &records {
            match self.codec.encode(record) {
                Ok(payload) => rows.push((id.clone(), payload)),
                Err(e) => warn!("Skipping {} in batch: {}", id, e),
            }
        }

        let mut outcomes = Vec::new();
        for chunk in transaction_chunks(&rows) {
            let outcome = self.write_transaction(chunk, expires_at, now).await;
            if let Err(e) = &outcome {
                warn!("Batch transaction of {} rows failed: {}", chunk.len(), e);
            }
            outcomes.push((chunk.len(), outcome));
        }

        let persisted = tally_transactions(outcomes)?;
        debug!("Batch stored {}/{} configurations", persisted, total);
        Ok(persisted)
    }
}
