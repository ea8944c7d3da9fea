//! Connection to the configuration store.

use std::time::Duration;

use mongodb::bson::{Document, doc};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use tracing::{debug, info};

use crate::config::MongoConfig;
use crate::error::{CacheError, Result};

/// Reported to the server so operators can attribute connections.
pub const APP_NAME: &str = "prdv-config-cache";

/// How long an operation waits for a usable server before failing.
const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Client plus the one collection device configurations live in.
#[derive(Debug, Clone)]
pub struct Database {
    client: Client,
    db: mongodb::Database,
    collection_name: String,
}

impl Database {
    /// Connect and verify the server answers a ping.
    ///
    /// # Errors
    /// Returns `BackendUnavailable` if the URI is invalid or the server
    /// cannot be reached.
    pub async fn connect(config: &MongoConfig) -> Result<Self> {
        let mut options = ClientOptions::parse(&config.uri).await?;
        apply_defaults(&mut options);

        let client = Client::with_options(options)?;
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| CacheError::BackendUnavailable(format!("ping failed: {e}")))?;

        info!("Connected to MongoDB database {}", config.database);

        Ok(Self {
            db: client.database(&config.database),
            client,
            collection_name: config.collection.clone(),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// Raw rows of the configuration collection.
    pub fn configurations(&self) -> Collection<Document> {
        self.db.collection(&self.collection_name)
    }

    /// Create the configuration collection unless it already exists.
    ///
    /// Returns whether it was created.
    pub async fn ensure_collection(&self) -> Result<bool> {
        let existing = self.db.list_collection_names().await?;
        if existing.iter().any(|name| name == &self.collection_name) {
            debug!("Collection {} already present", self.collection_name);
            return Ok(false);
        }

        self.db.create_collection(&self.collection_name).await?;
        Ok(true)
    }
}

/// Fill in settings the URI left unset.
fn apply_defaults(options: &mut ClientOptions) {
    if options.app_name.is_none() {
        options.app_name = Some(APP_NAME.to_string());
    }
    if options.server_selection_timeout.is_none() {
        options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);
    }
}
