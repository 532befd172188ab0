//! MongoDB implementation of the database collaborator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};

use super::{
    AccountRecord, DatabaseConnector, DependencyConnectionError, GeofileRecord, RecordStore,
    StoreError,
};

const DEFAULT_DATABASE: &str = "blotter";
const GEOFILES_COLLECTION: &str = "geofiles";
const ACCOUNTS_COLLECTION: &str = "users";
const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Connector backed by the official MongoDB driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct MongoConnector;

impl MongoConnector {
    /// Builds a new connector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DatabaseConnector for MongoConnector {
    async fn connect(&self, uri: &str) -> Result<Arc<dyn RecordStore>, DependencyConnectionError> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(DependencyConnectionError::connect)?;
        options
            .app_name
            .get_or_insert_with(|| env!("CARGO_PKG_NAME").to_owned());
        // The driver waits 30s for server selection unless told otherwise.
        options
            .server_selection_timeout
            .get_or_insert(SERVER_SELECTION_TIMEOUT);
        options.connect_timeout.get_or_insert(CONNECT_TIMEOUT);
        let database_name = options
            .default_database
            .clone()
            .unwrap_or_else(|| DEFAULT_DATABASE.to_owned());

        let client =
            Client::with_options(options).map_err(DependencyConnectionError::connect)?;
        let database = client.database(&database_name);
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(DependencyConnectionError::connect)?;
        Ok(Arc::new(MongoRecordStore::new(&database)))
    }
}

/// Record store over a MongoDB database.
#[derive(Debug, Clone)]
pub struct MongoRecordStore {
    geofiles: Collection<GeofileRecord>,
    accounts: Collection<AccountRecord>,
}

impl MongoRecordStore {
    /// Binds the store to the collections in `database`.
    #[must_use]
    pub fn new(database: &Database) -> Self {
        Self {
            geofiles: database.collection(GEOFILES_COLLECTION),
            accounts: database.collection(ACCOUNTS_COLLECTION),
        }
    }
}

#[async_trait]
impl RecordStore for MongoRecordStore {
    async fn list_geofiles(&self) -> Result<Vec<GeofileRecord>, StoreError> {
        let cursor = self
            .geofiles
            .find(doc! {})
            .sort(doc! { "uploadedAt": -1 })
            .await
            .map_err(|error| StoreError::new("list_geofiles", error))?;
        cursor
            .try_collect()
            .await
            .map_err(|error| StoreError::new("list_geofiles", error))
    }

    async fn insert_geofile(&self, record: &GeofileRecord) -> Result<(), StoreError> {
        self.geofiles
            .insert_one(record)
            .await
            .map_err(|error| StoreError::new("insert_geofile", error))?;
        Ok(())
    }

    async fn seed_reference_geofiles(
        &self,
        records: &[GeofileRecord],
    ) -> Result<usize, StoreError> {
        let existing = self
            .geofiles
            .count_documents(doc! { "reference": true })
            .await
            .map_err(|error| StoreError::new("seed_reference_geofiles", error))?;
        if existing > 0 || records.is_empty() {
            return Ok(0);
        }
        let result = self
            .geofiles
            .insert_many(records)
            .await
            .map_err(|error| StoreError::new("seed_reference_geofiles", error))?;
        Ok(result.inserted_ids.len())
    }

    async fn ensure_account(&self, account: &AccountRecord) -> Result<bool, StoreError> {
        let existing = self
            .accounts
            .find_one(doc! { "username": account.username.as_str() })
            .await
            .map_err(|error| StoreError::new("ensure_account", error))?;
        if existing.is_some() {
            return Ok(false);
        }
        self.accounts
            .insert_one(account)
            .await
            .map_err(|error| StoreError::new("ensure_account", error))?;
        Ok(true)
    }
}
