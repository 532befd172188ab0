//! Document database collaborator.
//!
//! The service only needs a narrow slice of the database: geofile metadata and
//! the seeded account collection. Both sit behind [`RecordStore`], and the
//! connection attempt sits behind [`DatabaseConnector`], so the bootstrap
//! sequence can run against scripted doubles.

mod mongo;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use mongo::{MongoConnector, MongoRecordStore};

/// Boxed error type carried by database failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while establishing the database connection.
#[derive(Debug, Error)]
pub enum DependencyConnectionError {
    /// No connection string was configured.
    #[error("MONGODB_URI is not set")]
    MissingConnectionString,
    /// The driver could not reach or authenticate with the server.
    #[error("failed to connect to the database: {source}")]
    Connect {
        /// Driver error.
        #[source]
        source: BoxError,
    },
}

impl DependencyConnectionError {
    /// Wraps a driver error.
    #[must_use]
    pub fn connect(source: impl Into<BoxError>) -> Self {
        Self::Connect {
            source: source.into(),
        }
    }
}

/// Error raised by a [`RecordStore`] operation.
#[derive(Debug, Error)]
#[error("database operation '{operation}' failed: {source}")]
pub struct StoreError {
    operation: &'static str,
    #[source]
    source: BoxError,
}

impl StoreError {
    /// Wraps a driver error raised by `operation`.
    #[must_use]
    pub fn new(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Self {
            operation,
            source: source.into(),
        }
    }

    /// Name of the failed operation.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        self.operation
    }
}

/// Metadata for a geospatial data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofileRecord {
    /// Record identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Lower-cased extension including the leading dot.
    pub file_type: String,
    /// File name supplied by the uploader.
    pub original_filename: Option<String>,
    /// Generated on-disk name; absent for seeded reference records.
    pub stored_name: Option<String>,
    /// Public download URL; absent for seeded reference records.
    pub url: Option<String>,
    /// Size in bytes.
    pub size_bytes: i64,
    /// Free-text description.
    pub description: Option<String>,
    /// RFC 3339 timestamp.
    pub uploaded_at: String,
    /// Whether the record was seeded as reference data.
    #[serde(default)]
    pub reference: bool,
}

/// Stored login for a seeded account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    /// Login name.
    pub username: String,
    /// Hex-encoded SHA-256 digest of salt followed by password.
    pub password_digest: String,
    /// Hex-encoded salt.
    pub salt: String,
    /// Authorisation role.
    pub role: String,
    /// Whether the password must be changed at first login.
    pub must_reset_password: bool,
    /// RFC 3339 timestamp.
    pub created_at: String,
}

/// Opens the database connection.
#[async_trait]
pub trait DatabaseConnector: Send + Sync {
    /// Connects to the database named by `uri`.
    ///
    /// Implementations bound the attempt with their own driver timeouts; the
    /// caller imposes no deadline.
    async fn connect(&self, uri: &str) -> Result<Arc<dyn RecordStore>, DependencyConnectionError>;
}

/// Operations the service performs against the database.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Lists geofile records, newest first.
    async fn list_geofiles(&self) -> Result<Vec<GeofileRecord>, StoreError>;

    /// Inserts one geofile record.
    async fn insert_geofile(&self, record: &GeofileRecord) -> Result<(), StoreError>;

    /// Inserts reference records unless reference data already exists.
    /// Returns the number of records inserted.
    async fn seed_reference_geofiles(
        &self,
        records: &[GeofileRecord],
    ) -> Result<usize, StoreError>;

    /// Inserts `account` unless an account with the same username exists.
    /// Returns `true` when the account was inserted.
    async fn ensure_account(&self, account: &AccountRecord) -> Result<bool, StoreError>;
}
