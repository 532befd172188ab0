//! Police records web service.
//!
//! `blotterd` serves the evidence, custodial, and geofile APIs alongside the
//! records frontend. The crate is mostly about starting up well: the database
//! is optional, so startup tracks which [`Capability`] values are actually
//! available and only mounts the routes that can work. When the database is
//! unreachable the service still starts, reports itself degraded through the
//! health endpoint, and answers database-backed routes with a 503.
//!
//! The bootstrap phases run in a fixed order and report each transition
//! through a [`LifecycleReporter`]:
//!
//! 1. connect the database (bounded by the driver's own timeouts);
//! 2. activate capabilities;
//! 3. register route groups, skipping optional ones that fail;
//! 4. select the frontend strategy for the run mode;
//! 5. seed reference data and the administrative account;
//! 6. freeze the capability snapshot and bind the listener.
//!
//! Uploads pass through an [`UploadGate`] that checks the extension before
//! any bytes are written and enforces the size ceiling while the body
//! streams.

mod assets;
mod bootstrap;
mod capabilities;
mod clock;
mod database;
mod health;
mod lifecycle;
mod process;
pub mod routes;
mod seed;
mod telemetry;
pub mod upload;

pub use assets::{AssetError, INDEX_DOCUMENT, StaticStrategy, is_api_path};
pub use bootstrap::{BootstrapError, BootstrapServices, Service, UPLOADS_PATH, bootstrap_with};
pub use capabilities::{
    Capability, CapabilityError, CapabilityParseError, CapabilityRegistry, Environment,
    ServiceState,
};
pub use database::{
    AccountRecord, BoxError, DatabaseConnector, DependencyConnectionError, GeofileRecord,
    MongoConnector, MongoRecordStore, RecordStore, StoreError,
};
pub use health::{DatabaseStatus, HEALTH_PATH, HealthReport, HealthResponse, STATUS_OK, report};
pub use lifecycle::{LifecycleReporter, StructuredLifecycleReporter};
pub use process::{run_service, shutdown_signal};
pub use seed::{ADMIN_ROLE, SeedDataError, SeedReport, SeedStep};
pub use telemetry::{TelemetryError, TelemetryHandle, initialise as initialise_telemetry};
pub use upload::{UploadCategory, UploadGate, UploadPolicy, UploadRejection};

#[cfg(test)]
mod tests;
