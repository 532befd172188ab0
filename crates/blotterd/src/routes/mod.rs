//! Route groups and the shared handler state.
//!
//! Each group owns the routes for one [`Capability`]. Bootstrap asks every
//! group whose capability is active to register; a failure is fatal for
//! [`Requirement::Required`] groups and downgrades the service for
//! [`Requirement::Optional`] ones. Inactive groups have their mount path
//! answered by [`unavailable_routes`] instead.

mod custodial;
mod errors;
mod evidence;
mod geofiles;
mod ledger;

use std::sync::Arc;

use axum::Router;
use axum::routing::any;
use thiserror::Error;

use crate::assets::StaticStrategy;
use crate::capabilities::{Capability, ServiceState};
use crate::database::{BoxError, RecordStore};
use crate::upload::UploadGate;

pub use custodial::{CustodialRecord, CustodialRoutes, NewCustodialRecord};
pub use errors::{ApiError, ErrorBody, codes};
pub use evidence::{EvidenceRecord, EvidenceRoutes, NewEvidence};
pub use geofiles::GeofileRoutes;

use ledger::Ledger;

/// Whether a group's registration failure aborts startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Startup fails when the group cannot register.
    Required,
    /// The group is skipped and its capability withdrawn.
    Optional,
}

impl Requirement {
    /// Database-backed capabilities are optional; the rest are required.
    #[must_use]
    pub const fn for_capability(capability: Capability) -> Self {
        if capability.requires_database() {
            Self::Optional
        } else {
            Self::Required
        }
    }
}

/// A route group failed to register.
#[derive(Debug, Error)]
#[error("{capability} routes failed to register: {message}")]
pub struct RegistrationError {
    /// Capability the group serves.
    pub capability: Capability,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl RegistrationError {
    /// Builds an error without an underlying cause.
    #[must_use]
    pub fn new(capability: Capability, message: impl Into<String>) -> Self {
        Self {
            capability,
            message: message.into(),
            source: None,
        }
    }

    /// Builds an error wrapping `source`.
    #[must_use]
    pub fn with_source(
        capability: Capability,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self {
            capability,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Human-readable description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result of asking one group to register.
pub enum RegistrationOutcome {
    /// Routes to merge into the application.
    Registered(Router<AppState>),
    /// An optional group failed; the service continues without it.
    Skipped(RegistrationError),
    /// A required group failed; startup must abort.
    Fatal(RegistrationError),
}

/// Inputs available to a group while it registers.
#[derive(Debug, Clone, Copy)]
pub struct RouteContext<'a> {
    /// Upload admission policies, including destination directories.
    pub uploads: &'a UploadGate,
}

/// A set of routes serving one capability.
pub trait RouteGroup: Send + Sync {
    /// Capability the routes serve.
    fn capability(&self) -> Capability;

    /// Whether a registration failure aborts startup.
    fn requirement(&self) -> Requirement {
        Requirement::for_capability(self.capability())
    }

    /// Path prefix every route in the group lives under.
    fn mount_path(&self) -> &'static str;

    /// Prepares whatever the routes need and returns them.
    fn register(&self, context: &RouteContext<'_>) -> Result<Router<AppState>, RegistrationError>;
}

/// Registers `group`, classifying any failure by its requirement.
#[must_use]
pub fn register_group(group: &dyn RouteGroup, context: &RouteContext<'_>) -> RegistrationOutcome {
    match (group.register(context), group.requirement()) {
        (Ok(router), _) => RegistrationOutcome::Registered(router),
        (Err(error), Requirement::Optional) => RegistrationOutcome::Skipped(error),
        (Err(error), Requirement::Required) => RegistrationOutcome::Fatal(error),
    }
}

/// The groups a production service registers, in registration order.
#[must_use]
pub fn default_route_groups() -> Vec<Box<dyn RouteGroup>> {
    vec![
        Box::new(EvidenceRoutes),
        Box::new(CustodialRoutes),
        Box::new(GeofileRoutes),
    ]
}

/// Routes answering every request under `mount_path` with a 503.
#[must_use]
pub fn unavailable_routes(capability: Capability, mount_path: &str) -> Router<AppState> {
    let handler = move || async move { ApiError::unavailable(capability) };
    Router::new()
        .route(mount_path, any(handler))
        .route(&format!("{mount_path}/{{*rest}}"), any(handler))
}

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    service: Arc<ServiceState>,
    uploads: Arc<UploadGate>,
    store: Option<Arc<dyn RecordStore>>,
    assets: StaticStrategy,
    evidence: Ledger<EvidenceRecord>,
    custodial: Ledger<CustodialRecord>,
}

impl AppState {
    /// Builds state around a frozen capability snapshot.
    #[must_use]
    pub fn new(
        service: Arc<ServiceState>,
        uploads: UploadGate,
        store: Option<Arc<dyn RecordStore>>,
        assets: StaticStrategy,
    ) -> Self {
        Self {
            service,
            uploads: Arc::new(uploads),
            store,
            assets,
            evidence: Ledger::default(),
            custodial: Ledger::default(),
        }
    }

    /// Capability snapshot taken when the listener opened.
    #[must_use]
    pub fn service(&self) -> &ServiceState {
        &self.service
    }

    pub(crate) fn uploads(&self) -> &UploadGate {
        &self.uploads
    }

    /// The record store, present only for capabilities active at startup.
    pub(crate) fn store_for(&self, capability: Capability) -> Result<&dyn RecordStore, ApiError> {
        match &self.store {
            Some(store) if self.service.is_active(capability) => Ok(store.as_ref()),
            _ => Err(ApiError::unavailable(capability)),
        }
    }

    pub(crate) const fn assets(&self) -> &StaticStrategy {
        &self.assets
    }

    pub(crate) const fn evidence(&self) -> &Ledger<EvidenceRecord> {
        &self.evidence
    }

    pub(crate) const fn custodial(&self) -> &Ledger<CustodialRecord> {
        &self.custodial
    }
}

/// Trims `value` and rejects it when blank.
pub(crate) fn required_text(field: &str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::invalid_request(format!("'{field}' must not be blank")));
    }
    Ok(trimmed.to_owned())
}

/// Trims an optional value, treating blank as absent.
pub(crate) fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}
