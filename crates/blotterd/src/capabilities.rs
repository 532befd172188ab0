//! Registry of the optional subsystems the running service exposes.
//!
//! The bootstrap sequence is the only writer. Once the listener opens, the
//! registry is frozen into an immutable [`ServiceState`] that request handlers
//! share without synchronisation.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use blotter_config::RunMode;

/// Feature groups and seed steps whose availability is decided at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Evidence intake and chain-of-custody routes.
    Evidence,
    /// Custodial (booking) records and identification photos.
    Custodial,
    /// Geospatial data file routes.
    Geofiles,
    /// Reference geofile records seeded into a fresh database.
    ReferenceData,
    /// Default administrative account seeded into a fresh database.
    AdminAccount,
}

impl Capability {
    /// Every capability, in registration order.
    pub const ALL: [Self; 5] = [
        Self::Evidence,
        Self::Custodial,
        Self::Geofiles,
        Self::ReferenceData,
        Self::AdminAccount,
    ];

    /// Returns `true` when the capability cannot operate without the database.
    #[must_use]
    pub const fn requires_database(self) -> bool {
        matches!(self, Self::Geofiles | Self::ReferenceData | Self::AdminAccount)
    }

    /// Stable label used in logs and error bodies.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Evidence => "evidence",
            Self::Custodial => "custodial",
            Self::Geofiles => "geofiles",
            Self::ReferenceData => "reference-data",
            Self::AdminAccount => "admin-account",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

/// Error returned when parsing a capability name fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown capability: {0}")]
pub struct CapabilityParseError(String);

impl CapabilityParseError {
    /// Returns the offending value that could not be parsed.
    #[must_use]
    pub const fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for Capability {
    type Err = CapabilityParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalised = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|capability| capability.label() == normalised)
            .ok_or(CapabilityParseError(normalised))
    }
}

/// Errors raised when a capability cannot be activated.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityError {
    /// A database-backed capability was activated while disconnected.
    #[error("capability {0} requires a database connection")]
    DatabaseUnavailable(Capability),
}

/// Deployment facts captured alongside the capability set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    /// Frontend serving strategy selector.
    pub mode: RunMode,
    /// Listener port.
    pub port: u16,
}

/// Operational status of the process.
///
/// A disconnected database never coexists with an active database-backed
/// capability; [`CapabilityRegistry::activate`] enforces this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceState {
    database_connected: bool,
    active_capabilities: BTreeSet<Capability>,
    environment: Environment,
}

impl ServiceState {
    /// Whether the database connection attempt succeeded.
    #[must_use]
    pub const fn database_connected(&self) -> bool {
        self.database_connected
    }

    /// Returns `true` when the capability is active.
    #[must_use]
    pub fn is_active(&self, capability: Capability) -> bool {
        self.active_capabilities.contains(&capability)
    }

    /// Active capabilities in registration order.
    pub fn active_capabilities(&self) -> impl Iterator<Item = Capability> + '_ {
        self.active_capabilities.iter().copied()
    }

    /// Deployment facts.
    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.environment
    }
}

/// Mutable view of [`ServiceState`] owned by the bootstrap sequence.
#[derive(Debug)]
pub struct CapabilityRegistry {
    state: ServiceState,
}

impl CapabilityRegistry {
    /// Builds a registry with the database disconnected and nothing active.
    #[must_use]
    pub const fn new(environment: Environment) -> Self {
        Self {
            state: ServiceState {
                database_connected: false,
                active_capabilities: BTreeSet::new(),
                environment,
            },
        }
    }

    /// Records a successful database connection.
    pub const fn mark_database_connected(&mut self) {
        self.state.database_connected = true;
    }

    /// Adds a capability to the active set.
    ///
    /// Activation is idempotent. Database-backed capabilities are refused
    /// while the database is disconnected.
    pub fn activate(&mut self, capability: Capability) -> Result<(), CapabilityError> {
        if capability.requires_database() && !self.state.database_connected {
            return Err(CapabilityError::DatabaseUnavailable(capability));
        }
        self.state.active_capabilities.insert(capability);
        Ok(())
    }

    /// Removes a capability whose registration was skipped.
    pub(crate) fn withdraw(&mut self, capability: Capability) {
        self.state.active_capabilities.remove(&capability);
    }

    /// Returns `true` when the capability is active.
    #[must_use]
    pub fn is_active(&self, capability: Capability) -> bool {
        self.state.is_active(capability)
    }

    /// Returns a read-only copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> ServiceState {
        self.state.clone()
    }

    /// Consumes the registry, fixing the state for the rest of the process.
    #[must_use]
    pub fn freeze(self) -> Arc<ServiceState> {
        Arc::new(self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn registry() -> CapabilityRegistry {
        CapabilityRegistry::new(Environment {
            mode: RunMode::Development,
            port: 5000,
        })
    }

    #[rstest]
    fn starts_disconnected_and_empty(registry: CapabilityRegistry) {
        let state = registry.snapshot();
        assert!(!state.database_connected());
        assert_eq!(state.active_capabilities().count(), 0);
    }

    #[rstest]
    #[case(Capability::Geofiles)]
    #[case(Capability::ReferenceData)]
    #[case(Capability::AdminAccount)]
    fn refuses_database_capabilities_while_disconnected(
        mut registry: CapabilityRegistry,
        #[case] capability: Capability,
    ) {
        let error = registry
            .activate(capability)
            .expect_err("activation should be refused");
        assert_eq!(error, CapabilityError::DatabaseUnavailable(capability));
        assert!(!registry.is_active(capability));
    }

    #[rstest]
    fn activates_database_capabilities_once_connected(mut registry: CapabilityRegistry) {
        registry.mark_database_connected();
        registry
            .activate(Capability::Geofiles)
            .expect("geofiles activate");
        registry
            .activate(Capability::Geofiles)
            .expect("activation is idempotent");
        assert!(registry.is_active(Capability::Geofiles));
        assert_eq!(registry.snapshot().active_capabilities().count(), 1);
    }

    #[rstest]
    fn withdraw_removes_capability(mut registry: CapabilityRegistry) {
        registry
            .activate(Capability::Evidence)
            .expect("evidence activates");
        registry.withdraw(Capability::Evidence);
        assert!(!registry.is_active(Capability::Evidence));
    }

    #[rstest]
    fn snapshot_is_detached_from_later_changes(mut registry: CapabilityRegistry) {
        let before = registry.snapshot();
        registry
            .activate(Capability::Custodial)
            .expect("custodial activates");
        assert!(!before.is_active(Capability::Custodial));
        assert!(registry.freeze().is_active(Capability::Custodial));
    }

    #[rstest]
    #[case("geofiles", Capability::Geofiles)]
    #[case(" Reference-Data ", Capability::ReferenceData)]
    fn parses_labels(#[case] input: &str, #[case] expected: Capability) {
        assert_eq!(input.parse::<Capability>().expect("label parses"), expected);
    }

    #[test]
    fn rejects_unknown_label() {
        let error = "warrants".parse::<Capability>().expect_err("unknown label");
        assert_eq!(error.value(), "warrants");
    }
}
