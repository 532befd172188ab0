//! Test double for [`LifecycleReporter`] that records structured events for
//! assertions.

use std::net::SocketAddr;
use std::sync::Mutex;

use blotter_config::{Config, RunMode};

use crate::bootstrap::BootstrapError;
use crate::capabilities::{Capability, ServiceState};
use crate::database::DependencyConnectionError;
use crate::lifecycle::LifecycleReporter;
use crate::routes::RegistrationError;
use crate::seed::{SeedDataError, SeedReport, SeedStep};

/// Lifecycle events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    BootstrapStarting,
    SessionSecretFallback,
    DatabaseConnected,
    DatabaseUnavailable(String),
    CapabilityRegistered(Capability),
    CapabilitySkipped(Capability),
    StaticStrategySelected(RunMode),
    SeedCompleted { step: SeedStep, inserted: usize },
    AdminPasswordResetRequired(String),
    SeedFailed(SeedStep),
    Listening { capabilities: Vec<Capability> },
    BootstrapFailed(String),
}

impl LifecycleEvent {
    /// Position of the event's phase in the startup sequence.
    pub fn phase(&self) -> u8 {
        match self {
            Self::BootstrapStarting | Self::SessionSecretFallback => 0,
            Self::DatabaseConnected | Self::DatabaseUnavailable(_) => 1,
            Self::CapabilityRegistered(_) | Self::CapabilitySkipped(_) => 3,
            Self::StaticStrategySelected(_) => 4,
            Self::SeedCompleted { .. }
            | Self::AdminPasswordResetRequired(_)
            | Self::SeedFailed(_) => 5,
            Self::Listening { .. } | Self::BootstrapFailed(_) => 6,
        }
    }
}

/// Records lifecycle events for assertions.
#[derive(Debug, Default)]
pub struct RecordingLifecycleReporter {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingLifecycleReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: LifecycleEvent) {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .push(event);
    }
}

impl LifecycleReporter for RecordingLifecycleReporter {
    fn bootstrap_starting(&self, _config: &Config) {
        self.record(LifecycleEvent::BootstrapStarting);
    }

    fn session_secret_fallback(&self) {
        self.record(LifecycleEvent::SessionSecretFallback);
    }

    fn database_connected(&self) {
        self.record(LifecycleEvent::DatabaseConnected);
    }

    fn database_unavailable(&self, error: &DependencyConnectionError) {
        self.record(LifecycleEvent::DatabaseUnavailable(error.to_string()));
    }

    fn capability_registered(&self, capability: Capability) {
        self.record(LifecycleEvent::CapabilityRegistered(capability));
    }

    fn capability_skipped(&self, error: &RegistrationError) {
        self.record(LifecycleEvent::CapabilitySkipped(error.capability));
    }

    fn static_strategy_selected(&self, mode: RunMode) {
        self.record(LifecycleEvent::StaticStrategySelected(mode));
    }

    fn seed_completed(&self, step: SeedStep, report: SeedReport) {
        self.record(LifecycleEvent::SeedCompleted {
            step,
            inserted: report.inserted,
        });
    }

    fn admin_password_reset_required(&self, username: &str) {
        self.record(LifecycleEvent::AdminPasswordResetRequired(username.to_owned()));
    }

    fn seed_failed(&self, error: &SeedDataError) {
        self.record(LifecycleEvent::SeedFailed(error.step));
    }

    fn listening(&self, _address: SocketAddr, state: &ServiceState) {
        self.record(LifecycleEvent::Listening {
            capabilities: state.active_capabilities().collect(),
        });
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(LifecycleEvent::BootstrapFailed(error.to_string()));
    }
}
