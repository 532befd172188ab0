//! Structured reporting of bootstrap phase transitions.

use std::net::SocketAddr;
use std::sync::Arc;

use blotter_config::{Config, RunMode};

use crate::bootstrap::BootstrapError;
use crate::capabilities::{Capability, ServiceState};
use crate::database::DependencyConnectionError;
use crate::routes::RegistrationError;
use crate::seed::{SeedDataError, SeedReport, SeedStep};

/// Observer trait used to surface bootstrap events to telemetry sinks.
pub trait LifecycleReporter: Send + Sync {
    /// Invoked before the database connection attempt.
    fn bootstrap_starting(&self, config: &Config);

    /// Invoked when sessions will be signed with the built-in key.
    fn session_secret_fallback(&self);

    /// Invoked after the database connection succeeds.
    fn database_connected(&self);

    /// Invoked when the service continues without a database.
    fn database_unavailable(&self, error: &DependencyConnectionError);

    /// Invoked after a route group is registered.
    fn capability_registered(&self, capability: Capability);

    /// Invoked when an optional route group is skipped.
    fn capability_skipped(&self, error: &RegistrationError);

    /// Invoked once the frontend serving strategy is fixed.
    fn static_strategy_selected(&self, mode: RunMode);

    /// Invoked after a seed step succeeds.
    fn seed_completed(&self, step: SeedStep, report: SeedReport);

    /// Invoked when the seeded administrative account needs its password
    /// reset before anyone can sign in.
    fn admin_password_reset_required(&self, username: &str);

    /// Invoked when a seed step fails.
    fn seed_failed(&self, error: &SeedDataError);

    /// Invoked once the listener is bound.
    fn listening(&self, address: SocketAddr, state: &ServiceState);

    /// Invoked when bootstrap aborts.
    fn bootstrap_failed(&self, error: &BootstrapError);
}

impl<T> LifecycleReporter for Arc<T>
where
    T: LifecycleReporter,
{
    fn bootstrap_starting(&self, config: &Config) {
        (**self).bootstrap_starting(config);
    }

    fn session_secret_fallback(&self) {
        (**self).session_secret_fallback();
    }

    fn database_connected(&self) {
        (**self).database_connected();
    }

    fn database_unavailable(&self, error: &DependencyConnectionError) {
        (**self).database_unavailable(error);
    }

    fn capability_registered(&self, capability: Capability) {
        (**self).capability_registered(capability);
    }

    fn capability_skipped(&self, error: &RegistrationError) {
        (**self).capability_skipped(error);
    }

    fn static_strategy_selected(&self, mode: RunMode) {
        (**self).static_strategy_selected(mode);
    }

    fn seed_completed(&self, step: SeedStep, report: SeedReport) {
        (**self).seed_completed(step, report);
    }

    fn admin_password_reset_required(&self, username: &str) {
        (**self).admin_password_reset_required(username);
    }

    fn seed_failed(&self, error: &SeedDataError) {
        (**self).seed_failed(error);
    }

    fn listening(&self, address: SocketAddr, state: &ServiceState) {
        (**self).listening(address, state);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredLifecycleReporter;

impl StructuredLifecycleReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LifecycleReporter for StructuredLifecycleReporter {
    fn bootstrap_starting(&self, config: &Config) {
        tracing::info!(
            target: "blotterd::lifecycle",
            event = "bootstrap_starting",
            mode = %config.mode(),
            port = config.port,
            database_configured = config.mongodb_uri().is_some(),
            "starting service bootstrap"
        );
    }

    fn session_secret_fallback(&self) {
        tracing::warn!(
            target: "blotterd::lifecycle",
            event = "session_secret_fallback",
            "SESSION_SECRET is not set; sessions are signed with the built-in development key"
        );
    }

    fn database_connected(&self) {
        tracing::info!(
            target: "blotterd::lifecycle",
            event = "database_connected",
            "database connection established"
        );
    }

    fn database_unavailable(&self, error: &DependencyConnectionError) {
        tracing::warn!(
            target: "blotterd::lifecycle",
            event = "database_unavailable",
            error = %error,
            "continuing without database; database-backed routes are disabled"
        );
    }

    fn capability_registered(&self, capability: Capability) {
        tracing::info!(
            target: "blotterd::lifecycle",
            event = "capability_registered",
            capability = %capability,
            "route group registered"
        );
    }

    fn capability_skipped(&self, error: &RegistrationError) {
        tracing::warn!(
            target: "blotterd::lifecycle",
            event = "capability_skipped",
            capability = %error.capability,
            message = %error.message(),
            error = ?error,
            "optional route group skipped"
        );
    }

    fn static_strategy_selected(&self, mode: RunMode) {
        let strategy = if mode.is_production() {
            "bundle"
        } else {
            "dev_server"
        };
        tracing::info!(
            target: "blotterd::lifecycle",
            event = "static_strategy_selected",
            mode = %mode,
            strategy,
            "frontend serving strategy selected"
        );
    }

    fn seed_completed(&self, step: SeedStep, report: SeedReport) {
        tracing::info!(
            target: "blotterd::lifecycle",
            event = "seed_completed",
            step = %step,
            inserted = report.inserted,
            "seed step completed"
        );
    }

    fn admin_password_reset_required(&self, username: &str) {
        tracing::warn!(
            target: "blotterd::lifecycle",
            event = "admin_password_reset_required",
            username,
            "administrative account created with a generated password; set ADMIN_PASSWORD \
             or reset the password before signing in"
        );
    }

    fn seed_failed(&self, error: &SeedDataError) {
        tracing::warn!(
            target: "blotterd::lifecycle",
            event = "seed_failed",
            step = %error.step,
            error = %error,
            "seed step failed"
        );
    }

    fn listening(&self, address: SocketAddr, state: &ServiceState) {
        let capabilities = state
            .active_capabilities()
            .map(Capability::label)
            .collect::<Vec<_>>()
            .join(",");
        tracing::info!(
            target: "blotterd::lifecycle",
            event = "listening",
            address = %address,
            database_connected = state.database_connected(),
            capabilities = %capabilities,
            "service listening"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: "blotterd::lifecycle",
            event = "bootstrap_failed",
            error = %error,
            "service bootstrap failed"
        );
    }
}
