//! Service bootstrap orchestration.
//!
//! Startup runs as a fixed sequence of phases: connect the database, activate
//! capabilities, register route groups, select the frontend strategy, seed,
//! then bind the listener. Only a required route group failing, a missing
//! production bundle, or the bind itself can abort startup; everything the
//! database touches degrades instead.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use blotter_config::{Config, ConfigError};

use crate::assets::{AssetError, StaticStrategy, frontend_fallback};
use crate::capabilities::{CapabilityRegistry, Environment, ServiceState};
use crate::database::{DatabaseConnector, DependencyConnectionError, MongoConnector, RecordStore};
use crate::health::{HEALTH_PATH, health_handler};
use crate::lifecycle::{LifecycleReporter, StructuredLifecycleReporter};
use crate::routes::{
    AppState, RegistrationError, RegistrationOutcome, RouteContext, RouteGroup,
    default_route_groups, register_group, unavailable_routes,
};
use crate::seed::{self, SeedStep};
use crate::telemetry::TelemetryError;
use crate::upload::UploadGate;

const BOOTSTRAP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bootstrap");

/// Public path prefix for stored uploads.
pub const UPLOADS_PATH: &str = "/uploads";

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration was rejected.
    #[error("invalid configuration: {source}")]
    Configuration {
        /// Underlying configuration error.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// A required route group failed to register.
    #[error("required route group failed: {source}")]
    RequiredRouteRegistration {
        /// Registration failure reported by the group.
        #[source]
        source: RegistrationError,
    },
    /// The frontend serving strategy could not be prepared.
    #[error("failed to prepare frontend assets: {source}")]
    Assets {
        /// Underlying asset error.
        #[source]
        source: AssetError,
    },
    /// The listener could not be bound.
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// Address the bind was attempted on.
        address: SocketAddr,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// The server stopped with an error.
    #[error("server terminated abnormally: {source}")]
    Serve {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Collaborators the bootstrap sequence depends on.
pub struct BootstrapServices {
    /// Receives lifecycle events.
    pub reporter: Arc<dyn LifecycleReporter>,
    /// Opens the database connection.
    pub connector: Arc<dyn DatabaseConnector>,
    /// Route groups in registration order.
    pub route_groups: Vec<Box<dyn RouteGroup>>,
}

impl BootstrapServices {
    /// Collaborators used by the shipped binary.
    #[must_use]
    pub fn production() -> Self {
        Self {
            reporter: Arc::new(StructuredLifecycleReporter::new()),
            connector: Arc::new(MongoConnector::new()),
            route_groups: default_route_groups(),
        }
    }
}

/// A bootstrapped service with its listener bound.
pub struct Service {
    listener: TcpListener,
    address: SocketAddr,
    router: Router,
    state: Arc<ServiceState>,
}

impl Service {
    /// Address the listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// Capability snapshot frozen at startup.
    #[must_use]
    pub fn state(&self) -> &ServiceState {
        &self.state
    }

    /// The assembled application router.
    #[must_use]
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serves requests until `shutdown` resolves, then drains in-flight
    /// requests.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), BootstrapError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|source| BootstrapError::Serve { source })
    }
}

/// Runs every startup phase using the supplied collaborators.
pub async fn bootstrap_with(
    config: &Config,
    services: BootstrapServices,
) -> Result<Service, BootstrapError> {
    let BootstrapServices {
        reporter,
        connector,
        route_groups,
    } = services;

    reporter.bootstrap_starting(config);
    let result = run_phases(config, reporter.as_ref(), connector.as_ref(), &route_groups).await;
    if let Err(error) = &result {
        reporter.bootstrap_failed(error);
    }
    result
}

async fn run_phases(
    config: &Config,
    reporter: &dyn LifecycleReporter,
    connector: &dyn DatabaseConnector,
    route_groups: &[Box<dyn RouteGroup>],
) -> Result<Service, BootstrapError> {
    let address = config
        .listen_address()
        .map_err(|source| BootstrapError::Configuration { source })?;
    if config.session_secret().is_insecure_default() {
        reporter.session_secret_fallback();
    }

    let mut registry = CapabilityRegistry::new(Environment {
        mode: config.mode(),
        port: config.port,
    });

    let store = connect_database(config, connector, reporter, &mut registry).await;
    activate_capabilities(&mut registry, route_groups);

    let uploads = UploadGate::from_config(config);
    let api = register_routes(&mut registry, route_groups, &uploads, reporter)?;

    let assets =
        StaticStrategy::select(config).map_err(|source| BootstrapError::Assets { source })?;
    reporter.static_strategy_selected(assets.mode());
    let routes = api
        .nest_service(UPLOADS_PATH, ServeDir::new(config.upload_dir()))
        .fallback(frontend_fallback);

    if let Some(connected) = &store {
        seed_database(connected.as_ref(), config, &mut registry, reporter).await;
    }

    let state = registry.freeze();
    let router = routes.with_state(AppState::new(
        Arc::clone(&state),
        uploads,
        store,
        assets,
    ));
    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| BootstrapError::Bind { address, source })?;
    let bound = listener
        .local_addr()
        .map_err(|source| BootstrapError::Bind { address, source })?;
    reporter.listening(bound, &state);

    Ok(Service {
        listener,
        address: bound,
        router,
        state,
    })
}

async fn connect_database(
    config: &Config,
    connector: &dyn DatabaseConnector,
    reporter: &dyn LifecycleReporter,
    registry: &mut CapabilityRegistry,
) -> Option<Arc<dyn RecordStore>> {
    let outcome = match config.mongodb_uri() {
        Some(uri) => connector.connect(uri).await,
        None => Err(DependencyConnectionError::MissingConnectionString),
    };
    match outcome {
        Ok(store) => {
            registry.mark_database_connected();
            reporter.database_connected();
            Some(store)
        }
        Err(error) => {
            reporter.database_unavailable(&error);
            None
        }
    }
}

fn activate_capabilities(registry: &mut CapabilityRegistry, route_groups: &[Box<dyn RouteGroup>]) {
    for group in route_groups {
        let capability = group.capability();
        if let Err(error) = registry.activate(capability) {
            tracing::debug!(
                target: BOOTSTRAP_TARGET,
                capability = %capability,
                reason = %error,
                "capability left inactive"
            );
        }
    }
}

fn register_routes(
    registry: &mut CapabilityRegistry,
    route_groups: &[Box<dyn RouteGroup>],
    uploads: &UploadGate,
    reporter: &dyn LifecycleReporter,
) -> Result<Router<AppState>, BootstrapError> {
    let context = RouteContext { uploads };
    let mut router = Router::new().route(HEALTH_PATH, get(health_handler));

    for group in route_groups {
        let capability = group.capability();
        if !registry.is_active(capability) {
            router = router.merge(unavailable_routes(capability, group.mount_path()));
            continue;
        }
        match register_group(group.as_ref(), &context) {
            RegistrationOutcome::Registered(routes) => {
                router = router.merge(routes);
                reporter.capability_registered(capability);
            }
            RegistrationOutcome::Skipped(error) => {
                registry.withdraw(capability);
                reporter.capability_skipped(&error);
                router = router.merge(unavailable_routes(capability, group.mount_path()));
            }
            RegistrationOutcome::Fatal(source) => {
                return Err(BootstrapError::RequiredRouteRegistration { source });
            }
        }
    }
    Ok(router)
}

async fn seed_database(
    store: &dyn RecordStore,
    config: &Config,
    registry: &mut CapabilityRegistry,
    reporter: &dyn LifecycleReporter,
) {
    for step in SeedStep::ALL {
        match seed::run_step(step, store, config).await {
            Ok(report) => {
                if let Err(error) = registry.activate(step.capability()) {
                    tracing::warn!(
                        target: BOOTSTRAP_TARGET,
                        step = %step,
                        reason = %error,
                        "seeded capability could not be activated"
                    );
                }
                reporter.seed_completed(step, report);
                if report.reset_required {
                    reporter.admin_password_reset_required(&config.admin_username);
                }
            }
            Err(error) => reporter.seed_failed(&error),
        }
    }
}
