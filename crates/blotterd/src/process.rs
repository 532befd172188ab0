//! Process-level entry point: telemetry, bootstrap, serve, shutdown.

use tokio::signal;
use tracing::info;

use blotter_config::Config;

use crate::bootstrap::{BootstrapError, BootstrapServices, bootstrap_with};
use crate::telemetry;

const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

/// Runs the service until a termination signal arrives.
pub async fn run_service(config: Config) -> Result<(), BootstrapError> {
    telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    let service = bootstrap_with(&config, BootstrapServices::production()).await?;
    let result = service.serve(shutdown_signal()).await;
    match &result {
        Ok(()) => info!(target: PROCESS_TARGET, "service stopped"),
        Err(error) => tracing::error!(target: PROCESS_TARGET, error = %error, "service stopped"),
    }
    result
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
///
/// A listener that cannot be installed never resolves rather than stopping
/// the service immediately.
pub async fn shutdown_signal() {
    let interrupt = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::warn!(target: PROCESS_TARGET, error = %error, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::warn!(target: PROCESS_TARGET, error = %error, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {
            info!(target: PROCESS_TARGET, signal = "SIGINT", "shutdown signal received");
        }
        () = terminate => {
            info!(target: PROCESS_TARGET, signal = "SIGTERM", "shutdown signal received");
        }
    }
}
