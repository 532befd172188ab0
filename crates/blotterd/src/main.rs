//! `blotterd` binary: loads configuration and runs the records service.

use std::io::Write;
use std::process::ExitCode;

use blotter_config::{Config, ConfigError};
use blotterd::BootstrapError;

fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(ConfigError::Arguments(error)) => error.exit(),
        Err(error) => return report(&error),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => return report(&error),
    };

    match runtime.block_on(blotterd::run_service(config)) {
        Ok(()) => ExitCode::SUCCESS,
        // Telemetry is not installed yet, so nothing else will print this.
        Err(error @ BootstrapError::Telemetry { .. }) => report(&error),
        Err(_) => ExitCode::FAILURE,
    }
}

fn report(error: &dyn std::error::Error) -> ExitCode {
    // A closed stderr leaves nowhere else to report to.
    match writeln!(std::io::stderr(), "blotterd: {error}") {
        Ok(()) | Err(_) => ExitCode::FAILURE,
    }
}
