//! Process-wide `tracing` subscriber.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::{self, time::UtcTime};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

use blotter_config::{Config, LogFormat};

static INSTALLED_FORMAT: OnceCell<LogFormat> = OnceCell::new();

/// Proof that the subscriber is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
}

impl TelemetryHandle {
    /// Format chosen by the call that installed the subscriber.
    #[must_use]
    pub const fn format(self) -> LogFormat {
        self.format
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// `BLOTTER_LOG` is not a valid filter directive.
    #[error("invalid log filter '{directive}': {source}")]
    Filter {
        /// Rejected directive.
        directive: String,
        /// Parser error.
        #[source]
        source: ParseError,
    },
    /// Another subscriber was already installed.
    #[error("failed to install telemetry subscriber: {0}")]
    Install(#[source] TryInitError),
}

/// Installs the global subscriber on first use.
///
/// Later calls keep the first installation, whatever their configuration,
/// and report the format it used.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED_FORMAT
        .get_or_try_init(|| install(config).map(|()| config.log_format()))
        .map(|format| TelemetryHandle { format: *format })
}

fn install(config: &Config) -> Result<(), TelemetryError> {
    let filter = log_filter(config.log_filter())?;
    let ansi = io::stderr().is_terminal();

    // Exactly one of these is `Some`.
    let (json, compact) = match config.log_format() {
        LogFormat::Json => (
            Some(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_writer(io::stderr)
                    .with_timer(UtcTime::rfc_3339()),
            ),
            None,
        ),
        LogFormat::Compact => (
            None,
            Some(
                fmt::layer()
                    .compact()
                    .with_ansi(ansi)
                    .with_writer(io::stderr)
                    .with_timer(UtcTime::rfc_3339()),
            ),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(compact)
        .try_init()
        .map_err(TelemetryError::Install)
}

fn log_filter(directive: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(directive).map_err(|source| TelemetryError::Filter {
        directive: directive.to_owned(),
        source,
    })
}
