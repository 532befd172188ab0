//! Configuration for the blotter records service.
//!
//! Every option is read from a command-line flag or its environment variable,
//! with flags taking precedence. The environment variable names follow the
//! deployment conventions the service has always used (`MONGODB_URI`,
//! `SESSION_SECRET`, `PORT`, `NODE_ENV`), so existing deployments keep working.

mod defaults;
mod logging;
mod mode;
mod session;

use std::ffi::OsString;
use std::net::{AddrParseError, IpAddr, SocketAddr};

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use thiserror::Error;
use url::Url;

pub use defaults::{
    DEFAULT_ADMIN_USERNAME, DEFAULT_DEV_SERVER_URL, DEFAULT_HOST, DEFAULT_LOG_FILTER,
    DEFAULT_NODE_ENV, DEFAULT_PORT, DEFAULT_STATIC_DIR, DEFAULT_UPLOAD_DIR,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use mode::{PRODUCTION_NODE_ENV, RunMode};
pub use session::SessionSecret;

/// Subdirectory of the upload root holding geospatial data files.
pub const GEOFILE_UPLOAD_SUBDIR: &str = "geofiles";

/// Subdirectory of the upload root holding custodial identification photos.
pub const CUSTODIAL_UPLOAD_SUBDIR: &str = "custodial";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Command-line or environment values could not be parsed.
    #[error(transparent)]
    Arguments(#[from] clap::Error),
    /// Production deployments must not sign sessions with the built-in key.
    #[error("SESSION_SECRET must be set when NODE_ENV={PRODUCTION_NODE_ENV}")]
    MissingSessionSecret,
    /// The listen host is not an IP address.
    #[error("invalid listen host '{host}': {source}")]
    InvalidHost {
        /// Offending host value.
        host: String,
        /// Underlying parse error.
        #[source]
        source: AddrParseError,
    },
    /// The frontend dev server address is not a URL.
    #[error("invalid dev server url '{url}': {source}")]
    InvalidDevServerUrl {
        /// Offending value.
        url: String,
        /// Underlying parse error.
        #[source]
        source: url::ParseError,
    },
}

/// Resolved service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "blotterd", version, about = "Police records service")]
pub struct Config {
    /// Document database connection string. Unset runs the service degraded.
    #[arg(long, env = "MONGODB_URI", hide_env_values = true)]
    pub mongodb_uri: Option<String>,

    /// Session signing key.
    #[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
    pub session_secret: Option<String>,

    /// Listener port.
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Listener address.
    #[arg(long, env = "HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Deployment environment; `production` serves the prebuilt bundle.
    #[arg(long = "node-env", env = "NODE_ENV", default_value = DEFAULT_NODE_ENV)]
    pub node_env: String,

    /// Directory holding the prebuilt frontend bundle.
    #[arg(long, env = "STATIC_DIR", default_value = DEFAULT_STATIC_DIR)]
    pub static_dir: Utf8PathBuf,

    /// Frontend dev server that development-mode requests are forwarded to.
    #[arg(long, env = "DEV_SERVER_URL", default_value = DEFAULT_DEV_SERVER_URL)]
    pub dev_server_url: String,

    /// Root directory for accepted uploads.
    #[arg(long, env = "UPLOAD_DIR", default_value = DEFAULT_UPLOAD_DIR)]
    pub upload_dir: Utf8PathBuf,

    /// Username of the seeded administrative account.
    #[arg(long, env = "ADMIN_USERNAME", default_value = DEFAULT_ADMIN_USERNAME)]
    pub admin_username: String,

    /// Initial password of the seeded administrative account.
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Tracing filter expression.
    #[arg(long, env = "BLOTTER_LOG", default_value = DEFAULT_LOG_FILTER)]
    pub log_filter: String,

    /// Log output format (`json` or `compact`).
    #[arg(long, env = "BLOTTER_LOG_FORMAT", default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_iter(std::env::args_os())
    }

    /// Loads configuration from explicit arguments, still consulting the
    /// environment for options the arguments omit.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let config = Self::try_parse_from(args)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints that clap cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mode().is_production() && self.session_secret().is_insecure_default() {
            return Err(ConfigError::MissingSessionSecret);
        }
        self.listen_address()?;
        self.dev_server_url()?;
        Ok(())
    }

    /// Deployment mode derived from `NODE_ENV`.
    #[must_use]
    pub fn mode(&self) -> RunMode {
        RunMode::from_node_env(&self.node_env)
    }

    /// Connection string for the document database, when configured.
    #[must_use]
    pub fn mongodb_uri(&self) -> Option<&str> {
        self.mongodb_uri.as_deref().filter(|uri| !uri.trim().is_empty())
    }

    /// Session signing key, falling back to the built-in development key.
    #[must_use]
    pub fn session_secret(&self) -> SessionSecret {
        SessionSecret::resolve(self.session_secret.as_deref())
    }

    /// Socket address the listener binds to.
    pub fn listen_address(&self) -> Result<SocketAddr, ConfigError> {
        let ip = self
            .host
            .parse::<IpAddr>()
            .map_err(|source| ConfigError::InvalidHost {
                host: self.host.clone(),
                source,
            })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Directory holding the prebuilt frontend bundle.
    #[must_use]
    pub fn static_dir(&self) -> &Utf8Path {
        self.static_dir.as_path()
    }

    /// Frontend dev server base URL.
    pub fn dev_server_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.dev_server_url).map_err(|source| ConfigError::InvalidDevServerUrl {
            url: self.dev_server_url.clone(),
            source,
        })
    }

    /// Root directory for accepted uploads, served publicly at `/uploads`.
    #[must_use]
    pub fn upload_dir(&self) -> &Utf8Path {
        self.upload_dir.as_path()
    }

    /// Destination directory for geospatial data files.
    #[must_use]
    pub fn geofile_upload_dir(&self) -> Utf8PathBuf {
        self.upload_dir.join(GEOFILE_UPLOAD_SUBDIR)
    }

    /// Destination directory for custodial identification photos.
    #[must_use]
    pub fn custodial_upload_dir(&self) -> Utf8PathBuf {
        self.upload_dir.join(CUSTODIAL_UPLOAD_SUBDIR)
    }

    /// Tracing filter expression.
    #[must_use]
    pub const fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mongodb_uri: None,
            session_secret: None,
            port: DEFAULT_PORT,
            host: DEFAULT_HOST.to_owned(),
            node_env: DEFAULT_NODE_ENV.to_owned(),
            static_dir: Utf8PathBuf::from(DEFAULT_STATIC_DIR),
            dev_server_url: DEFAULT_DEV_SERVER_URL.to_owned(),
            upload_dir: Utf8PathBuf::from(DEFAULT_UPLOAD_DIR),
            admin_username: DEFAULT_ADMIN_USERNAME.to_owned(),
            admin_password: None,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: LogFormat::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_without_session_secret_is_rejected() {
        let config = Config {
            node_env: PRODUCTION_NODE_ENV.to_owned(),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingSessionSecret)
        ));
    }

    #[test]
    fn development_tolerates_missing_session_secret() {
        let config = Config::default();
        config.validate().expect("development config is valid");
        assert!(config.session_secret().is_insecure_default());
    }

    #[test]
    fn blank_connection_string_counts_as_absent() {
        let config = Config {
            mongodb_uri: Some("   ".to_owned()),
            ..Config::default()
        };
        assert_eq!(config.mongodb_uri(), None);
    }

    #[test]
    fn rejects_non_ip_host() {
        let config = Config {
            host: "localhost".to_owned(),
            ..Config::default()
        };
        assert!(matches!(
            config.listen_address(),
            Err(ConfigError::InvalidHost { .. })
        ));
    }

    #[test]
    fn rejects_malformed_dev_server_url() {
        let config = Config {
            dev_server_url: "not a url".to_owned(),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDevServerUrl { .. })
        ));
    }

    #[test]
    fn default_dev_server_url_parses() {
        let url = Config::default()
            .dev_server_url()
            .expect("default url parses");
        assert_eq!(url.port(), Some(5173));
    }

    #[test]
    fn derives_category_directories_from_upload_root() {
        let config = Config {
            upload_dir: Utf8PathBuf::from("/srv/blotter/uploads"),
            ..Config::default()
        };
        assert_eq!(
            config.geofile_upload_dir(),
            Utf8PathBuf::from("/srv/blotter/uploads/geofiles")
        );
        assert_eq!(
            config.custodial_upload_dir(),
            Utf8PathBuf::from("/srv/blotter/uploads/custodial")
        );
    }
}
