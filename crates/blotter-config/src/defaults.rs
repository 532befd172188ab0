//! Default values shared by the configuration loader and its callers.

/// Listener port used when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 5000;

/// Listener address used when `HOST` is unset.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// `NODE_ENV` value assumed when the variable is unset.
pub const DEFAULT_NODE_ENV: &str = "development";

/// Directory holding the prebuilt frontend bundle.
pub const DEFAULT_STATIC_DIR: &str = "dist/public";

/// Address of the frontend dev server used in development mode.
pub const DEFAULT_DEV_SERVER_URL: &str = "http://127.0.0.1:5173";

/// Root directory for accepted uploads.
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Username of the seeded administrative account.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";
