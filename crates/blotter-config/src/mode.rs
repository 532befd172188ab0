use serde::{Deserialize, Serialize};
use strum::Display;

/// Value of `NODE_ENV` that selects the prebuilt bundle strategy.
pub const PRODUCTION_NODE_ENV: &str = "production";

/// Deployment mode the service runs in.
///
/// Only the exact value `production` selects [`RunMode::Production`]; every
/// other value, including an empty one, falls back to development.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunMode {
    /// Frontend requests are forwarded to a live asset dev server.
    Development,
    /// Frontend requests are answered from the prebuilt asset bundle.
    Production,
}

impl RunMode {
    /// Classifies a raw `NODE_ENV` value.
    #[must_use]
    pub fn from_node_env(value: &str) -> Self {
        if value == PRODUCTION_NODE_ENV {
            Self::Production
        } else {
            Self::Development
        }
    }

    /// Returns `true` for [`RunMode::Production`].
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}
