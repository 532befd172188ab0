use std::fmt;

/// Session signing key resolved from configuration.
///
/// The [`fmt::Debug`] output never contains the key material.
#[derive(Clone, PartialEq, Eq)]
pub enum SessionSecret {
    /// Key supplied through `SESSION_SECRET` or `--session-secret`.
    Configured(String),
    /// Built-in development key. Anyone reading the source can forge sessions
    /// signed with it.
    InsecureDefault,
}

impl SessionSecret {
    pub(crate) fn resolve(value: Option<&str>) -> Self {
        match value {
            Some(secret) if !secret.is_empty() => Self::Configured(secret.to_owned()),
            _ => Self::InsecureDefault,
        }
    }

    /// Returns `true` when the built-in key is in use.
    #[must_use]
    pub const fn is_insecure_default(&self) -> bool {
        matches!(self, Self::InsecureDefault)
    }
}

impl fmt::Debug for SessionSecret {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configured(_) => formatter.write_str("SessionSecret::Configured(<redacted>)"),
            Self::InsecureDefault => formatter.write_str("SessionSecret::InsecureDefault"),
        }
    }
}
