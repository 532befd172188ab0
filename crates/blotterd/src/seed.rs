//! Best-effort population of a fresh database.
//!
//! Each [`SeedStep`] runs independently; one failing does not prevent the
//! other from running, and neither prevents the listener from opening.

use std::fmt;

use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use blotter_config::Config;

use crate::capabilities::Capability;
use crate::clock::now_rfc3339;
use crate::database::{AccountRecord, GeofileRecord, RecordStore, StoreError};

/// Role assigned to the seeded administrative account.
pub const ADMIN_ROLE: &str = "admin";

/// Independent seed operations, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeedStep {
    /// Sample geofile records describing precinct geography.
    ReferenceData,
    /// The default administrative account.
    AdminAccount,
}

impl SeedStep {
    /// Every seed step, in execution order.
    pub const ALL: [Self; 2] = [Self::ReferenceData, Self::AdminAccount];

    /// Capability activated when the step succeeds.
    #[must_use]
    pub const fn capability(self) -> Capability {
        match self {
            Self::ReferenceData => Capability::ReferenceData,
            Self::AdminAccount => Capability::AdminAccount,
        }
    }
}

impl fmt::Display for SeedStep {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.capability(), formatter)
    }
}

/// A seed step failed.
#[derive(Debug, Error)]
#[error("seed step {step} failed: {source}")]
pub struct SeedDataError {
    /// Step that failed.
    pub step: SeedStep,
    #[source]
    source: StoreError,
}

/// What a successful seed step changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    /// Records inserted; zero when the data was already present.
    pub inserted: usize,
    /// A newly created account holds a generated password nobody knows; it
    /// stays unusable until an operator resets it.
    pub reset_required: bool,
}

/// Runs one seed step against `store`.
pub async fn run_step(
    step: SeedStep,
    store: &dyn RecordStore,
    config: &Config,
) -> Result<SeedReport, SeedDataError> {
    let outcome = match step {
        SeedStep::ReferenceData => store
            .seed_reference_geofiles(&reference_geofiles())
            .await
            .map(|inserted| SeedReport {
                inserted,
                reset_required: false,
            }),
        SeedStep::AdminAccount => {
            let account = admin_account(config);
            store
                .ensure_account(&account)
                .await
                .map(|created| SeedReport {
                    inserted: usize::from(created),
                    reset_required: created && account.must_reset_password,
                })
        }
    };
    outcome.map_err(|source| SeedDataError { step, source })
}

/// Reference geofile records loaded into an empty database.
#[must_use]
pub fn reference_geofiles() -> Vec<GeofileRecord> {
    let seeded_at = now_rfc3339();
    [
        (
            "Precinct boundaries",
            ".geojson",
            "Polygon outlines for every precinct in the jurisdiction",
        ),
        (
            "Patrol sectors",
            ".kml",
            "Sector assignments used for beat scheduling",
        ),
        (
            "Incident hotspots",
            ".csv",
            "Geocoded incident counts aggregated per block",
        ),
    ]
    .into_iter()
    .map(|(name, file_type, description)| GeofileRecord {
        id: Uuid::new_v4().to_string(),
        name: name.to_owned(),
        file_type: file_type.to_owned(),
        original_filename: None,
        stored_name: None,
        url: None,
        size_bytes: 0,
        description: Some(description.to_owned()),
        uploaded_at: seeded_at.clone(),
        reference: true,
    })
    .collect()
}

/// Builds the default administrative account from configuration.
///
/// Without a configured password a random one is generated and the account
/// is flagged for reset; the generated password is never logged.
#[must_use]
pub fn admin_account(config: &Config) -> AccountRecord {
    let (password, must_reset_password) = match config.admin_password.as_deref() {
        Some(password) if !password.is_empty() => (password.to_owned(), false),
        _ => (Uuid::new_v4().simple().to_string(), true),
    };
    let salt = Uuid::new_v4().simple().to_string();
    AccountRecord {
        username: config.admin_username.clone(),
        password_digest: password_digest(&salt, &password),
        salt,
        role: ADMIN_ROLE.to_owned(),
        must_reset_password,
        created_at: now_rfc3339(),
    }
}

/// Hex-encoded SHA-256 of `salt` followed by `password`.
#[must_use]
pub fn password_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
