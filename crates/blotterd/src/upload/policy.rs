//! Extension and size policy applied to every uploaded file.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use thiserror::Error;

use blotter_config::Config;

const MIB: u64 = 1024 * 1024;

/// Extensions accepted for geospatial data files.
pub const GEOFILE_EXTENSIONS: [&str; 7] =
    [".shp", ".kml", ".geojson", ".csv", ".gpx", ".kmz", ".gml"];

/// Ceiling for a single geospatial data file.
pub const GEOFILE_MAX_BYTES: u64 = 50 * MIB;

/// Extensions accepted for custodial identification photos.
pub const CUSTODIAL_PHOTO_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];

/// Ceiling for a single identification photo.
pub const CUSTODIAL_PHOTO_MAX_BYTES: u64 = 5 * MIB;

/// Upload categories, each governed by its own [`UploadPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadCategory {
    /// Geospatial data files attached to geofile records.
    Geofile,
    /// Identification photographs attached to custodial records.
    CustodialPhoto,
}

impl UploadCategory {
    /// Stable label used in logs and error bodies.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Geofile => "geofile",
            Self::CustodialPhoto => "custodial-photo",
        }
    }

    /// Multipart field that carries the file for this category.
    #[must_use]
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::Geofile => "file",
            Self::CustodialPhoto => "photo",
        }
    }
}

impl fmt::Display for UploadCategory {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

/// Reasons an upload is refused.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadRejection {
    /// The file extension is not on the category's allow-list.
    #[error("unsupported file type")]
    UnsupportedFileType,
    /// The file exceeds the category's size ceiling.
    #[error("file exceeds the size limit")]
    PayloadTooLarge,
}

impl UploadRejection {
    /// Machine-readable code returned to clients.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::UnsupportedFileType => "unsupported_file_type",
            Self::PayloadTooLarge => "payload_too_large",
        }
    }
}

/// Outcome of evaluating one file against its category's policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadDecision {
    reason: Option<UploadRejection>,
}

impl UploadDecision {
    const fn accept() -> Self {
        Self { reason: None }
    }

    const fn reject(reason: UploadRejection) -> Self {
        Self {
            reason: Some(reason),
        }
    }

    /// Returns `true` when the file may be persisted.
    #[must_use]
    pub const fn accepted(&self) -> bool {
        self.reason.is_none()
    }

    /// Why the file was refused, if it was.
    #[must_use]
    pub const fn reason(&self) -> Option<UploadRejection> {
        self.reason
    }

    /// Converts the decision into a `Result` for `?` propagation.
    pub const fn into_result(self) -> Result<(), UploadRejection> {
        match self.reason {
            None => Ok(()),
            Some(reason) => Err(reason),
        }
    }
}

/// Allow-list, ceiling, and destination for one upload category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    allowed_extensions: BTreeSet<String>,
    max_size_bytes: u64,
    destination: Utf8PathBuf,
}

impl UploadPolicy {
    /// Builds a policy. Extensions are normalised to lower case with a
    /// leading dot.
    #[must_use]
    pub fn new<I, S>(extensions: I, max_size_bytes: u64, destination: Utf8PathBuf) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed_extensions = extensions
            .into_iter()
            .map(|extension| {
                let lowered = extension.as_ref().trim().to_ascii_lowercase();
                if lowered.starts_with('.') {
                    lowered
                } else {
                    format!(".{lowered}")
                }
            })
            .collect();
        Self {
            allowed_extensions,
            max_size_bytes,
            destination,
        }
    }

    /// Size ceiling in bytes.
    #[must_use]
    pub const fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Directory accepted files are written to.
    #[must_use]
    pub fn destination(&self) -> &Utf8Path {
        self.destination.as_path()
    }

    /// Extension check first, then size; the first failure wins.
    #[must_use]
    pub fn evaluate(&self, filename: &str, declared_size: u64) -> UploadDecision {
        let Some(extension) = normalised_extension(filename) else {
            return UploadDecision::reject(UploadRejection::UnsupportedFileType);
        };
        if !self.allowed_extensions.contains(&extension) {
            return UploadDecision::reject(UploadRejection::UnsupportedFileType);
        }
        if declared_size > self.max_size_bytes {
            return UploadDecision::reject(UploadRejection::PayloadTooLarge);
        }
        UploadDecision::accept()
    }
}

/// Returns the lower-cased extension of `filename` with a leading dot.
///
/// Only the final path component is considered, so client-supplied
/// directory prefixes are ignored. Dotfiles such as `.kml` have no extension.
#[must_use]
pub fn normalised_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|extension| extension.to_str())
        .filter(|extension| !extension.is_empty())
        .map(|extension| format!(".{}", extension.to_ascii_lowercase()))
}

/// Admission gate holding one immutable policy per category.
///
/// The gate inspects file names and sizes only; contents are never sniffed,
/// so a renamed executable with an allowed extension is admitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadGate {
    geofile: UploadPolicy,
    custodial_photo: UploadPolicy,
}

impl UploadGate {
    /// Builds a gate from explicit policies.
    #[must_use]
    pub const fn new(geofile: UploadPolicy, custodial_photo: UploadPolicy) -> Self {
        Self {
            geofile,
            custodial_photo,
        }
    }

    /// Builds the standard policies rooted at the configured upload directory.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            UploadPolicy::new(
                GEOFILE_EXTENSIONS,
                GEOFILE_MAX_BYTES,
                config.geofile_upload_dir(),
            ),
            UploadPolicy::new(
                CUSTODIAL_PHOTO_EXTENSIONS,
                CUSTODIAL_PHOTO_MAX_BYTES,
                config.custodial_upload_dir(),
            ),
        )
    }

    /// Policy governing `category`.
    #[must_use]
    pub const fn policy(&self, category: UploadCategory) -> &UploadPolicy {
        match category {
            UploadCategory::Geofile => &self.geofile,
            UploadCategory::CustodialPhoto => &self.custodial_photo,
        }
    }

    /// Decides whether a file may be persisted under `category`.
    #[must_use]
    pub fn evaluate(
        &self,
        category: UploadCategory,
        filename: &str,
        declared_size: u64,
    ) -> UploadDecision {
        self.policy(category).evaluate(filename, declared_size)
    }
}
