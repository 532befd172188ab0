//! Streams admitted multipart files to their destination directory.
//!
//! The extension is checked from the part headers before the destination file
//! is created. The size ceiling is re-checked as each chunk arrives, and the
//! route's transport body limit surfaces as the same
//! [`UploadRejection::PayloadTooLarge`]. Partially written files are removed
//! on every failure path.

use std::collections::BTreeMap;
use std::io;

use axum::extract::Multipart;
use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;
use camino::Utf8PathBuf;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use blotter_config::{CUSTODIAL_UPLOAD_SUBDIR, GEOFILE_UPLOAD_SUBDIR};

use super::policy::{UploadCategory, UploadGate, UploadRejection, normalised_extension};

const UPLOAD_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::upload");

/// Allowance for multipart boundaries and part headers on top of the file
/// ceiling when sizing the transport body limit.
pub const MULTIPART_ENVELOPE_BYTES: u64 = 64 * 1024;

/// Transport body limit for routes accepting `category`.
#[must_use]
pub fn body_limit(gate: &UploadGate, category: UploadCategory) -> usize {
    let ceiling = gate
        .policy(category)
        .max_size_bytes()
        .saturating_add(MULTIPART_ENVELOPE_BYTES);
    usize::try_from(ceiling).unwrap_or(usize::MAX)
}

/// Errors raised while receiving an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The admission gate refused the file.
    #[error(transparent)]
    Rejected(#[from] UploadRejection),
    /// The request carried no file in the expected field.
    #[error("multipart field '{field}' with a file name is required")]
    MissingFile {
        /// Expected field name.
        field: &'static str,
    },
    /// The multipart body could not be parsed.
    #[error("malformed multipart body: {0}")]
    Malformed(String),
    /// Writing the file failed.
    #[error("failed to store upload at '{path}': {source}")]
    Io {
        /// Destination path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl UploadError {
    fn from_multipart(error: &MultipartError) -> Self {
        if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::Rejected(UploadRejection::PayloadTooLarge)
        } else {
            Self::Malformed(error.body_text())
        }
    }
}

/// A file accepted and written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    /// File name supplied by the client.
    pub original_name: String,
    /// Generated name the file was stored under.
    pub stored_name: String,
    /// Lower-cased extension including the leading dot.
    pub extension: String,
    /// Bytes written.
    pub size_bytes: u64,
    /// Location on disk.
    pub path: Utf8PathBuf,
    /// Public URL under `/uploads`.
    pub public_url: String,
    /// Non-file form fields submitted alongside the file.
    pub fields: BTreeMap<String, String>,
}

/// Reads a multipart request, admitting and storing its single file.
pub async fn receive_upload(
    gate: &UploadGate,
    category: UploadCategory,
    mut multipart: Multipart,
) -> Result<StoredUpload, UploadError> {
    let mut fields = BTreeMap::new();
    let mut pending: Option<PendingFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| UploadError::from_multipart(&error))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        if name == category.field_name() {
            if pending.is_some() {
                return Err(UploadError::Malformed(format!(
                    "only one '{name}' part is accepted"
                )));
            }
            let Some(original) = field.file_name().map(str::to_owned) else {
                return Err(UploadError::MissingFile {
                    field: category.field_name(),
                });
            };
            pending = Some(persist_field(gate, category, original, field).await?);
        } else {
            let text = field
                .text()
                .await
                .map_err(|error| UploadError::from_multipart(&error))?;
            fields.insert(name, text);
        }
    }

    let accepted = pending.ok_or(UploadError::MissingFile {
        field: category.field_name(),
    })?;
    Ok(accepted.commit(category, fields))
}

async fn persist_field(
    gate: &UploadGate,
    category: UploadCategory,
    original: String,
    mut field: Field<'_>,
) -> Result<PendingFile, UploadError> {
    gate.evaluate(category, &original, 0).into_result()?;
    let extension = normalised_extension(&original).unwrap_or_default();
    let stored_name = format!("{}{extension}", Uuid::new_v4().simple());
    let path = gate.policy(category).destination().join(&stored_name);

    let mut pending = PendingFile {
        original_name: original,
        stored_name,
        extension,
        size_bytes: 0,
        path,
        committed: false,
    };

    let io_error = |source| UploadError::Io {
        path: pending.path.clone(),
        source,
    };
    let mut file = File::create(&pending.path).await.map_err(io_error)?;
    let mut written: u64 = 0;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|error| UploadError::from_multipart(&error))?
    {
        written = written.saturating_add(u64::try_from(chunk.len()).unwrap_or(u64::MAX));
        gate.evaluate(category, &pending.original_name, written).into_result()?;
        file.write_all(&chunk).await.map_err(io_error)?;
    }
    file.flush().await.map_err(io_error)?;
    drop(file);

    pending.size_bytes = written;
    debug!(
        target: UPLOAD_TARGET,
        category = %category,
        stored = %pending.stored_name,
        bytes = written,
        "upload written"
    );
    Ok(pending)
}

/// File on disk that is removed unless committed.
struct PendingFile {
    original_name: String,
    stored_name: String,
    extension: String,
    size_bytes: u64,
    path: Utf8PathBuf,
    committed: bool,
}

impl PendingFile {
    fn commit(
        mut self,
        category: UploadCategory,
        fields: BTreeMap<String, String>,
    ) -> StoredUpload {
        self.committed = true;
        StoredUpload {
            original_name: std::mem::take(&mut self.original_name),
            public_url: format!("/uploads/{}/{}", public_subdir(category), self.stored_name),
            stored_name: std::mem::take(&mut self.stored_name),
            extension: std::mem::take(&mut self.extension),
            size_bytes: self.size_bytes,
            path: self.path.clone(),
            fields,
        }
    }
}

impl Drop for PendingFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        // Drop cannot await, so the unlink runs synchronously.
        if let Err(error) = std::fs::remove_file(&self.path)
            && error.kind() != io::ErrorKind::NotFound
        {
            tracing::warn!(
                target: UPLOAD_TARGET,
                path = %self.path,
                error = %error,
                "failed to remove partial upload"
            );
        }
    }
}

const fn public_subdir(category: UploadCategory) -> &'static str {
    match category {
        UploadCategory::Geofile => GEOFILE_UPLOAD_SUBDIR,
        UploadCategory::CustodialPhoto => CUSTODIAL_UPLOAD_SUBDIR,
    }
}
