//! Geospatial file uploads, backed by the database.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use crate::capabilities::Capability;
use crate::clock::now_rfc3339;
use crate::database::GeofileRecord;
use crate::upload::{StoredUpload, UploadCategory, body_limit, receive_upload};

use super::{ApiError, AppState, RegistrationError, RouteContext, RouteGroup, optional_text};

const MOUNT_PATH: &str = "/api/geofiles";

/// Geofile routes. Registered only while the database is connected.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeofileRoutes;

impl RouteGroup for GeofileRoutes {
    fn capability(&self) -> Capability {
        Capability::Geofiles
    }

    fn mount_path(&self) -> &'static str {
        MOUNT_PATH
    }

    fn register(&self, context: &RouteContext<'_>) -> Result<Router<AppState>, RegistrationError> {
        let category = UploadCategory::Geofile;
        let destination = context.uploads.policy(category).destination();
        std::fs::create_dir_all(destination).map_err(|error| {
            RegistrationError::with_source(
                self.capability(),
                format!("cannot create geofile directory '{destination}'"),
                error,
            )
        })?;

        let upload_limit = DefaultBodyLimit::max(body_limit(context.uploads, category));
        Ok(Router::new().route(
            MOUNT_PATH,
            get(list_geofiles).post(upload_geofile).layer(upload_limit),
        ))
    }
}

async fn list_geofiles(
    State(state): State<AppState>,
) -> Result<Json<Vec<GeofileRecord>>, ApiError> {
    let store = state.store_for(Capability::Geofiles)?;
    Ok(Json(store.list_geofiles().await?))
}

async fn upload_geofile(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<GeofileRecord>), ApiError> {
    let store = state.store_for(Capability::Geofiles)?;
    let stored = receive_upload(state.uploads(), UploadCategory::Geofile, multipart?).await?;
    let record = record_for(&stored);
    if let Err(error) = store.insert_geofile(&record).await {
        if let Err(remove) = tokio::fs::remove_file(&stored.path).await {
            tracing::warn!(
                path = %stored.path,
                error = %remove,
                "failed to remove unrecorded geofile"
            );
        }
        return Err(error.into());
    }
    Ok((StatusCode::CREATED, Json(record)))
}

fn record_for(stored: &StoredUpload) -> GeofileRecord {
    let name = optional_text(stored.fields.get("name").map(String::as_str))
        .unwrap_or_else(|| stored.original_name.clone());
    GeofileRecord {
        id: Uuid::new_v4().to_string(),
        name,
        file_type: stored.extension.clone(),
        original_filename: Some(stored.original_name.clone()),
        stored_name: Some(stored.stored_name.clone()),
        url: Some(stored.public_url.clone()),
        size_bytes: i64::try_from(stored.size_bytes).unwrap_or(i64::MAX),
        description: optional_text(stored.fields.get("description").map(String::as_str)),
        uploaded_at: now_rfc3339(),
        reference: false,
    }
}
