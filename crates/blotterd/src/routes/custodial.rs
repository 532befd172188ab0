//! Custodial (booking) records and their photographs.

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capabilities::Capability;
use crate::clock::now_rfc3339;
use crate::upload::{UploadCategory, body_limit, receive_upload};

use super::ledger::Identified;
use super::{
    ApiError, AppState, RegistrationError, RouteContext, RouteGroup, optional_text, required_text,
};

const MOUNT_PATH: &str = "/api/custodial";

/// A booking record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustodialRecord {
    /// Record identifier.
    pub id: String,
    /// Person in custody.
    pub full_name: String,
    /// Booking reference.
    pub booking_number: String,
    /// Charges filed at booking.
    pub charges: Vec<String>,
    /// RFC 3339 timestamp.
    pub booked_at: String,
    /// Public URL of the booking photograph.
    pub photo_url: Option<String>,
}

impl Identified for CustodialRecord {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Request body for a booking.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustodialRecord {
    /// Person in custody.
    pub full_name: String,
    /// Booking reference; generated when absent.
    #[serde(default)]
    pub booking_number: Option<String>,
    /// Charges filed at booking.
    #[serde(default)]
    pub charges: Vec<String>,
}

impl NewCustodialRecord {
    fn into_record(self) -> Result<CustodialRecord, ApiError> {
        let id = Uuid::new_v4();
        let booking_number = optional_text(self.booking_number.as_deref())
            .unwrap_or_else(|| generated_booking_number(id));
        Ok(CustodialRecord {
            id: id.to_string(),
            full_name: required_text("fullName", &self.full_name)?,
            booking_number,
            charges: self
                .charges
                .iter()
                .filter_map(|charge| optional_text(Some(charge)))
                .collect(),
            booked_at: now_rfc3339(),
            photo_url: None,
        })
    }
}

fn generated_booking_number(id: Uuid) -> String {
    let prefix: String = id.simple().to_string().chars().take(8).collect();
    format!("BK-{}", prefix.to_ascii_uppercase())
}

/// Custodial routes; records live in process, photos on disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct CustodialRoutes;

impl RouteGroup for CustodialRoutes {
    fn capability(&self) -> Capability {
        Capability::Custodial
    }

    fn mount_path(&self) -> &'static str {
        MOUNT_PATH
    }

    fn register(&self, context: &RouteContext<'_>) -> Result<Router<AppState>, RegistrationError> {
        let category = UploadCategory::CustodialPhoto;
        let destination = context.uploads.policy(category).destination();
        std::fs::create_dir_all(destination).map_err(|error| {
            RegistrationError::with_source(
                self.capability(),
                format!("cannot create photo directory '{destination}'"),
                error,
            )
        })?;

        let photo_limit = DefaultBodyLimit::max(body_limit(context.uploads, category));
        Ok(Router::new()
            .route(MOUNT_PATH, get(list_records).post(create_record))
            .route(&format!("{MOUNT_PATH}/{{id}}"), get(get_record))
            .route(
                &format!("{MOUNT_PATH}/{{id}}/photo"),
                post(upload_photo).layer(photo_limit),
            ))
    }
}

async fn list_records(State(state): State<AppState>) -> Json<Vec<CustodialRecord>> {
    Json(state.custodial().list().await)
}

async fn create_record(
    State(state): State<AppState>,
    body: Result<Json<NewCustodialRecord>, JsonRejection>,
) -> Result<(StatusCode, Json<CustodialRecord>), ApiError> {
    let Json(submission) = body?;
    let stored = state.custodial().insert(submission.into_record()?).await;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CustodialRecord>, ApiError> {
    state
        .custodial()
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| not_found(&id))
}

async fn upload_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<CustodialRecord>, ApiError> {
    if !state.custodial().contains(&id).await {
        return Err(not_found(&id));
    }
    let stored =
        receive_upload(state.uploads(), UploadCategory::CustodialPhoto, multipart?).await?;
    let photo_url = stored.public_url.clone();
    match state
        .custodial()
        .update(&id, |record| record.photo_url = Some(photo_url))
        .await
    {
        Some(record) => Ok(Json(record)),
        None => {
            if let Err(error) = tokio::fs::remove_file(&stored.path).await {
                tracing::warn!(
                    path = %stored.path,
                    error = %error,
                    "failed to remove orphaned photo"
                );
            }
            Err(not_found(&id))
        }
    }
}

fn not_found(id: &str) -> ApiError {
    ApiError::not_found(format!("custodial record '{id}' not found"))
}
