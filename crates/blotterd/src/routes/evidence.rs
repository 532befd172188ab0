//! Evidence intake records.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capabilities::Capability;
use crate::clock::now_rfc3339;

use super::ledger::Identified;
use super::{
    ApiError, AppState, RegistrationError, RouteContext, RouteGroup, optional_text, required_text,
};

const MOUNT_PATH: &str = "/api/evidence";

/// Status given to newly logged items.
pub const INITIAL_STATUS: &str = "in_custody";

/// A logged evidence item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceRecord {
    /// Record identifier.
    pub id: String,
    /// Case the item belongs to.
    pub case_number: String,
    /// What was collected.
    pub item_description: String,
    /// Officer who collected the item.
    pub collected_by: String,
    /// Where the item was found.
    pub location: Option<String>,
    /// Custody status.
    pub status: String,
    /// RFC 3339 timestamp.
    pub collected_at: String,
}

impl Identified for EvidenceRecord {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Request body for logging an item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvidence {
    /// Case the item belongs to.
    pub case_number: String,
    /// What was collected.
    pub item_description: String,
    /// Officer who collected the item.
    pub collected_by: String,
    /// Where the item was found.
    #[serde(default)]
    pub location: Option<String>,
}

impl NewEvidence {
    fn into_record(self) -> Result<EvidenceRecord, ApiError> {
        Ok(EvidenceRecord {
            id: Uuid::new_v4().to_string(),
            case_number: required_text("caseNumber", &self.case_number)?,
            item_description: required_text("itemDescription", &self.item_description)?,
            collected_by: required_text("collectedBy", &self.collected_by)?,
            location: optional_text(self.location.as_deref()),
            status: INITIAL_STATUS.to_owned(),
            collected_at: now_rfc3339(),
        })
    }
}

/// Evidence routes; they keep records in process and never touch the database.
#[derive(Debug, Default, Clone, Copy)]
pub struct EvidenceRoutes;

impl RouteGroup for EvidenceRoutes {
    fn capability(&self) -> Capability {
        Capability::Evidence
    }

    fn mount_path(&self) -> &'static str {
        MOUNT_PATH
    }

    fn register(&self, _context: &RouteContext<'_>) -> Result<Router<AppState>, RegistrationError> {
        Ok(Router::new()
            .route(MOUNT_PATH, get(list_evidence).post(create_evidence))
            .route(&format!("{MOUNT_PATH}/{{id}}"), get(get_evidence)))
    }
}

async fn list_evidence(State(state): State<AppState>) -> Json<Vec<EvidenceRecord>> {
    Json(state.evidence().list().await)
}

async fn create_evidence(
    State(state): State<AppState>,
    body: Result<Json<NewEvidence>, JsonRejection>,
) -> Result<(StatusCode, Json<EvidenceRecord>), ApiError> {
    let Json(submission) = body?;
    let stored = state.evidence().insert(submission.into_record()?).await;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn get_evidence(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EvidenceRecord>, ApiError> {
    state
        .evidence()
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("evidence record '{id}' not found")))
}
