//! JSON error bodies shared by every route group.

use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, StatusCode, header::RETRY_AFTER};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::capabilities::Capability;
use crate::database::StoreError;
use crate::upload::{UploadError, UploadRejection};

const ROUTES_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::routes");

/// Machine-readable error codes returned in the `code` field.
pub mod codes {
    /// The request body failed validation.
    pub const INVALID_REQUEST: &str = "invalid_request";
    /// No resource or route matched.
    pub const NOT_FOUND: &str = "not_found";
    /// The capability behind the route is inactive.
    pub const CAPABILITY_UNAVAILABLE: &str = "capability_unavailable";
    /// A multipart body carried no file in the expected field.
    pub const MISSING_FILE: &str = "missing_file";
    /// A multipart body could not be parsed.
    pub const MALFORMED_UPLOAD: &str = "malformed_upload";
    /// Persisting data failed.
    pub const STORAGE_FAILURE: &str = "storage_failure";
}

/// Wire shape of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
    /// Stable machine-readable code.
    pub code: &'static str,
}

/// Error returned from a route handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: message.into(),
                code,
            },
        }
    }

    /// 400 for a body that failed validation.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::INVALID_REQUEST, message)
    }

    /// 404 for an unknown resource.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message)
    }

    /// 503 for a route whose capability is inactive.
    #[must_use]
    pub fn unavailable(capability: Capability) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::CAPABILITY_UNAVAILABLE,
            format!("{capability} is unavailable while the service runs without a database"),
        )
    }

    /// HTTP status of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.body.code
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid_request(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            codes::MALFORMED_UPLOAD,
            rejection.body_text(),
        )
    }
}

impl From<UploadRejection> for ApiError {
    fn from(rejection: UploadRejection) -> Self {
        let status = match rejection {
            UploadRejection::UnsupportedFileType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            UploadRejection::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        };
        Self::new(status, rejection.code(), rejection.to_string())
    }
}

impl From<UploadError> for ApiError {
    fn from(error: UploadError) -> Self {
        match error {
            UploadError::Rejected(rejection) => rejection.into(),
            UploadError::MissingFile { .. } => {
                Self::new(StatusCode::BAD_REQUEST, codes::MISSING_FILE, error.to_string())
            }
            UploadError::Malformed(_) => Self::new(
                StatusCode::BAD_REQUEST,
                codes::MALFORMED_UPLOAD,
                error.to_string(),
            ),
            UploadError::Io { .. } => {
                tracing::error!(target: ROUTES_TARGET, error = %error, "upload storage failed");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    codes::STORAGE_FAILURE,
                    "failed to store upload",
                )
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        tracing::error!(
            target: ROUTES_TARGET,
            operation = error.operation(),
            error = %error,
            "database operation failed"
        );
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::STORAGE_FAILURE,
            format!("database operation '{}' failed", error.operation()),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        if self.status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from_static("30"));
        }
        response
    }
}
