//! API error type: every failure leaves the daemon as
//! `{"error": <kind>, "message": <detail>}` with a matching HTTP status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::scan::ScanError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing or invalid bearer token")]
    Unauthorized,
    #[error("task {0} not found")]
    TaskNotFound(usize),
    #[error("no mapping for tag {0}")]
    MappingNotFound(String),
    #[error("tag {0} is not mapped to a task; supply task_title to create one")]
    UnmappedTag(String),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "unauthorized",
            ApiError::TaskNotFound(_) => "task_not_found",
            ApiError::MappingNotFound(_) => "mapping_not_found",
            ApiError::UnmappedTag(_) => "unmapped_tag",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::TaskNotFound(_)
            | ApiError::MappingNotFound(_)
            | ApiError::UnmappedTag(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(ref e) = self {
            tracing::error!(err = %e, "request failed");
        }
        let body = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}

impl From<ScanError> for ApiError {
    fn from(e: ScanError) -> ApiError {
        match e {
            ScanError::EmptyTag => ApiError::BadRequest(e.to_string()),
            ScanError::UnmappedTag(tag) => ApiError::UnmappedTag(tag),
            ScanError::Storage(inner) => ApiError::Internal(inner),
        }
    }
}
