//! Error rendering for the control API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::SupervisorError;

/// Error returned by API handlers, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    /// A registry operation failed.
    Supervisor(SupervisorError),
    /// The requested server is not configured.
    NotFound(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Supervisor(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::Supervisor(SupervisorError::ShuttingDown { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Supervisor(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SupervisorError> for ApiError {
    fn from(e: SupervisorError) -> Self {
        Self::Supervisor(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Supervisor(e) => e.to_string(),
            Self::NotFound(name) => format!("server '{name}' is not configured"),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
