use axum::{response::IntoResponse, Json};
use tracing::error;

use crate::shared::validation::ValidationError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(Vec<ValidationError>),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }
}

impl From<Vec<ValidationError>> for ApiError {
    fn from(issues: Vec<ValidationError>) -> Self {
        Self::Validation(issues)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        match self {
            Self::Validation(issues) => {
                let issues: Vec<_> = issues
                    .iter()
                    .map(|e| {
                        serde_json::json!({ "field": e.field(), "message": e.to_string() })
                    })
                    .collect();
                (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({ "error": "Validation failed", "issues": issues })),
                )
                    .into_response()
            }
            Self::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": msg })),
            )
                .into_response(),
            Self::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": msg })),
            )
                .into_response(),
            Self::Store(e) => {
                error!("storage failure: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": "Internal storage error" })),
                )
                    .into_response()
            }
            Self::Internal(msg) => {
                error!("{msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
