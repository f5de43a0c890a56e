use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use ledger_zk::ZkError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// The toolchain rejected the submitted witness.
    #[error("unprocessable: {0}")]
    Unprocessable(String),

    #[error("timeout: {0}")]
    Timeout(String),

    /// Logged server side; clients only see a generic message.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ZkError> for ApiError {
    fn from(err: ZkError) -> Self {
        match err {
            ZkError::Proving(msg) => ApiError::Unprocessable(msg),
            ZkError::Timeout { .. } => ApiError::Timeout(err.to_string()),
            ZkError::MissingArtifact { .. } => ApiError::Conflict(err.to_string()),
            ZkError::Serialization(msg) => ApiError::BadRequest(msg),
            ZkError::SchemeMismatch { .. } => ApiError::BadRequest(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
            ApiError::Unprocessable(m) => (StatusCode::UNPROCESSABLE_ENTITY, m.clone()),
            ApiError::Timeout(m) => (StatusCode::GATEWAY_TIMEOUT, m.clone()),
            ApiError::Internal(m) => {
                tracing::error!(error = %m, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        (status, Json(ErrorBody { error: msg })).into_response()
    }
}
