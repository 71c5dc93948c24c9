use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::store::StoreError;

/// ApiError
///
/// The single failure type returned by the core components and the HTTP handlers.
/// Every variant carries a human-readable message and maps to a stable,
/// machine-readable kind (see [`ApiError::kind`]) so clients never have to parse prose.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Malformed id, missing required field, self-reference, unknown field or sort key.
    #[error("{0}")]
    InvalidArgument(String),

    /// The addressed entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The actor is authenticated but does not own the entity.
    #[error("{0}")]
    Forbidden(String),

    /// A uniqueness constraint was violated twice in a row by concurrent writers.
    #[error("{0}")]
    Conflict(String),

    /// The store or an upstream service could not be reached.
    #[error("{0}")]
    Unavailable(String),

    /// A store call exceeded the configured deadline.
    #[error("{0}")]
    Timeout(String),

    /// An invariant the code relies on did not hold.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// kind
    ///
    /// The stable identifier sent to clients in the `error` field of the envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidArgument(_) => "InvalidArgument",
            ApiError::NotFound(_) => "NotFound",
            ApiError::Forbidden(_) => "Forbidden",
            ApiError::Conflict(_) => "Conflict",
            ApiError::Unavailable(_) => "Unavailable",
            ApiError::Timeout(_) => "Timeout",
            ApiError::Internal(_) => "Internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ApiError::InvalidArgument(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::Timeout(after) => {
                ApiError::Timeout(format!("store call timed out after {} ms", after.as_millis()))
            }
            StoreError::Unavailable(msg) => ApiError::Unavailable(msg),
            StoreError::Corrupt(msg) => ApiError::Internal(msg),
        }
    }
}

/// ErrorBody
///
/// The failure variant of the response envelope.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    /// Stable error kind, e.g. `InvalidArgument`.
    pub error: String,
    pub message: String,
    pub success: bool,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal details stay in the logs.
        let message = match &self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "internal error");
                "Internal server error".to_string()
            }
            ApiError::Unavailable(detail) | ApiError::Timeout(detail) => {
                tracing::warn!(kind = self.kind(), error = %detail, "upstream failure");
                self.to_string()
            }
            _ => self.to_string(),
        };

        let body = ErrorBody {
            status_code: status.as_u16(),
            error: self.kind().to_string(),
            message,
            success: false,
        };

        (status, Json(body)).into_response()
    }
}

/// Result alias used across the crate.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn kinds_map_to_expected_status_codes() {
        assert_eq!(ApiError::invalid("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::Unavailable("x".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::Timeout("x".into()).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn store_timeout_becomes_timeout_kind() {
        let err: ApiError = StoreError::Timeout(Duration::from_millis(250)).into();
        assert_eq!(err.kind(), "Timeout");
        assert!(err.to_string().contains("250"));
    }

    #[tokio::test]
    async fn error_response_carries_kind_and_hides_internal_detail() {
        let response = ApiError::Internal("pool poisoned".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error, "Internal");
        assert!(!body.success);
        assert!(!body.message.contains("pool"));
    }
}
