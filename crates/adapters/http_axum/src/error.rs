//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use medinfra_domain::error::{InfraError, NotFoundError, ValidationError};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`InfraError`] (and a missing caller scope) to an HTTP response.
#[derive(Debug)]
pub enum ApiError {
    /// The branch/actor headers are missing or malformed.
    Unauthorized(String),
    Infra(InfraError),
}

impl From<InfraError> for ApiError {
    fn from(err: InfraError) -> Self {
        Self::Infra(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Infra(err.into())
    }
}

impl From<NotFoundError> for ApiError {
    fn from(err: NotFoundError) -> Self {
        Self::Infra(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Unauthorized(reason) => (StatusCode::UNAUTHORIZED, reason.clone()),
            Self::Infra(InfraError::Validation(err)) => (StatusCode::BAD_REQUEST, err.to_string()),
            Self::Infra(InfraError::Conflict(err)) => (StatusCode::CONFLICT, err.to_string()),
            Self::Infra(InfraError::NotFound(err)) => (StatusCode::NOT_FOUND, err.to_string()),
            Self::Infra(InfraError::Storage(err)) => {
                tracing::error!(error = %err, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
