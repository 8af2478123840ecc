//! Unified error handling for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use eventdeck_engine::{AuthError, SchemaError, StoreError, ValidationError};
use serde::Serialize;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Engine(#[from] eventdeck_engine::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::Engine(e.into())
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        AppError::Engine(e.into())
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Engine(e.into())
    }
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    fn status(&self) -> StatusCode {
        use eventdeck_engine::Error;

        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Schema(SchemaError::CollectionNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Schema(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Engine(e) => match e {
                Error::Validation(_) => StatusCode::BAD_REQUEST,
                Error::Auth(AuthError::EmailInUse(_)) => StatusCode::CONFLICT,
                Error::Auth(AuthError::Provider(_)) => StatusCode::INTERNAL_SERVER_ERROR,
                Error::Auth(_) => StatusCode::UNAUTHORIZED,
                Error::NotOwner(_) => StatusCode::FORBIDDEN,
                Error::Store(StoreError::NotFound(_)) | Error::DocumentNotInView(_) => {
                    StatusCode::NOT_FOUND
                }
                Error::Store(StoreError::PermissionDenied(_)) => StatusCode::FORBIDDEN,
                Error::Store(_) | Error::Subscription(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (error_message, details) = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                ("Database error".to_string(), None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("Internal server error".to_string(), Some(msg.clone()))
            }
            AppError::Engine(e) if status.is_server_error() => {
                tracing::error!("Engine error: {:?}", e);
                ("Internal server error".to_string(), Some(e.to_string()))
            }
            AppError::Engine(e) => {
                tracing::debug!("Rejected request: {}", e);
                (e.to_string(), None)
            }
            AppError::Schema(e) => (e.to_string(), None),
            AppError::BadRequest(msg) => (msg.clone(), None),
            AppError::NotFound(msg) => (format!("Not found: {}", msg), None),
            AppError::Unauthorized => ("Unauthorized".to_string(), None),
        };

        let body = Json(ErrorResponse {
            error: error_message,
            details,
        });

        (status, body).into_response()
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;
