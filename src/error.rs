use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    auth::error::AuthError,
    helpers::respond_json,
    models::dto::ErrorResponse,
    store::StoreError,
};

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// No validated token is attached to the request.
    #[error("No valid token found")]
    Unauthenticated,

    /// The bearer token was rejected.
    #[error("Authentication failed: {0}")]
    Authentication(#[from] AuthError),

    /// The token is valid but lacks the required scope or permission.
    #[error("{message}")]
    Forbidden {
        message: String,
        available: Option<Vec<String>>,
        scope: Option<String>,
    },

    /// A resource not found error.
    #[error("Resource not found")]
    NotFound,

    /// A document store read failed.
    #[error("Store read error: {0}")]
    StoreRead(StoreError),

    /// A document store write failed.
    #[error("Store write error: {0}")]
    StoreWrite(StoreError),

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut available = None;
        let mut scope = None;

        let (status, message) = match self {
            AppError::Unauthenticated => {
                tracing::warn!("No validated token on protected route");
                (StatusCode::UNAUTHORIZED, "No valid token found".to_string())
            }

            AppError::Authentication(ref e) => {
                tracing::warn!("Authentication failed: {}", e);
                (StatusCode::UNAUTHORIZED, e.to_string())
            }

            AppError::Forbidden {
                message,
                available: perms,
                scope: token_scope,
            } => {
                tracing::warn!("Authorization failed: {}", message);
                available = perms;
                scope = token_scope;
                (StatusCode::FORBIDDEN, message)
            }

            AppError::NotFound => {
                tracing::debug!("Resource not found");
                (StatusCode::NOT_FOUND, "Resource not found".to_string())
            }

            AppError::StoreRead(ref e) => {
                tracing::error!("Store read error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to read from document store".to_string(),
                )
            }

            AppError::StoreWrite(StoreError::Conflict(ref id)) => {
                tracing::warn!("Document already exists: {}", id);
                (StatusCode::CONFLICT, "Document already exists".to_string())
            }

            AppError::StoreWrite(ref e) => {
                tracing::error!("Store write error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to write to document store".to_string(),
                )
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        respond_json(
            status,
            &ErrorResponse {
                success: false,
                error: message,
                code: status.as_u16(),
                available,
                scope,
            },
        )
    }
}
