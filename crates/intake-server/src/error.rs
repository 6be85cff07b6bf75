//! Server-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ingest::{IngestError, PersistenceError};

/// Application error types
///
/// Every handler failure is rendered as `{"message": ...}` with the status
/// chosen here.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::InvalidRequest(message) => AppError::BadRequest(message),
            IngestError::NotFound(message) => AppError::NotFound(message),
            IngestError::Conflict(message) => AppError::Conflict(message),
            IngestError::Persistence(err) => AppError::Persistence(err),
            IngestError::Internal(message) => AppError::Internal(message),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            // Lookups of unknown files are client errors at this boundary
            AppError::BadRequest(_) | AppError::NotFound(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Persistence(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Persistence(ref e) => {
                tracing::error!("Persistence error: {:?}", e);
                "A storage error occurred".to_string()
            },
            AppError::Internal(ref message) => {
                tracing::error!("Internal error: {}", message);
                "Internal server error".to_string()
            },
            AppError::BadRequest(message)
            | AppError::NotFound(message)
            | AppError::Conflict(message) => message,
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}
