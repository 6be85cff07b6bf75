//! API response types
//!
//! Wire shapes for the ingestion and file-status endpoints.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::ingest::IngestionResult;

/// Body carrying only a human readable message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Counts reported after a successful ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionResponse {
    pub message: String,
    pub invalid_record_count: u64,
    pub valid_record_count: u64,
}

impl IntoResponse for IngestionResult {
    /// Code-200 results become `IngestionResponse`, code-400 results a
    /// `MessageResponse` carrying the rejection reason.
    fn into_response(self) -> Response {
        if self.is_success() {
            let body = IngestionResponse {
                message: self.message.unwrap_or_default(),
                invalid_record_count: self.error_counter,
                valid_record_count: self.valid_counter,
            };
            (StatusCode::OK, Json(body)).into_response()
        } else {
            let body = MessageResponse::new(self.error.unwrap_or_default());
            (StatusCode::BAD_REQUEST, Json(body)).into_response()
        }
    }
}

/// `{"response": ...}` wrapper used by the file-status endpoints
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub response: T,
}

impl<T: Serialize> DataResponse<T> {
    pub fn new(response: T) -> Self {
        Self { response }
    }
}

impl<T: Serialize> IntoResponse for DataResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}
