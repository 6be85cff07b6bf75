//! File status API routes
//!
//! # Route Structure
//!
//! - `POST /api/v1/file-status` - Register a file
//! - `GET /api/v1/file-status?file_id=` - Current status of a file
//! - `PUT /api/v1/file-status` - Explicit state change

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use super::commands::{RegisterFileCommand, UpdateFileStatusCommand};
use super::queries::GetFileStatusQuery;
use crate::api::response::DataResponse;
use crate::error::AppError;
use crate::ingest::FileStatusTracker;

pub fn file_status_routes() -> Router<Arc<FileStatusTracker>> {
    Router::new().route(
        "/",
        get(get_file_status)
            .post(register_file)
            .put(update_file_status),
    )
}

fn bad_json(rejection: JsonRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}

/// Register a file
///
/// # Response
///
/// - `201 Created` - `{response: FileStatusRecord}`
/// - `400 Bad Request` - Blank file id or empty kind list
/// - `409 Conflict` - File already registered
#[tracing::instrument(skip(tracker, command))]
async fn register_file(
    State(tracker): State<Arc<FileStatusTracker>>,
    command: Result<Json<RegisterFileCommand>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(command) = command.map_err(bad_json)?;
    let record = super::commands::register::handle(&tracker, command)?;

    tracing::info!(file_id = %record.file_id, "File registered via API");

    Ok((StatusCode::CREATED, Json(DataResponse::new(record))).into_response())
}

/// Current status of a file
///
/// # Response
///
/// - `200 OK` - `{response: FileStatusRecord}`
/// - `400 Bad Request` - Missing id or unknown file
async fn get_file_status(
    State(tracker): State<Arc<FileStatusTracker>>,
    query: Result<Query<GetFileStatusQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let record = super::queries::get::handle(&tracker, query)?;

    Ok(DataResponse::new(record).into_response())
}

/// Explicit state change
///
/// # Response
///
/// - `200 OK` - `{message, status, ready_to_archive}`
/// - `400 Bad Request` - Malformed body or unknown file
/// - `409 Conflict` - Transition not allowed
#[tracing::instrument(skip(tracker, command))]
async fn update_file_status(
    State(tracker): State<Arc<FileStatusTracker>>,
    command: Result<Json<UpdateFileStatusCommand>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(command) = command.map_err(bad_json)?;
    let response = super::commands::update::handle(&tracker, command)?;

    Ok((StatusCode::OK, Json(response)).into_response())
}
