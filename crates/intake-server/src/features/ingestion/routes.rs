//! Ingestion API routes
//!
//! # Route Structure
//!
//! - `POST /api/v1/dataset` - Ingest a dataset batch
//! - `POST /api/v1/dimension` - Ingest a dimension batch
//! - `POST /api/v1/event` - Ingest an event batch
//! - `POST /api/v1/csv` - Ingest a multipart CSV upload

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, State},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use intake_common::RecordKind;
use serde_json::Value;
use tower_http::limit::RequestBodyLimitLayer;

use super::commands::{IngestCsvCommand, IngestRecordsCommand};
use super::IngestionState;
use crate::error::AppError;
use crate::ingest::CsvMetadata;

// ============================================================================
// Router Configuration
// ============================================================================

/// Creates the ingestion router; request bodies are capped at `max_body_bytes`.
pub fn ingestion_routes(max_body_bytes: usize) -> Router<IngestionState> {
    Router::new()
        .route("/dataset", post(ingest_dataset))
        .route("/dimension", post(ingest_dimension))
        .route("/event", post(ingest_event))
        .route("/csv", post(ingest_csv))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
}

// ============================================================================
// Command Handlers
// ============================================================================

async fn ingest_dataset(
    State(state): State<IngestionState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    ingest_kind(RecordKind::Dataset, state, body).await
}

async fn ingest_dimension(
    State(state): State<IngestionState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    ingest_kind(RecordKind::Dimension, state, body).await
}

async fn ingest_event(
    State(state): State<IngestionState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    ingest_kind(RecordKind::Event, state, body).await
}

/// Ingest a JSON batch of one kind
///
/// # Response
///
/// - `200 OK` - `{message, invalid_record_count, valid_record_count}`
/// - `400 Bad Request` - `{message}` for a malformed body, missing name or
///   records, or an unknown schema
/// - `500 Internal Server Error` - Storage failure
async fn ingest_kind(
    kind: RecordKind,
    state: IngestionState,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(body) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let result = super::commands::ingest_records::handle(
        &state.services,
        IngestRecordsCommand::new(kind, body),
    )
    .await?;

    tracing::info!(
        kind = %kind,
        code = result.code.as_u16(),
        valid = result.valid_counter,
        invalid = result.error_counter,
        "Records ingested via API"
    );

    Ok(result.into_response())
}

/// Ingest a CSV upload
///
/// # Endpoint
///
/// `POST /api/v1/csv` as `multipart/form-data` with fields:
///
/// - `file` - the CSV content, declared as `text/csv`
/// - `kind` - `dataset`, `dimension` or `event`
/// - `name` - schema name
/// - `file_id` - optional tracked file id
///
/// # Response
///
/// Same as the JSON endpoints, plus `409 Conflict` when the tracked file no
/// longer accepts outcomes.
async fn ingest_csv(
    State(state): State<IngestionState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let command = read_upload(multipart).await?;
    let result = super::commands::ingest_csv::handle(&state.csv, command).await?;

    tracing::info!(
        code = result.code.as_u16(),
        valid = result.valid_counter,
        invalid = result.error_counter,
        "CSV ingested via API"
    );

    Ok(result.into_response())
}

async fn read_upload(mut multipart: Multipart) -> Result<IngestCsvCommand, AppError> {
    let mut file = None;
    let mut kind = None;
    let mut name = None;
    let mut file_id = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file" => {
                let content_type = field.content_type().map(str::to_string);
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                file = Some((content, content_type));
            },
            "kind" => kind = Some(text_field(field).await?),
            "name" => name = Some(text_field(field).await?),
            "file_id" => file_id = Some(text_field(field).await?),
            other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    let (content, content_type) =
        file.ok_or_else(|| AppError::BadRequest("CSV file is missing".to_string()))?;
    let kind: RecordKind = kind
        .ok_or_else(|| AppError::BadRequest("Record kind is missing".to_string()))?
        .parse()
        .map_err(|e: intake_common::IntakeError| AppError::BadRequest(e.to_string()))?;

    Ok(IngestCsvCommand {
        content,
        content_type,
        metadata: CsvMetadata {
            kind,
            name,
            file_id,
        },
    })
}

async fn text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))
}
