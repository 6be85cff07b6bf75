//! Ingest an uploaded CSV file

use axum::body::Bytes;
use mediator::Request;
use std::io::Cursor;

use crate::ingest::{CsvIngestionService, CsvMetadata, IngestError, IngestionResult};

/// Content type an upload must declare
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Command carrying one uploaded file and its metadata
#[derive(Debug, Clone)]
pub struct IngestCsvCommand {
    pub content: Bytes,
    /// Declared content type of the upload, if any
    pub content_type: Option<String>,
    pub metadata: CsvMetadata,
}

impl Request<Result<IngestionResult, IngestError>> for IngestCsvCommand {}

impl IngestCsvCommand {
    /// The upload must be declared as `text/csv`, parameters allowed.
    pub fn validate(&self) -> Result<(), IngestError> {
        let is_csv = self
            .content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(CSV_CONTENT_TYPE));

        if is_csv {
            Ok(())
        } else {
            Err(IngestError::InvalidRequest(format!(
                "File must be uploaded as {CSV_CONTENT_TYPE}"
            )))
        }
    }
}

#[tracing::instrument(
    skip(service, command),
    fields(kind = %command.metadata.kind, bytes = command.content.len())
)]
pub async fn handle(
    service: &CsvIngestionService,
    command: IngestCsvCommand,
) -> Result<IngestionResult, IngestError> {
    command.validate()?;

    service
        .ingest_file(Cursor::new(command.content), command.metadata)
        .await
}
