//! CSV upload ingestion
//!
//! Rows are keyed by the header line and fed through the same pipeline as
//! JSON payloads. Cells stay strings; empty cells become `null` so that
//! required-field checks treat them as missing. Short rows keep only the
//! cells they have and fail validation like any other incomplete record.

use csv::{ReaderBuilder, Trim};
use intake_common::RecordKind;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::io::Read;
use std::sync::Arc;

use super::error::{IngestError, IngestResult};
use super::file_status::FileStatusTracker;
use super::service::IngestionServices;
use super::types::{IngestionPayload, IngestionResult};

/// Describes an uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CsvMetadata {
    pub kind: RecordKind,
    pub name: Option<String>,
    /// Tracked file this upload belongs to, if any
    #[serde(default)]
    pub file_id: Option<String>,
}

impl CsvMetadata {
    pub fn new(kind: RecordKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: Some(name.into()),
            file_id: None,
        }
    }

    pub fn with_file_id(mut self, file_id: impl Into<String>) -> Self {
        self.file_id = Some(file_id.into());
        self
    }

    fn tracked_file_id(&self) -> Option<&str> {
        self.file_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }
}

fn invalid_csv(err: csv::Error) -> IngestError {
    IngestError::InvalidRequest(format!("Invalid CSV file: {err}"))
}

fn cell_value(cell: &str) -> Value {
    if cell.is_empty() {
        Value::Null
    } else {
        Value::String(cell.to_string())
    }
}

/// Parse CSV content into one JSON object per data row.
pub fn parse_records<R: Read>(reader: R) -> IngestResult<Vec<Value>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = reader.headers().map_err(invalid_csv)?.clone();

    reader
        .records()
        .map(|row| {
            let row = row.map_err(invalid_csv)?;
            let record: Map<String, Value> = headers
                .iter()
                .zip(row.iter())
                .map(|(header, cell)| (header.to_string(), cell_value(cell)))
                .collect();
            Ok(Value::Object(record))
        })
        .collect()
}

/// Ingests uploaded CSV files
#[derive(Clone)]
pub struct CsvIngestionService {
    services: IngestionServices,
    tracker: Option<Arc<FileStatusTracker>>,
}

impl CsvIngestionService {
    pub fn new(services: IngestionServices) -> Self {
        Self {
            services,
            tracker: None,
        }
    }

    /// Report outcomes of uploads carrying a file id to `tracker`.
    pub fn with_tracker(mut self, tracker: Arc<FileStatusTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Parse `content` and ingest its rows as records of `metadata.kind`.
    ///
    /// Malformed content yields a code-400 result. When the upload names a
    /// tracked file, the file is registered once an outcome exists and the
    /// outcome is recorded against it; a failed ingestion marks it `Failed`.
    ///
    /// # Errors
    ///
    /// - `Conflict` when the named file no longer accepts outcomes
    /// - `Persistence` when storing the valid rows fails
    #[tracing::instrument(skip(self, content), fields(kind = %metadata.kind))]
    pub async fn ingest_file<R>(&self, content: R, metadata: CsvMetadata) -> IngestResult<IngestionResult>
    where
        R: Read + Send + 'static,
    {
        let file_id = metadata.tracked_file_id().map(str::to_string);
        let tracked = self.tracker.as_deref().zip(file_id.as_deref());
        if let Some((tracker, file_id)) = tracked {
            tracker.check_accepts_outcomes(file_id)?;
        }

        let kind = metadata.kind;
        let outcome = self.ingest_content(content, metadata).await;

        match tracked {
            Some((tracker, file_id)) => report_outcome(tracker, file_id, kind, outcome),
            None => outcome,
        }
    }

    async fn ingest_content<R>(&self, content: R, metadata: CsvMetadata) -> IngestResult<IngestionResult>
    where
        R: Read + Send + 'static,
    {
        let span = tracing::Span::current();
        let parsed =
            tokio::task::spawn_blocking(move || span.in_scope(|| parse_records(content))).await?;

        match parsed {
            Ok(records) => {
                tracing::debug!(rows = records.len(), "CSV parsed");
                let payload = IngestionPayload {
                    kind: metadata.kind,
                    name: metadata.name,
                    records: Some(records),
                };
                self.services.for_kind(metadata.kind).ingest(payload).await
            },
            Err(err) => {
                tracing::debug!(reason = %err, "CSV rejected");
                Ok(IngestionResult::rejected(err.to_string()))
            },
        }
    }
}

fn report_outcome(
    tracker: &FileStatusTracker,
    file_id: &str,
    kind: RecordKind,
    outcome: IngestResult<IngestionResult>,
) -> IngestResult<IngestionResult> {
    match outcome {
        Ok(result) => {
            tracker.begin_ingestion(file_id)?;
            tracker.record_ingestion_outcome(file_id, kind, &result)?;
            Ok(result)
        },
        Err(err) => {
            let failed = IngestionResult::rejected(err.to_string());
            if let Err(report_err) = tracker
                .begin_ingestion(file_id)
                .and_then(|()| tracker.record_ingestion_outcome(file_id, kind, &failed))
            {
                tracing::warn!(file_id, error = %report_err, "Could not mark file failed");
            }
            Err(err)
        },
    }
}
