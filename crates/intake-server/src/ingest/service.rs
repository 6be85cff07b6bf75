//! Generic ingestion pipeline
//!
//! One algorithm serves every record kind:
//!
//! 1. reject an absent or empty record array
//! 2. resolve the schema (rejects a missing name or unknown schema)
//! 3. validate each record and split valid from invalid
//! 4. persist the valid records as one batch
//! 5. report the counts
//!
//! Steps 1-2 failures become code-400 results. A persistence failure in step 4
//! propagates unchanged and is never reported as a partial success.
//!
//! Batches at or above the parallel threshold are validated on the blocking
//! pool (fanning out over rayon) so request workers are not stalled.

use intake_common::RecordKind;
use rayon::prelude::*;
use serde_json::Value;
use std::sync::Arc;

use super::error::{IngestError, IngestResult};
use super::schema::{SchemaDefinition, SchemaRegistry};
use super::sink::RecordSink;
use super::types::{IngestionPayload, IngestionResult, ValidationOutcome};
use super::validator::RecordValidator;

/// Batches at or above this size are validated on the rayon pool by default.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 512;

/// Ingestion pipeline bound to one record kind
#[derive(Clone)]
pub struct IngestionService {
    kind: RecordKind,
    registry: SchemaRegistry,
    sink: Arc<dyn RecordSink>,
    validator: RecordValidator,
    parallel_threshold: usize,
}

impl IngestionService {
    pub fn new(kind: RecordKind, registry: SchemaRegistry, sink: Arc<dyn RecordSink>) -> Self {
        Self {
            kind,
            registry,
            sink,
            validator: RecordValidator::new(),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold.max(1);
        self
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Validate and persist one payload.
    ///
    /// Returns `Ok` with a code-400 result for client errors, `Ok` with a
    /// code-200 result once the valid subset is stored, and `Err` only for
    /// failures the client did not cause.
    #[tracing::instrument(
        skip(self, payload),
        fields(kind = %self.kind, schema = payload.schema_name().unwrap_or_default())
    )]
    pub async fn ingest(&self, payload: IngestionPayload) -> IngestResult<IngestionResult> {
        match self.try_ingest(payload).await {
            Err(err) if err.is_recoverable() => {
                tracing::debug!(reason = %err, "Payload rejected");
                Ok(IngestionResult::rejected(err.to_string()))
            },
            other => other,
        }
    }

    async fn try_ingest(&self, payload: IngestionPayload) -> IngestResult<IngestionResult> {
        if payload.kind != self.kind {
            return Err(IngestError::InvalidRequest(format!(
                "Expected a {} payload, got {}",
                self.kind, payload.kind
            )));
        }

        let schema_name = payload.schema_name().map(str::to_string);
        let records = match payload.records {
            Some(records) if !records.is_empty() => records,
            _ => {
                return Err(IngestError::InvalidRequest(format!(
                    "{} array is required and cannot be empty",
                    self.kind.title()
                )))
            },
        };

        let schema = Arc::new(self.registry.resolve(self.kind, schema_name.as_deref()).await?);
        let total = records.len();
        let (valid, error_counter) = self.split(schema.clone(), records).await?;
        let valid_counter = valid.len() as u64;

        if !valid.is_empty() {
            self.sink
                .persist(self.kind, &schema.name, valid)
                .await
                .map_err(|err| {
                    tracing::error!(error = %err, records = valid_counter, "Failed to persist batch");
                    IngestError::from(err)
                })?;
        }

        tracing::info!(
            total,
            valid = valid_counter,
            invalid = error_counter,
            "Batch ingested"
        );

        Ok(IngestionResult::success(self.kind, valid_counter, error_counter))
    }

    /// Run `partition`, moving large batches off the async workers.
    async fn split(
        &self,
        schema: Arc<SchemaDefinition>,
        records: Vec<Value>,
    ) -> IngestResult<(Vec<Value>, u64)> {
        if records.len() < self.parallel_threshold {
            return Ok(self.partition(&schema, records));
        }

        let service = self.clone();
        let span = tracing::Span::current();
        let split = tokio::task::spawn_blocking(move || {
            span.in_scope(|| service.partition(&schema, records))
        })
        .await?;

        Ok(split)
    }

    /// Split records into the valid subset (input order kept) and the number
    /// of invalid ones.
    fn partition(&self, schema: &SchemaDefinition, records: Vec<Value>) -> (Vec<Value>, u64) {
        let validator = self.validator;
        let outcomes: Vec<ValidationOutcome> = if records.len() >= self.parallel_threshold {
            records
                .par_iter()
                .map(|record| validator.validate(schema, record))
                .collect()
        } else {
            records
                .iter()
                .map(|record| validator.validate(schema, record))
                .collect()
        };

        let mut valid = Vec::with_capacity(records.len());
        let mut error_counter = 0u64;

        for (index, (record, outcome)) in records.into_iter().zip(outcomes).enumerate() {
            if outcome.valid {
                valid.push(record);
            } else {
                tracing::debug!(index, reasons = ?outcome.reasons, "Record failed validation");
                error_counter += 1;
            }
        }

        (valid, error_counter)
    }
}

/// The three kind-bound services sharing one registry and sink
#[derive(Clone)]
pub struct IngestionServices {
    dataset: IngestionService,
    dimension: IngestionService,
    event: IngestionService,
}

impl IngestionServices {
    pub fn new(registry: SchemaRegistry, sink: Arc<dyn RecordSink>, parallel_threshold: usize) -> Self {
        let build = |kind| {
            IngestionService::new(kind, registry.clone(), sink.clone())
                .with_parallel_threshold(parallel_threshold)
        };

        Self {
            dataset: build(RecordKind::Dataset),
            dimension: build(RecordKind::Dimension),
            event: build(RecordKind::Event),
        }
    }

    pub fn for_kind(&self, kind: RecordKind) -> &IngestionService {
        match kind {
            RecordKind::Dataset => &self.dataset,
            RecordKind::Dimension => &self.dimension,
            RecordKind::Event => &self.event,
        }
    }
}
