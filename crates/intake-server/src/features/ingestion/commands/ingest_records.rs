//! Ingest a JSON record batch
//!
//! The request body is the per-kind envelope, e.g.
//!
//! ```json
//! { "event_name": "student_attendance", "event": [ { "school_id": "6677" } ] }
//! ```

use intake_common::RecordKind;
use mediator::Request;
use serde_json::Value;

use crate::ingest::{IngestError, IngestionPayload, IngestionResult, IngestionServices};

/// Command to validate and store one batch of records
#[derive(Debug, Clone)]
pub struct IngestRecordsCommand {
    pub kind: RecordKind,
    pub body: Value,
}

impl Request<Result<IngestionResult, IngestError>> for IngestRecordsCommand {}

impl IngestRecordsCommand {
    pub fn new(kind: RecordKind, body: Value) -> Self {
        Self { kind, body }
    }

    pub fn payload(&self) -> IngestionPayload {
        IngestionPayload::from_json(self.kind, &self.body)
    }
}

/// Route the batch to the service bound to its kind.
///
/// # Errors
///
/// Only persistence failures; client errors come back as code-400 results.
#[tracing::instrument(skip(services, command), fields(kind = %command.kind))]
pub async fn handle(
    services: &IngestionServices,
    command: IngestRecordsCommand,
) -> Result<IngestionResult, IngestError> {
    let payload = command.payload();
    services.for_kind(command.kind).ingest(payload).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{MemoryRecordSink, MemorySchemaStore, SchemaRegistry};
    use serde_json::json;
    use std::sync::Arc;

    fn services(sink: Arc<MemoryRecordSink>) -> IngestionServices {
        let store = MemorySchemaStore::new().with_schema(
            RecordKind::Event,
            "student_attendance",
            json!({"input": {"properties": {"event": {
                "type": "array",
                "items": {"type": "object", "required": ["school_id"]}
            }}}}),
        );
        IngestionServices::new(SchemaRegistry::new(Arc::new(store)), sink, 512)
    }

    #[tokio::test]
    async fn test_envelope_routes_to_kind() {
        let sink = Arc::new(MemoryRecordSink::new());
        let command = IngestRecordsCommand::new(
            RecordKind::Event,
            json!({"event_name": "student_attendance", "event": [{"school_id": "1"}, {"grade": 2}]}),
        );

        let result = handle(&services(sink.clone()), command).await.unwrap();

        assert_eq!(result.valid_counter, 1);
        assert_eq!(result.error_counter, 1);
        assert_eq!(sink.batches()[0].name, "student_attendance");
    }

    #[tokio::test]
    async fn test_wrong_envelope_is_rejected() {
        let command = IngestRecordsCommand::new(
            RecordKind::Event,
            json!({"dataset_name": "student_attendance", "dataset": [{"school_id": "1"}]}),
        );

        let result = handle(&services(Arc::new(MemoryRecordSink::new())), command)
            .await
            .unwrap();

        assert_eq!(
            result,
            IngestionResult::rejected("Event array is required and cannot be empty")
        );
    }
}
