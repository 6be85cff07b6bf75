//! Schema-validated record ingestion
//!
//! # Architecture
//!
//! - **schema**: schema documents, compilation and lookup by `(kind, name)`
//! - **validator**: per-record structural checks
//! - **service**: the validate, persist and count pipeline shared by all kinds
//! - **upload**: CSV files fed through the same pipeline
//! - **file_status**: per-file state machine and archive readiness
//! - **sink** / **postgres**: storage seams and their PostgreSQL implementations
//!
//! Client errors surface as code-400 `IngestionResult`s; only conflicts and
//! persistence failures are returned as `Err`.

pub mod error;
pub mod file_status;
pub mod postgres;
pub mod schema;
pub mod service;
pub mod sink;
pub mod types;
pub mod upload;
pub mod validator;

pub use error::{IngestError, IngestResult, PersistenceError};
pub use file_status::{FileStatusRecord, FileStatusTracker, KindCounts, StatusUpdate};
pub use postgres::{PgRecordSink, PgSchemaStore};
pub use schema::{MemorySchemaStore, SchemaDefinition, SchemaRegistry, SchemaStore};
pub use service::{IngestionService, IngestionServices, DEFAULT_PARALLEL_THRESHOLD};
pub use sink::{MemoryRecordSink, RecordSink};
pub use types::{IngestionPayload, IngestionResult, ResultCode, ValidationOutcome};
pub use upload::{CsvIngestionService, CsvMetadata};
pub use validator::RecordValidator;
