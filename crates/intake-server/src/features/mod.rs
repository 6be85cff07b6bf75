//! Feature modules implementing the Intake API
//!
//! Each feature is a vertical slice with its own commands, queries, and
//! routes. Commands and queries implement `mediator::Request` and are served
//! by standalone `handle` functions.
//!
//! # Features
//!
//! - **ingestion**: JSON batches per record kind and CSV uploads
//! - **file_status**: per-file state tracking and archive readiness

pub mod file_status;
pub mod ingestion;

use axum::Router;
use std::sync::Arc;

use crate::config::IngestConfig;
use crate::ingest::{
    CsvIngestionService, FileStatusTracker, IngestionServices, RecordSink, SchemaRegistry,
    SchemaStore,
};

pub use ingestion::IngestionState;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    pub ingestion: IngestionState,
    pub tracker: Arc<FileStatusTracker>,
    /// Upload body limit for the ingestion routes
    pub max_body_bytes: usize,
}

impl FeatureState {
    /// Wire the ingestion services and tracker over the given stores.
    pub fn new(
        schemas: Arc<dyn SchemaStore>,
        sink: Arc<dyn RecordSink>,
        config: &IngestConfig,
    ) -> Self {
        let registry = SchemaRegistry::new(schemas);
        let services = IngestionServices::new(registry, sink, config.parallel_threshold);
        let tracker = Arc::new(FileStatusTracker::new(config.expected_kinds.iter().copied()));
        let csv = CsvIngestionService::new(services.clone()).with_tracker(tracker.clone());

        Self {
            ingestion: IngestionState { services, csv },
            tracker,
            max_body_bytes: config.max_csv_bytes,
        }
    }
}

/// Creates the API router with all feature routes mounted
///
/// - `/dataset`, `/dimension`, `/event`, `/csv` - Record ingestion
/// - `/file-status` - File status tracking
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .merge(ingestion::ingestion_routes(state.max_body_bytes).with_state(state.ingestion))
        .nest(
            "/file-status",
            file_status::file_status_routes().with_state(state.tracker),
        )
}
