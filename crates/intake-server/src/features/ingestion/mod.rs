//! Record ingestion slice: JSON batches per kind and CSV uploads

pub mod commands;
pub mod routes;

pub use commands::{IngestCsvCommand, IngestRecordsCommand};
pub use routes::ingestion_routes;

use crate::ingest::{CsvIngestionService, IngestionServices};

/// State for the ingestion routes
#[derive(Clone)]
pub struct IngestionState {
    pub services: IngestionServices,
    pub csv: CsvIngestionService,
}
