pub mod ingest_csv;
pub mod ingest_records;

pub use ingest_csv::{IngestCsvCommand, CSV_CONTENT_TYPE};
pub use ingest_records::IngestRecordsCommand;
