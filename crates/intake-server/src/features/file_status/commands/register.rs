//! Register a file for status tracking

use intake_common::RecordKind;
use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::ingest::{FileStatusRecord, FileStatusTracker, IngestError};

/// Command to start tracking a file
///
/// ```json
/// { "file_id": "enrolment-2024.csv", "expected_kinds": ["dimension", "event"] }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterFileCommand {
    pub file_id: String,

    /// Overrides the configured kinds the file must complete
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_kinds: Option<Vec<RecordKind>>,
}

impl Request<Result<FileStatusRecord, IngestError>> for RegisterFileCommand {}

/// # Errors
///
/// - `InvalidRequest` for a blank file id or an empty kind list
/// - `Conflict` when the file is already tracked
#[tracing::instrument(skip(tracker, command), fields(file_id = %command.file_id))]
pub fn handle(
    tracker: &FileStatusTracker,
    command: RegisterFileCommand,
) -> Result<FileStatusRecord, IngestError> {
    match command.expected_kinds {
        Some(kinds) => tracker.register_with_kinds(&command.file_id, kinds),
        None => tracker.register(&command.file_id),
    }
}
