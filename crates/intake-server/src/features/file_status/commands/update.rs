//! Explicitly move a tracked file to a new state

use intake_common::FileState;
use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::ingest::{FileStatusTracker, IngestError};

/// Command to override a file's state, e.g. marking it archived
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateFileStatusCommand {
    pub file_id: String,

    #[serde(alias = "current_state")]
    pub status: FileState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateFileStatusResponse {
    pub message: String,
    pub status: FileState,
    pub ready_to_archive: bool,
}

impl Request<Result<UpdateFileStatusResponse, IngestError>> for UpdateFileStatusCommand {}

/// # Errors
///
/// - `NotFound` for an untracked file
/// - `Conflict` for a transition the state machine does not allow
#[tracing::instrument(skip(tracker, command), fields(file_id = %command.file_id, status = %command.status))]
pub fn handle(
    tracker: &FileStatusTracker,
    command: UpdateFileStatusCommand,
) -> Result<UpdateFileStatusResponse, IngestError> {
    let update = tracker.update_status(&command.file_id, command.status)?;

    Ok(UpdateFileStatusResponse {
        message: format!("File status updated to {}", update.state),
        status: update.state,
        ready_to_archive: update.ready_to_archive,
    })
}
