use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::ingest::{FileStatusRecord, FileStatusTracker, IngestError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetFileStatusQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
}

impl Request<Result<FileStatusRecord, IngestError>> for GetFileStatusQuery {}

impl GetFileStatusQuery {
    pub fn validate(&self) -> Result<&str, IngestError> {
        self.file_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| IngestError::InvalidRequest("File id is missing".to_string()))
    }
}

#[tracing::instrument(skip(tracker))]
pub fn handle(
    tracker: &FileStatusTracker,
    query: GetFileStatusQuery,
) -> Result<FileStatusRecord, IngestError> {
    let file_id = query.validate()?;
    tracker.get_status(file_id)
}
