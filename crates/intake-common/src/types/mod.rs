//! Common types used across Intake

use serde::{Deserialize, Serialize};

use crate::error::IntakeError;

/// Category of data being ingested.
///
/// Each kind has its own stored schema and its own request envelope:
/// a `dimension` payload carries `dimension_name` and a `dimension` array,
/// a `dataset` payload carries `dataset_name` and `dataset`, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Dataset,
    Dimension,
    Event,
}

impl RecordKind {
    /// Every kind, in the order files are expected to complete them.
    pub const ALL: [RecordKind; 3] = [RecordKind::Dataset, RecordKind::Dimension, RecordKind::Event];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Dataset => "dataset",
            RecordKind::Dimension => "dimension",
            RecordKind::Event => "event",
        }
    }

    /// Capitalized form used at the start of client-facing messages.
    pub fn title(&self) -> &'static str {
        match self {
            RecordKind::Dataset => "Dataset",
            RecordKind::Dimension => "Dimension",
            RecordKind::Event => "Event",
        }
    }

    /// Envelope field carrying the schema name, e.g. `dimension_name`.
    pub fn name_field(&self) -> &'static str {
        match self {
            RecordKind::Dataset => "dataset_name",
            RecordKind::Dimension => "dimension_name",
            RecordKind::Event => "event_name",
        }
    }

    /// Envelope field carrying the record array, e.g. `dimension`.
    pub fn records_field(&self) -> &'static str {
        self.as_str()
    }
}

impl std::str::FromStr for RecordKind {
    type Err = IntakeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dataset" => Ok(RecordKind::Dataset),
            "dimension" => Ok(RecordKind::Dimension),
            "event" => Ok(RecordKind::Event),
            _ => Err(IntakeError::UnknownRecordKind(s.to_string())),
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing state of an uploaded file.
///
/// `Received` is initial and `Archived` is terminal. `Failed` can be moved
/// back to `Processing` for a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    Received,
    Processing,
    Validated,
    Failed,
    Archived,
}

impl FileState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileState::Received => "received",
            FileState::Processing => "processing",
            FileState::Validated => "validated",
            FileState::Failed => "failed",
            FileState::Archived => "archived",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FileState::Archived)
    }

    /// Whether an explicit status update may move a file from `self` to `next`.
    ///
    /// Re-asserting the current state is a no-op and always allowed here;
    /// leaving `Archived` is never allowed.
    pub fn can_transition_to(&self, next: FileState) -> bool {
        use FileState::*;

        if *self == next {
            return true;
        }

        matches!(
            (self, next),
            (Received, Processing)
                | (Received, Failed)
                | (Processing, Validated)
                | (Processing, Failed)
                | (Validated, Processing)
                | (Validated, Archived)
                | (Failed, Processing)
                | (Failed, Archived)
        )
    }
}

impl std::str::FromStr for FileState {
    type Err = IntakeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "received" => Ok(FileState::Received),
            "processing" => Ok(FileState::Processing),
            "validated" => Ok(FileState::Validated),
            "failed" => Ok(FileState::Failed),
            "archived" => Ok(FileState::Archived),
            _ => Err(IntakeError::UnknownFileState(s.to_string())),
        }
    }
}

impl std::fmt::Display for FileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
