//! Error taxonomy for the ingestion core
//!
//! `InvalidRequest` and `NotFound` carry the exact client-facing message and are
//! recovered into code-400 results. `Conflict`, `Persistence` and `Internal`
//! always reach the caller.

use thiserror::Error;

/// Failure of the storage layer. Never attributable to a single record.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by ingestion services and the file-status tracker
#[derive(Debug, Error)]
pub enum IngestError {
    /// Payload violates a structural precondition
    #[error("{0}")]
    InvalidRequest(String),

    /// Named schema or tracked file does not exist
    #[error("{0}")]
    NotFound(String),

    /// Duplicate registration or a disallowed state transition
    #[error("{0}")]
    Conflict(String),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] PersistenceError),

    /// Background validation or parsing task did not complete
    #[error("{0}")]
    Internal(String),
}

impl From<tokio::task::JoinError> for IngestError {
    fn from(err: tokio::task::JoinError) -> Self {
        IngestError::Internal(format!("Background task failed: {err}"))
    }
}

impl IngestError {
    /// Whether the error is rendered as a code-400 result instead of propagating
    pub fn is_recoverable(&self) -> bool {
        matches!(self, IngestError::InvalidRequest(_) | IngestError::NotFound(_))
    }
}

pub type IngestResult<T> = std::result::Result<T, IngestError>;
