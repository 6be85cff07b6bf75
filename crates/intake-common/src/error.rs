//! Error types for Intake

use thiserror::Error;

/// Result type alias for Intake operations
pub type Result<T> = std::result::Result<T, IntakeError>;

/// Main error type shared across the workspace
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Unknown record kind: {0}")]
    UnknownRecordKind(String),

    #[error("Unknown file state: {0}")]
    UnknownFileState(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
