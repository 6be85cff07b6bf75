//! Intake Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging, and error handling for the Intake workspace.
//!
//! # Overview
//!
//! - **Error Handling**: `IntakeError` and the `Result` alias
//! - **Logging**: centralized `tracing` subscriber setup
//! - **Types**: record kinds and file processing states shared by every crate
//!
//! # Example
//!
//! ```no_run
//! use intake_common::types::RecordKind;
//!
//! fn kind_of(raw: &str) -> intake_common::Result<RecordKind> {
//!     raw.parse()
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{IntakeError, Result};
pub use types::{FileState, RecordKind};
