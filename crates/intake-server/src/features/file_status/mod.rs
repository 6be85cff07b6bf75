//! File status slice: registration, lookup and explicit state changes

pub mod commands;
pub mod queries;
pub mod routes;

pub use commands::{RegisterFileCommand, UpdateFileStatusCommand, UpdateFileStatusResponse};
pub use queries::GetFileStatusQuery;
pub use routes::file_status_routes;
