pub mod register;
pub mod update;

pub use register::RegisterFileCommand;
pub use update::{UpdateFileStatusCommand, UpdateFileStatusResponse};
