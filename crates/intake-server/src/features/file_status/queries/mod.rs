pub mod get;

pub use get::GetFileStatusQuery;
