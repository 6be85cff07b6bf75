//! Intake Server Library
//!
//! HTTP service that validates record batches against provisioned schemas,
//! stores the valid subset and tracks per-file processing state.
//!
//! # Overview
//!
//! - **Ingestion core** (`ingest`): schema lookup, record validation, the
//!   shared validate/persist/count pipeline, CSV uploads and the file-status
//!   state machine
//! - **API** (`api`, `features`): Axum routes organised as CQRS slices
//! - **Persistence**: PostgreSQL through SQLx, behind `SchemaStore` and
//!   `RecordSink` so tests can run on in-memory stores
//! - **Configuration**: environment-based, see `config`
//!
//! # Example
//!
//! ```no_run
//! use intake_server::{api, config::Config};
//! use sqlx::postgres::PgPoolOptions;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let pool = PgPoolOptions::new().connect(&config.database.url).await?;
//!     api::serve(config, pool, std::future::pending()).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod features;
pub mod ingest;
pub mod middleware;

// Re-export commonly used types
pub use error::AppError;
