//! PostgreSQL-backed schema store and record sink
//!
//! Tables are created by `migrations/0001_ingestion.sql`.

use async_trait::async_trait;
use chrono::Utc;
use intake_common::RecordKind;
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::error::PersistenceError;
use super::schema::SchemaStore;
use super::sink::RecordSink;

/// Rows per multi-row INSERT; keeps bind parameters well under the
/// PostgreSQL limit of 65535.
const INSERT_CHUNK_SIZE: usize = 1000;

/// Reads schema documents from `ingestion_schemas`
#[derive(Clone)]
pub struct PgSchemaStore {
    pool: PgPool,
}

impl PgSchemaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaStore for PgSchemaStore {
    async fn fetch(
        &self,
        kind: RecordKind,
        name: &str,
    ) -> Result<Option<Value>, PersistenceError> {
        let document: Option<Option<Value>> = sqlx::query_scalar(
            r#"
            SELECT document
            FROM ingestion_schemas
            WHERE kind = $1 AND name = $2
            "#,
        )
        .bind(kind.as_str())
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(document.flatten())
    }
}

/// Writes validated records to `ingested_records`
#[derive(Clone)]
pub struct PgRecordSink {
    pool: PgPool,
}

impl PgRecordSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordSink for PgRecordSink {
    /// All chunks of a batch share one transaction; a failure rolls back the
    /// whole batch.
    async fn persist(
        &self,
        kind: RecordKind,
        name: &str,
        records: Vec<Value>,
    ) -> Result<u64, PersistenceError> {
        let ingested_at = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut written = 0u64;

        for chunk in records.chunks(INSERT_CHUNK_SIZE) {
            let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
                r#"
                INSERT INTO ingested_records (
                    id,
                    kind,
                    schema_name,
                    record,
                    ingested_at
                )
                "#,
            );

            query_builder.push_values(chunk, |mut b, record| {
                b.push_bind(Uuid::new_v4())
                    .push_bind(kind.as_str())
                    .push_bind(name)
                    .push_bind(record)
                    .push_bind(ingested_at);
            });

            written += query_builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        tracing::debug!(kind = %kind, schema = name, written, "Batch committed");

        Ok(written)
    }
}
