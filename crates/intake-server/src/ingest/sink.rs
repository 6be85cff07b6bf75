//! Persistence sink for validated records
//!
//! A sink receives each batch of valid records exactly once per ingestion call
//! and must store it atomically: either every record is written or the call
//! fails with a `PersistenceError`.

use async_trait::async_trait;
use intake_common::RecordKind;
use serde_json::Value;
use std::sync::Mutex;

use super::error::PersistenceError;

/// Destination for validated record batches
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Store `records` for the schema `name` of `kind` as a single batch.
    ///
    /// Returns the number of records written.
    async fn persist(
        &self,
        kind: RecordKind,
        name: &str,
        records: Vec<Value>,
    ) -> Result<u64, PersistenceError>;
}

/// A batch written to a `MemoryRecordSink`
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBatch {
    pub kind: RecordKind,
    pub name: String,
    pub records: Vec<Value>,
}

/// In-process sink keeping every batch in memory
#[derive(Debug, Default)]
pub struct MemoryRecordSink {
    batches: Mutex<Vec<StoredBatch>>,
}

impl MemoryRecordSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all batches written so far, in write order
    pub fn batches(&self) -> Vec<StoredBatch> {
        self.batches
            .lock()
            .map(|batches| batches.clone())
            .unwrap_or_default()
    }

    /// Every stored record across all batches
    pub fn records(&self) -> Vec<Value> {
        self.batches()
            .into_iter()
            .flat_map(|batch| batch.records)
            .collect()
    }
}

#[async_trait]
impl RecordSink for MemoryRecordSink {
    async fn persist(
        &self,
        kind: RecordKind,
        name: &str,
        records: Vec<Value>,
    ) -> Result<u64, PersistenceError> {
        let count = records.len() as u64;
        let mut batches = self
            .batches
            .lock()
            .map_err(|_| PersistenceError::Unavailable("memory sink lock poisoned".to_string()))?;

        batches.push(StoredBatch {
            kind,
            name: name.to_string(),
            records,
        });

        Ok(count)
    }
}
