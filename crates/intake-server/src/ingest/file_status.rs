//! File processing state machine
//!
//! ```text
//! Received -> Processing -> Validated -> Archived
//!                      \--> Failed ----/
//!                  (Failed -> Processing on explicit retry)
//! ```
//!
//! Each file is keyed by its id in a `DashMap`; every mutation happens under
//! the shard write lock for that key, so concurrent outcome reports for one
//! file are serialized while other files proceed independently.

use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use intake_common::{FileState, RecordKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::error::{IngestError, IngestResult};
use super::types::IngestionResult;

/// Accumulated record counts for one kind of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KindCounts {
    pub valid: u64,
    pub error: u64,
}

/// Tracked state of one uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatusRecord {
    pub file_id: String,
    pub current_state: FileState,
    /// Kinds that must all report without errors before the file validates
    pub expected_kinds: BTreeSet<RecordKind>,
    pub per_kind_counts: BTreeMap<RecordKind, KindCounts>,
    pub ready_to_archive: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileStatusRecord {
    fn new(file_id: String, expected_kinds: BTreeSet<RecordKind>) -> Self {
        let now = Utc::now();
        Self {
            file_id,
            current_state: FileState::Received,
            expected_kinds,
            per_kind_counts: BTreeMap::new(),
            ready_to_archive: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn accepts_outcomes(&self) -> bool {
        matches!(
            self.current_state,
            FileState::Received | FileState::Processing | FileState::Validated
        )
    }

    fn ensure_accepts_outcomes(&self) -> IngestResult<()> {
        if self.accepts_outcomes() {
            Ok(())
        } else {
            Err(IngestError::Conflict(format!(
                "File {} is {} and does not accept ingestion outcomes",
                self.file_id, self.current_state
            )))
        }
    }

    fn derived_state(&self) -> FileState {
        if self.per_kind_counts.values().any(|counts| counts.error > 0) {
            FileState::Failed
        } else if self
            .expected_kinds
            .iter()
            .all(|kind| self.per_kind_counts.contains_key(kind))
        {
            FileState::Validated
        } else {
            FileState::Processing
        }
    }

    fn set_state(&mut self, state: FileState) {
        self.current_state = state;
        self.ready_to_archive = state == FileState::Validated;
        self.updated_at = Utc::now();
    }
}

/// Result of an explicit status update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub state: FileState,
    pub ready_to_archive: bool,
}

/// Owner of every `FileStatusRecord`
#[derive(Debug)]
pub struct FileStatusTracker {
    files: DashMap<String, FileStatusRecord>,
    expected_kinds: BTreeSet<RecordKind>,
}

impl Default for FileStatusTracker {
    fn default() -> Self {
        Self::new(RecordKind::ALL)
    }
}

fn not_found() -> IngestError {
    IngestError::NotFound("No file status found".to_string())
}

fn require_file_id(file_id: &str) -> IngestResult<&str> {
    let file_id = file_id.trim();
    if file_id.is_empty() {
        return Err(IngestError::InvalidRequest("File id is missing".to_string()));
    }
    Ok(file_id)
}

impl FileStatusTracker {
    /// Tracker whose files default to `expected_kinds`
    pub fn new(expected_kinds: impl IntoIterator<Item = RecordKind>) -> Self {
        Self {
            files: DashMap::new(),
            expected_kinds: expected_kinds.into_iter().collect(),
        }
    }

    /// Start tracking `file_id` in `Received` with the default expected kinds.
    pub fn register(&self, file_id: &str) -> IngestResult<FileStatusRecord> {
        self.register_with_kinds(file_id, self.expected_kinds.iter().copied())
    }

    /// Start tracking `file_id` with its own set of expected kinds.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` for a blank id or an empty kind set
    /// - `Conflict` when the id is already tracked
    #[tracing::instrument(skip(self, expected_kinds))]
    pub fn register_with_kinds(
        &self,
        file_id: &str,
        expected_kinds: impl IntoIterator<Item = RecordKind>,
    ) -> IngestResult<FileStatusRecord> {
        let file_id = require_file_id(file_id)?;
        let expected_kinds: BTreeSet<RecordKind> = expected_kinds.into_iter().collect();
        if expected_kinds.is_empty() {
            return Err(IngestError::InvalidRequest(
                "Expected kinds cannot be empty".to_string(),
            ));
        }

        match self.files.entry(file_id.to_string()) {
            Entry::Occupied(_) => Err(IngestError::Conflict(format!(
                "File {file_id} is already registered"
            ))),
            Entry::Vacant(slot) => {
                let record = FileStatusRecord::new(file_id.to_string(), expected_kinds);
                slot.insert(record.clone());
                tracing::info!("File registered");
                Ok(record)
            },
        }
    }

    /// Check that `file_id` is unknown or can still take new outcomes,
    /// without registering it.
    pub fn check_accepts_outcomes(&self, file_id: &str) -> IngestResult<()> {
        let file_id = require_file_id(file_id)?;

        match self.files.get(file_id) {
            Some(record) => record.ensure_accepts_outcomes(),
            None => Ok(()),
        }
    }

    /// Register `file_id` if it is unknown and check it can take new outcomes.
    ///
    /// Used by ingestion paths that receive a file id alongside the data.
    pub fn begin_ingestion(&self, file_id: &str) -> IngestResult<()> {
        let file_id = require_file_id(file_id)?;

        match self.files.entry(file_id.to_string()) {
            Entry::Occupied(entry) => entry.get().ensure_accepts_outcomes(),
            Entry::Vacant(slot) => {
                slot.insert(FileStatusRecord::new(
                    file_id.to_string(),
                    self.expected_kinds.clone(),
                ));
                tracing::info!(file_id, "File registered on first ingestion");
                Ok(())
            },
        }
    }

    /// Fold one ingestion outcome into the file's counts and derive its state.
    ///
    /// A rejected (code 400) result marks the file `Failed` without touching
    /// counts. Counts for a kind accumulate across calls.
    #[tracing::instrument(skip(self, result), fields(code = result.code.as_u16()))]
    pub fn record_ingestion_outcome(
        &self,
        file_id: &str,
        kind: RecordKind,
        result: &IngestionResult,
    ) -> IngestResult<FileStatusRecord> {
        let mut record = self.files.get_mut(file_id.trim()).ok_or_else(not_found)?;
        record.ensure_accepts_outcomes()?;

        let next = if result.is_success() {
            let counts = record.per_kind_counts.entry(kind).or_default();
            counts.valid += result.valid_counter;
            counts.error += result.error_counter;
            record.derived_state()
        } else {
            FileState::Failed
        };

        record.set_state(next);
        tracing::info!(state = %next, ready_to_archive = record.ready_to_archive, "File outcome recorded");

        Ok(record.clone())
    }

    /// Caller-driven state change, e.g. marking a validated file `Archived`.
    ///
    /// Moving a `Failed` file back to `Processing` drops the counts of kinds
    /// that reported errors so they can be re-ingested.
    #[tracing::instrument(skip(self))]
    pub fn update_status(&self, file_id: &str, state: FileState) -> IngestResult<StatusUpdate> {
        let mut record = self.files.get_mut(file_id.trim()).ok_or_else(not_found)?;
        let current = record.current_state;

        if current.is_terminal() || !current.can_transition_to(state) {
            return Err(IngestError::Conflict(format!(
                "Cannot move file {} from {} to {}",
                record.file_id, current, state
            )));
        }

        if current == FileState::Failed && state == FileState::Processing {
            record.per_kind_counts.retain(|_, counts| counts.error == 0);
        }

        record.set_state(state);
        tracing::info!(from = %current, to = %state, "File status updated");

        Ok(StatusUpdate {
            state,
            ready_to_archive: record.ready_to_archive,
        })
    }

    /// Current record for `file_id`. Never mutates.
    pub fn get_status(&self, file_id: &str) -> IngestResult<FileStatusRecord> {
        self.files
            .get(file_id.trim())
            .map(|record| record.value().clone())
            .ok_or_else(not_found)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn tracker() -> FileStatusTracker {
        FileStatusTracker::new([RecordKind::Dimension, RecordKind::Event])
    }

    #[test]
    fn test_register_and_duplicate() {
        let tracker = tracker();

        let record = tracker.register("f1").unwrap();
        assert_eq!(record.current_state, FileState::Received);
        assert!(!record.ready_to_archive);

        let err = tracker.register("f1").unwrap_err();
        assert!(matches!(err, IngestError::Conflict(_)));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_register_rejects_blank_id_and_empty_kinds() {
        let tracker = tracker();

        assert!(matches!(
            tracker.register(" ").unwrap_err(),
            IngestError::InvalidRequest(_)
        ));
        assert!(matches!(
            tracker.register_with_kinds("f", Vec::new()).unwrap_err(),
            IngestError::InvalidRequest(_)
        ));
    }

    #[test]
    fn test_get_status_unknown() {
        let err = tracker().get_status("missing").unwrap_err();
        assert_eq!(err.to_string(), "No file status found");
    }

    #[test]
    fn test_validates_after_all_expected_kinds() {
        let tracker = tracker();
        tracker.register("f1").unwrap();

        let record = tracker
            .record_ingestion_outcome("f1", RecordKind::Dimension, &IngestionResult::success(RecordKind::Dimension, 5, 0))
            .unwrap();
        assert_eq!(record.current_state, FileState::Processing);
        assert!(!record.ready_to_archive);

        let record = tracker
            .record_ingestion_outcome("f1", RecordKind::Event, &IngestionResult::success(RecordKind::Event, 2, 0))
            .unwrap();
        assert_eq!(record.current_state, FileState::Validated);
        assert!(record.ready_to_archive);
        assert_eq!(
            record.per_kind_counts.get(&RecordKind::Dimension),
            Some(&KindCounts { valid: 5, error: 0 })
        );
    }

    #[test]
    fn test_any_error_fails_file() {
        let tracker = tracker();
        tracker.register("f1").unwrap();

        let record = tracker
            .record_ingestion_outcome("f1", RecordKind::Event, &IngestionResult::success(RecordKind::Event, 9, 1))
            .unwrap();

        assert_eq!(record.current_state, FileState::Failed);
        assert!(!record.ready_to_archive);
    }

    #[test]
    fn test_rejected_result_fails_file() {
        let tracker = tracker();
        tracker.register("f1").unwrap();

        let record = tracker
            .record_ingestion_outcome("f1", RecordKind::Event, &IngestionResult::rejected("No event found"))
            .unwrap();

        assert_eq!(record.current_state, FileState::Failed);
        assert!(record.per_kind_counts.is_empty());
    }

    #[test]
    fn test_failed_file_needs_explicit_retry() {
        let tracker = tracker();
        tracker.register("f1").unwrap();
        tracker
            .record_ingestion_outcome("f1", RecordKind::Dimension, &IngestionResult::success(RecordKind::Dimension, 3, 0))
            .unwrap();
        tracker
            .record_ingestion_outcome("f1", RecordKind::Event, &IngestionResult::success(RecordKind::Event, 1, 2))
            .unwrap();

        let err = tracker
            .record_ingestion_outcome("f1", RecordKind::Event, &IngestionResult::success(RecordKind::Event, 3, 0))
            .unwrap_err();
        assert!(matches!(err, IngestError::Conflict(_)));

        let update = tracker.update_status("f1", FileState::Processing).unwrap();
        assert_eq!(update.state, FileState::Processing);
        assert!(!update.ready_to_archive);

        let record = tracker.get_status("f1").unwrap();
        assert!(record.per_kind_counts.contains_key(&RecordKind::Dimension));
        assert!(!record.per_kind_counts.contains_key(&RecordKind::Event));

        let record = tracker
            .record_ingestion_outcome("f1", RecordKind::Event, &IngestionResult::success(RecordKind::Event, 3, 0))
            .unwrap();
        assert_eq!(record.current_state, FileState::Validated);
    }

    #[test]
    fn test_update_status_ready_flag_follows_state() {
        let tracker = tracker();
        tracker.register("f1").unwrap();

        let update = tracker.update_status("f1", FileState::Processing).unwrap();
        assert!(!update.ready_to_archive);

        let update = tracker.update_status("f1", FileState::Validated).unwrap();
        assert!(update.ready_to_archive);

        let update = tracker.update_status("f1", FileState::Archived).unwrap();
        assert_eq!(update.state, FileState::Archived);
        assert!(!update.ready_to_archive);
    }

    #[test]
    fn test_archived_is_final() {
        let tracker = tracker();
        tracker.register("f1").unwrap();
        tracker.update_status("f1", FileState::Failed).unwrap();
        tracker.update_status("f1", FileState::Archived).unwrap();

        for next in [FileState::Archived, FileState::Processing] {
            assert!(matches!(
                tracker.update_status("f1", next).unwrap_err(),
                IngestError::Conflict(_)
            ));
        }
        assert!(tracker.begin_ingestion("f1").is_err());
    }

    #[test]
    fn test_illegal_transition() {
        let tracker = tracker();
        tracker.register("f1").unwrap();

        let err = tracker.update_status("f1", FileState::Validated).unwrap_err();
        assert_eq!(err.to_string(), "Cannot move file f1 from received to validated");
        assert_eq!(tracker.get_status("f1").unwrap().current_state, FileState::Received);
    }

    #[test]
    fn test_get_status_does_not_mutate() {
        let tracker = tracker();
        let registered = tracker.register("f1").unwrap();

        assert_eq!(tracker.get_status("f1").unwrap(), registered);
        assert_eq!(tracker.get_status("f1").unwrap(), registered);
    }

    #[test]
    fn test_begin_ingestion_registers_unknown_file() {
        let tracker = tracker();

        tracker.begin_ingestion("upload.csv").unwrap();
        tracker.begin_ingestion("upload.csv").unwrap();

        assert_eq!(
            tracker.get_status("upload.csv").unwrap().current_state,
            FileState::Received
        );
    }

    #[test]
    fn test_check_accepts_outcomes_does_not_register() {
        let tracker = tracker();

        tracker.check_accepts_outcomes("upload.csv").unwrap();
        assert!(tracker.is_empty());

        tracker.register("f1").unwrap();
        tracker.update_status("f1", FileState::Failed).unwrap();
        assert!(matches!(
            tracker.check_accepts_outcomes("f1").unwrap_err(),
            IngestError::Conflict(_)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_outcomes_are_not_lost() {
        let tracker = Arc::new(FileStatusTracker::new([RecordKind::Event]));
        tracker.register("f1").unwrap();

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let tracker = tracker.clone();
                tokio::spawn(async move {
                    tracker
                        .record_ingestion_outcome(
                            "f1",
                            RecordKind::Event,
                            &IngestionResult::success(RecordKind::Event, 2, 0),
                        )
                        .unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        let record = tracker.get_status("f1").unwrap();
        assert_eq!(
            record.per_kind_counts.get(&RecordKind::Event),
            Some(&KindCounts { valid: 100, error: 0 })
        );
        assert_eq!(record.current_state, FileState::Validated);
    }
}
