use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use exam_core::model::{ExamId, QuestionId};

/// Errors surfaced by progress storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Durable mirror of one in-progress (or submitted) exam attempt.
///
/// Field names serialize camelCase so the snapshot matches the record shape
/// the front-end keeps under the same key. `answers` keys are always a subset
/// of `question_ids`; `question_ids` is the canonical presentation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    #[serde(default)]
    pub answers: HashMap<QuestionId, String>,
    #[serde(default)]
    pub flagged_questions: Vec<QuestionId>,
    /// Remaining seconds at the time of the snapshot.
    pub time_left: u64,
    pub is_submitted: bool,
    /// Correct-answer count; meaningful only once `is_submitted` is true.
    #[serde(default)]
    pub score: u32,
    /// Epoch milliseconds of the snapshot; informational only.
    pub timestamp: i64,
    #[serde(default)]
    pub question_ids: Vec<QuestionId>,
}

impl ProgressRecord {
    /// Canonical storage key for an attempt, one record per exam id.
    #[must_use]
    pub fn storage_key(exam_id: &ExamId) -> String {
        format!("exam_progress_v2_{exam_id}")
    }
}

/// Repository contract for attempt progress snapshots.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Write the full snapshot for an exam id, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be stored.
    async fn save_progress(
        &self,
        exam_id: &ExamId,
        record: &ProgressRecord,
    ) -> Result<(), StorageError>;

    /// Fetch the snapshot for an exam id.
    ///
    /// Returns `Ok(None)` when no attempt has ever been persisted. A stored
    /// snapshot that cannot be parsed surfaces as
    /// `StorageError::Serialization`; callers treat that as "no record".
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection or parse failures.
    async fn load_progress(&self, exam_id: &ExamId)
        -> Result<Option<ProgressRecord>, StorageError>;

    /// Delete the snapshot for an exam id. Deleting a missing record is fine.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete cannot be executed.
    async fn delete_progress(&self, exam_id: &ExamId) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryProgressRepository {
    records: Arc<Mutex<HashMap<String, ProgressRecord>>>,
}

impl InMemoryProgressRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl ProgressRepository for InMemoryProgressRepository {
    async fn save_progress(
        &self,
        exam_id: &ExamId,
        record: &ProgressRecord,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(ProgressRecord::storage_key(exam_id), record.clone());
        Ok(())
    }

    async fn load_progress(
        &self,
        exam_id: &ExamId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&ProgressRecord::storage_key(exam_id)).cloned())
    }

    async fn delete_progress(&self, exam_id: &ExamId) -> Result<(), StorageError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(&ProgressRecord::storage_key(exam_id));
        Ok(())
    }
}

/// Aggregates the progress repository behind a trait object for backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            progress: Arc::new(InMemoryProgressRepository::new()),
        }
    }
}
