use exam_core::model::ExamId;
use sqlx::Row;

use super::SqliteRepository;
use crate::repository::{ProgressRecord, ProgressRepository, StorageError};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn save_progress(
        &self,
        exam_id: &ExamId,
        record: &ProgressRecord,
    ) -> Result<(), StorageError> {
        let snapshot = serde_json::to_string(record).map_err(ser)?;

        sqlx::query(
            r"
                INSERT INTO exam_progress (key, exam_id, snapshot, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(key) DO UPDATE SET
                    snapshot = excluded.snapshot,
                    updated_at = excluded.updated_at
            ",
        )
        .bind(ProgressRecord::storage_key(exam_id))
        .bind(exam_id.as_str())
        .bind(snapshot)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn load_progress(
        &self,
        exam_id: &ExamId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let row = sqlx::query("SELECT snapshot FROM exam_progress WHERE key = ?1")
            .bind(ProgressRecord::storage_key(exam_id))
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let snapshot: String = row.try_get("snapshot").map_err(ser)?;
        let record = serde_json::from_str(&snapshot).map_err(ser)?;
        Ok(Some(record))
    }

    async fn delete_progress(&self, exam_id: &ExamId) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM exam_progress WHERE key = ?1")
            .bind(ProgressRecord::storage_key(exam_id))
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }
}
