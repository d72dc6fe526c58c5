use vidlearn_core::model::{COMPLETION_THRESHOLD_PERCENT, StudentId, WatchRecord};

use super::{
    SqliteRepository,
    mapping::{map_watch_record_row, u64_to_i64},
};
use crate::repository::{StorageError, UpsertOutcome, WatchHistoryRepository};

#[async_trait::async_trait]
impl WatchHistoryRepository for SqliteRepository {
    async fn upsert_watch_record(
        &self,
        record: &WatchRecord,
    ) -> Result<UpsertOutcome, StorageError> {
        let student = u64_to_i64("student_id", record.student_id().value())?;
        let video = u64_to_i64("video_id", record.video_id().value())?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        // The insert arm is the only writer of first_watched_at; its row
        // count is the atomic created-vs-updated signal.
        let created = sqlx::query(
            r"
            INSERT INTO watch_history (
                student_id, video_id, watched_at, first_watched_at,
                duration_watched, total_duration, progress_percent, completed
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(student_id, video_id) DO NOTHING
            ",
        )
        .bind(student)
        .bind(video)
        .bind(record.watched_at())
        .bind(record.first_watched_at())
        .bind(record.duration_watched())
        .bind(record.total_duration())
        .bind(record.progress_percent())
        .bind(record.completed())
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .rows_affected()
            == 1;

        if !created {
            sqlx::query(
                r"
                UPDATE watch_history SET
                    watched_at = ?3,
                    duration_watched = ?4,
                    total_duration = ?5,
                    progress_percent = ?6,
                    completed = ?7
                WHERE student_id = ?1 AND video_id = ?2
                ",
            )
            .bind(student)
            .bind(video)
            .bind(record.watched_at())
            .bind(record.duration_watched())
            .bind(record.total_duration())
            .bind(record.progress_percent())
            .bind(record.completed())
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(UpsertOutcome { created })
    }

    async fn records_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<WatchRecord>, StorageError> {
        let student = u64_to_i64("student_id", student_id.value())?;

        let rows = sqlx::query(
            r"
            SELECT
                student_id, video_id, watched_at, first_watched_at,
                duration_watched, total_duration, progress_percent, completed
            FROM watch_history
            WHERE student_id = ?1
            ORDER BY watched_at DESC, video_id ASC
            ",
        )
        .bind(student)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(map_watch_record_row(&row)?);
        }
        Ok(records)
    }

    async fn most_recent_incomplete(
        &self,
        student_id: StudentId,
    ) -> Result<Option<WatchRecord>, StorageError> {
        let student = u64_to_i64("student_id", student_id.value())?;

        let row = sqlx::query(
            r"
            SELECT
                student_id, video_id, watched_at, first_watched_at,
                duration_watched, total_duration, progress_percent, completed
            FROM watch_history
            WHERE student_id = ?1
              AND completed = 0
              AND progress_percent < ?2
            ORDER BY watched_at DESC, video_id ASC
            LIMIT 1
            ",
        )
        .bind(student)
        .bind(COMPLETION_THRESHOLD_PERCENT)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|r| map_watch_record_row(&r)).transpose()
    }

    async fn most_recent(
        &self,
        student_id: StudentId,
    ) -> Result<Option<WatchRecord>, StorageError> {
        let student = u64_to_i64("student_id", student_id.value())?;

        let row = sqlx::query(
            r"
            SELECT
                student_id, video_id, watched_at, first_watched_at,
                duration_watched, total_duration, progress_percent, completed
            FROM watch_history
            WHERE student_id = ?1
            ORDER BY watched_at DESC, video_id ASC
            LIMIT 1
            ",
        )
        .bind(student)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|r| map_watch_record_row(&r)).transpose()
    }
}
