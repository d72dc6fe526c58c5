use vidlearn_core::model::{Video, VideoId};

use super::{
    SqliteRepository,
    mapping::{insert_error, map_video_row, u64_to_i64},
};
use crate::repository::{StorageError, VideoCatalogRepository};

#[async_trait::async_trait]
impl VideoCatalogRepository for SqliteRepository {
    async fn insert_video(&self, video: &Video) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO videos (
                id, title, description, url, thumbnail,
                duration_seconds, uploaded_at, views
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(u64_to_i64("video_id", video.id().value())?)
        .bind(video.title())
        .bind(video.description())
        .bind(video.url())
        .bind(video.thumbnail())
        .bind(video.duration_seconds())
        .bind(video.uploaded_at())
        .bind(u64_to_i64("views", video.views())?)
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        Ok(())
    }

    async fn get_video(&self, id: VideoId) -> Result<Option<Video>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, description, url, thumbnail,
                   duration_seconds, uploaded_at, views
            FROM videos
            WHERE id = ?1
            ",
        )
        .bind(u64_to_i64("video_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|r| map_video_row(&r)).transpose()
    }

    async fn videos_by_ids(&self, ids: &[VideoId]) -> Result<Vec<Video>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = String::from(
            r"
            SELECT id, title, description, url, thumbnail,
                   duration_seconds, uploaded_at, views
            FROM videos
            WHERE id IN (
            ",
        );

        for i in 0..ids.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 1).to_string());
        }
        sql.push_str(")\nORDER BY id ASC\n");

        let mut q = sqlx::query(&sql);
        for id in ids {
            q = q.bind(u64_to_i64("video_id", id.value())?);
        }

        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut videos = Vec::with_capacity(rows.len());
        for row in rows {
            videos.push(map_video_row(&row)?);
        }
        Ok(videos)
    }

    async fn list_videos(&self, limit: u32) -> Result<Vec<Video>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, description, url, thumbnail,
                   duration_seconds, uploaded_at, views
            FROM videos
            ORDER BY uploaded_at DESC, id ASC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut videos = Vec::with_capacity(rows.len());
        for row in rows {
            videos.push(map_video_row(&row)?);
        }
        Ok(videos)
    }

    async fn increment_view_count(&self, id: VideoId) -> Result<(), StorageError> {
        // Unknown ids update zero rows, which is the contract's no-op.
        sqlx::query("UPDATE videos SET views = views + 1 WHERE id = ?1")
            .bind(u64_to_i64("video_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn set_duration(
        &self,
        id: VideoId,
        duration_seconds: f64,
    ) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE videos SET duration_seconds = ?2 WHERE id = ?1")
            .bind(u64_to_i64("video_id", id.value())?)
            .bind(duration_seconds)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
