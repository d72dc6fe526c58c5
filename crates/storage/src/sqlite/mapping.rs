use sqlx::Row;
use vidlearn_core::model::{Student, StudentId, Video, VideoId, WatchRecord};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Unique-constraint violations become `Conflict`; everything else is a
/// connection-level failure.
pub(crate) fn insert_error(e: sqlx::Error) -> StorageError {
    if e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
    {
        StorageError::Conflict
    } else {
        StorageError::Connection(e.to_string())
    }
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn student_id_from_i64(v: i64) -> Result<StudentId, StorageError> {
    Ok(StudentId::new(i64_to_u64("student_id", v)?))
}

pub(crate) fn video_id_from_i64(v: i64) -> Result<VideoId, StorageError> {
    Ok(VideoId::new(i64_to_u64("video_id", v)?))
}

pub(crate) fn map_watch_record_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<WatchRecord, StorageError> {
    Ok(WatchRecord::from_persisted(
        student_id_from_i64(row.try_get::<i64, _>("student_id").map_err(ser)?)?,
        video_id_from_i64(row.try_get::<i64, _>("video_id").map_err(ser)?)?,
        row.try_get("watched_at").map_err(ser)?,
        row.try_get("first_watched_at").map_err(ser)?,
        row.try_get("duration_watched").map_err(ser)?,
        row.try_get("total_duration").map_err(ser)?,
        row.try_get("progress_percent").map_err(ser)?,
        row.try_get("completed").map_err(ser)?,
    ))
}

pub(crate) fn map_video_row(row: &sqlx::sqlite::SqliteRow) -> Result<Video, StorageError> {
    Video::from_persisted(
        video_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get("title").map_err(ser)?,
        row.try_get("description").map_err(ser)?,
        row.try_get("url").map_err(ser)?,
        row.try_get("thumbnail").map_err(ser)?,
        row.try_get("duration_seconds").map_err(ser)?,
        row.try_get("uploaded_at").map_err(ser)?,
        i64_to_u64("views", row.try_get::<i64, _>("views").map_err(ser)?)?,
    )
    .map_err(ser)
}

pub(crate) fn map_student_row(row: &sqlx::sqlite::SqliteRow) -> Result<Student, StorageError> {
    Student::from_persisted(
        student_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get("name").map_err(ser)?,
        row.try_get("email").map_err(ser)?,
        row.try_get("joined_at").map_err(ser)?,
    )
    .map_err(ser)
}
