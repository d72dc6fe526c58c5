use vidlearn_core::model::{Student, StudentId};

use super::{
    SqliteRepository,
    mapping::{insert_error, map_student_row, u64_to_i64},
};
use crate::repository::{StorageError, StudentRepository};

#[async_trait::async_trait]
impl StudentRepository for SqliteRepository {
    async fn insert_student(&self, student: &Student) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO students (id, name, email, joined_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(u64_to_i64("student_id", student.id().value())?)
        .bind(student.name())
        .bind(student.email())
        .bind(student.joined_at())
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        Ok(())
    }

    async fn get_student(&self, id: StudentId) -> Result<Option<Student>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, name, email, joined_at
            FROM students
            WHERE id = ?1
            ",
        )
        .bind(u64_to_i64("student_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|r| map_student_row(&r)).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Student>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, name, email, joined_at
            FROM students
            WHERE email = ?1
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|r| map_student_row(&r)).transpose()
    }
}
