use std::sync::Arc;

use storage::repository::StudentRepository;
use vidlearn_core::model::{Student, StudentId};

use crate::Clock;
use crate::error::StudentServiceError;

/// Registers students and looks them up.
///
/// Holds no credentials; session issuance lives outside this crate.
#[derive(Clone)]
pub struct StudentService {
    clock: Clock,
    students: Arc<dyn StudentRepository>,
}

impl StudentService {
    #[must_use]
    pub fn new(clock: Clock, students: Arc<dyn StudentRepository>) -> Self {
        Self { clock, students }
    }

    /// Register a student under the given id.
    ///
    /// The join timestamp comes from the service clock.
    ///
    /// # Errors
    ///
    /// Returns `StudentServiceError::EmailTaken` when another student
    /// already uses the email, `StudentServiceError::Student` for
    /// validation failures, and `StudentServiceError::Storage` if
    /// persistence fails.
    pub async fn register(
        &self,
        id: StudentId,
        name: String,
        email: String,
    ) -> Result<Student, StudentServiceError> {
        let student = Student::new(id, name, email, self.clock.now())?;
        if self.students.find_by_email(student.email()).await?.is_some() {
            return Err(StudentServiceError::EmailTaken);
        }
        self.students.insert_student(&student).await?;
        tracing::info!("registered student {}", student.id());
        Ok(student)
    }

    /// Fetch a student by id. Returns `Ok(None)` when unknown.
    ///
    /// # Errors
    ///
    /// Returns `StudentServiceError::Storage` if repository access fails.
    pub async fn get(&self, id: StudentId) -> Result<Option<Student>, StudentServiceError> {
        let student = self.students.get_student(id).await?;
        Ok(student)
    }
}
