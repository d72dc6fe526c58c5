use std::sync::Arc;

use storage::repository::{Storage, StudentRepository};
use vidlearn_core::model::{Student, StudentId};

use crate::Clock;
use crate::analytics_service::AnalyticsService;
use crate::catalog_service::CatalogService;
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::resume_service::ResumeService;
use crate::student_service::StudentService;

const DEFAULT_STUDENT_NAME: &str = "Demo Student";
const DEFAULT_STUDENT_EMAIL: &str = "demo@vidlearn.dev";

/// Assembles app-facing services and resolves a usable student id.
#[derive(Clone)]
pub struct AppServices {
    student_id: StudentId,
    registered_student: bool,
    progress: Arc<ProgressService>,
    resume: Arc<ResumeService>,
    analytics: Arc<AnalyticsService>,
    catalog: Arc<CatalogService>,
    students: Arc<StudentService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or the default
    /// student setup fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        preferred_student_id: StudentId,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let (student_id, registered_student) =
            ensure_default_student(storage.students.as_ref(), clock, preferred_student_id).await?;

        let progress = Arc::new(ProgressService::new(
            clock,
            Arc::clone(&storage.watch_history),
            Arc::clone(&storage.videos),
        ));
        let resume = Arc::new(ResumeService::new(
            Arc::clone(&storage.watch_history),
            Arc::clone(&storage.videos),
        ));
        let analytics = Arc::new(AnalyticsService::new(
            clock,
            Arc::clone(&storage.watch_history),
            Arc::clone(&storage.videos),
        ));
        let catalog = Arc::new(CatalogService::new(clock, Arc::clone(&storage.videos)));
        let students = Arc::new(StudentService::new(clock, Arc::clone(&storage.students)));

        Ok(Self {
            student_id,
            registered_student,
            progress,
            resume,
            analytics,
            catalog,
            students,
        })
    }

    #[must_use]
    pub fn student_id(&self) -> StudentId {
        self.student_id
    }

    /// True when startup had to register the demo student.
    #[must_use]
    pub fn registered_student(&self) -> bool {
        self.registered_student
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn resume(&self) -> Arc<ResumeService> {
        Arc::clone(&self.resume)
    }

    #[must_use]
    pub fn analytics(&self) -> Arc<AnalyticsService> {
        Arc::clone(&self.analytics)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn students(&self) -> Arc<StudentService> {
        Arc::clone(&self.students)
    }
}

async fn ensure_default_student(
    students: &dyn StudentRepository,
    clock: Clock,
    preferred_id: StudentId,
) -> Result<(StudentId, bool), AppServicesError> {
    if students.get_student(preferred_id).await?.is_some() {
        return Ok((preferred_id, false));
    }

    // The demo email may already belong to a student under another id, for
    // example after a reseed with a different --student-id.
    if let Some(existing) = students.find_by_email(DEFAULT_STUDENT_EMAIL).await? {
        return Ok((existing.id(), false));
    }

    let student = Student::new(
        preferred_id,
        DEFAULT_STUDENT_NAME,
        DEFAULT_STUDENT_EMAIL,
        clock.now(),
    )?;
    students.insert_student(&student).await?;
    Ok((student.id(), true))
}

#[cfg(test)]
mod tests {
    use super::*;

    use storage::repository::InMemoryRepository;
    use vidlearn_core::time::fixed_now;

    #[tokio::test]
    async fn keeps_the_preferred_student_when_present() {
        let repo = InMemoryRepository::new();
        let student = Student::new(
            StudentId::new(7),
            "Ada Lovelace",
            "ada@vidlearn.dev",
            fixed_now(),
        )
        .unwrap();
        repo.insert_student(&student).await.unwrap();

        let (id, registered) =
            ensure_default_student(&repo, Clock::fixed(fixed_now()), StudentId::new(7))
                .await
                .unwrap();
        assert_eq!(id, StudentId::new(7));
        assert!(!registered);
    }

    #[tokio::test]
    async fn registers_the_demo_student_on_first_run() {
        let repo = InMemoryRepository::new();

        let (id, registered) =
            ensure_default_student(&repo, Clock::fixed(fixed_now()), StudentId::new(1))
                .await
                .unwrap();
        assert_eq!(id, StudentId::new(1));
        assert!(registered);

        let stored = repo.get_student(StudentId::new(1)).await.unwrap().unwrap();
        assert_eq!(stored.email(), DEFAULT_STUDENT_EMAIL);
    }

    #[tokio::test]
    async fn reuses_the_demo_student_under_another_id() {
        let repo = InMemoryRepository::new();
        let student = Student::new(
            StudentId::new(3),
            DEFAULT_STUDENT_NAME,
            DEFAULT_STUDENT_EMAIL,
            fixed_now(),
        )
        .unwrap();
        repo.insert_student(&student).await.unwrap();

        let (id, registered) =
            ensure_default_student(&repo, Clock::fixed(fixed_now()), StudentId::new(1))
                .await
                .unwrap();
        assert_eq!(id, StudentId::new(3));
        assert!(!registered);
    }
}
