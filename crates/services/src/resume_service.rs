use std::sync::Arc;

use storage::repository::{VideoCatalogRepository, WatchHistoryRepository};
use vidlearn_core::model::{ResumeTarget, StudentId};

use crate::error::ResumeServiceError;

/// Picks the video a student should continue with.
#[derive(Clone)]
pub struct ResumeService {
    watch_history: Arc<dyn WatchHistoryRepository>,
    videos: Arc<dyn VideoCatalogRepository>,
}

impl ResumeService {
    #[must_use]
    pub fn new(
        watch_history: Arc<dyn WatchHistoryRepository>,
        videos: Arc<dyn VideoCatalogRepository>,
    ) -> Self {
        Self {
            watch_history,
            videos,
        }
    }

    /// Find the resume point for a student.
    ///
    /// Prefers the most recently watched record that is still resumable
    /// (not completed and under the completion threshold); when every
    /// record is finished, falls back to the most recent record of any
    /// state so returning students land on familiar ground. Returns `None`
    /// when the student has no history or the winning record's video has
    /// left the catalogue; there is never a partial target.
    ///
    /// # Errors
    ///
    /// Returns `ResumeServiceError::Storage` if repository access fails.
    pub async fn find_resume_point(
        &self,
        student_id: StudentId,
    ) -> Result<Option<ResumeTarget>, ResumeServiceError> {
        let record = match self.watch_history.most_recent_incomplete(student_id).await? {
            Some(record) => Some(record),
            None => self.watch_history.most_recent(student_id).await?,
        };
        let Some(record) = record else {
            return Ok(None);
        };

        let Some(video) = self.videos.get_video(record.video_id()).await? else {
            tracing::debug!(
                "resume target video {} is gone from the catalogue",
                record.video_id()
            );
            return Ok(None);
        };

        Ok(Some(ResumeTarget::from_parts(&record, &video)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use storage::repository::InMemoryRepository;
    use vidlearn_core::model::{ProgressSample, Video, VideoId};
    use vidlearn_core::time::fixed_now;

    fn build_video(id: u64, title: &str) -> Video {
        Video::new(
            VideoId::new(id),
            title,
            None,
            "https://youtu.be/dQw4w9WgXcQ",
            None,
            600.0,
            fixed_now(),
        )
        .unwrap()
    }

    async fn record(
        repo: &InMemoryRepository,
        student: u64,
        video: u64,
        watched: f64,
        hours_ago: i64,
    ) {
        let sample =
            ProgressSample::new(StudentId::new(student), VideoId::new(video), watched, 600.0)
                .unwrap();
        let record = sample.into_record(fixed_now() - Duration::hours(hours_ago));
        repo.upsert_watch_record(&record).await.unwrap();
    }

    fn service(repo: &InMemoryRepository) -> ResumeService {
        let repo = Arc::new(repo.clone());
        ResumeService::new(
            Arc::clone(&repo) as Arc<dyn WatchHistoryRepository>,
            repo as Arc<dyn VideoCatalogRepository>,
        )
    }

    #[tokio::test]
    async fn prefers_unfinished_over_newer_completed() {
        let repo = InMemoryRepository::new();
        repo.insert_video(&build_video(1, "Rust Ownership")).await.unwrap();
        repo.insert_video(&build_video(2, "Rust Lifetimes")).await.unwrap();
        record(&repo, 1, 1, 580.0, 1).await; // completed an hour ago
        record(&repo, 1, 2, 200.0, 5).await; // halfway, older

        let target = service(&repo)
            .find_resume_point(StudentId::new(1))
            .await
            .unwrap()
            .expect("resume target");

        assert_eq!(target.video_id, VideoId::new(2));
        assert_eq!(target.video_title, "Rust Lifetimes");
        assert!((target.duration_watched - 200.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn falls_back_to_most_recent_when_everything_is_done() {
        let repo = InMemoryRepository::new();
        repo.insert_video(&build_video(1, "Rust Ownership")).await.unwrap();
        repo.insert_video(&build_video(2, "Rust Lifetimes")).await.unwrap();
        record(&repo, 1, 1, 590.0, 4).await;
        record(&repo, 1, 2, 600.0, 2).await;

        let target = service(&repo)
            .find_resume_point(StudentId::new(1))
            .await
            .unwrap()
            .expect("fallback target");

        assert_eq!(target.video_id, VideoId::new(2));
        assert!((target.progress_percent - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn empty_history_yields_nothing() {
        let repo = InMemoryRepository::new();
        let target = service(&repo)
            .find_resume_point(StudentId::new(1))
            .await
            .unwrap();
        assert!(target.is_none());
    }

    #[tokio::test]
    async fn vanished_video_yields_nothing_rather_than_a_partial_target() {
        let repo = InMemoryRepository::new();
        record(&repo, 1, 42, 300.0, 1).await;

        let target = service(&repo)
            .find_resume_point(StudentId::new(1))
            .await
            .unwrap();
        assert!(target.is_none());
    }
}
