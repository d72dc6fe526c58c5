use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use storage::repository::{VideoCatalogRepository, WatchHistoryRepository};
use vidlearn_core::analytics::{AnalyticsReport, analytics_report};
use vidlearn_core::model::{StudentId, Video, VideoId, WatchRecord};

use crate::Clock;
use crate::error::AnalyticsServiceError;

/// Title shown for history rows whose video has left the catalogue.
const UNKNOWN_VIDEO_TITLE: &str = "Unknown Video";

/// One watch-history row joined with its video details, newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub video_id: VideoId,
    pub video_title: String,
    pub video_thumbnail: Option<String>,
    pub video_url: Option<String>,
    pub duration_watched: f64,
    pub total_duration: f64,
    pub progress_percent: f64,
    pub completed: bool,
    pub watched_at: DateTime<Utc>,
    pub first_watched_at: DateTime<Utc>,
}

impl HistoryEntry {
    fn from_parts(record: &WatchRecord, video: Option<&Video>) -> Self {
        Self {
            video_id: record.video_id(),
            video_title: video
                .map_or_else(|| UNKNOWN_VIDEO_TITLE.to_owned(), |v| v.title().to_owned()),
            video_thumbnail: video.and_then(|v| v.thumbnail().map(str::to_owned)),
            video_url: video.map(|v| v.url().to_owned()),
            duration_watched: record.duration_watched(),
            total_duration: record.total_duration(),
            progress_percent: record.progress_percent(),
            completed: record.completed(),
            watched_at: record.watched_at(),
            first_watched_at: record.first_watched_at(),
        }
    }
}

/// Derives study reports from a student's watch history.
#[derive(Clone)]
pub struct AnalyticsService {
    clock: Clock,
    watch_history: Arc<dyn WatchHistoryRepository>,
    videos: Arc<dyn VideoCatalogRepository>,
}

impl AnalyticsService {
    #[must_use]
    pub fn new(
        clock: Clock,
        watch_history: Arc<dyn WatchHistoryRepository>,
        videos: Arc<dyn VideoCatalogRepository>,
    ) -> Self {
        Self {
            clock,
            watch_history,
            videos,
        }
    }

    /// Compute the dashboard report as of the service clock.
    ///
    /// An empty history is not an error; it yields zeroed stats, a week of
    /// zero-minute days, and no categories. Whether the student id refers to
    /// a registered student is the caller's concern.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsServiceError::Storage` if repository access fails.
    pub async fn compute_analytics(
        &self,
        student_id: StudentId,
    ) -> Result<AnalyticsReport, AnalyticsServiceError> {
        let records = self.watch_history.records_for_student(student_id).await?;
        tracing::debug!(
            "deriving report for student {student_id} from {} records",
            records.len()
        );
        let ids: Vec<VideoId> = records.iter().map(WatchRecord::video_id).collect();
        let videos = self.videos.videos_by_ids(&ids).await?;
        Ok(analytics_report(&records, &videos, self.clock.now()))
    }

    /// The student's full history, newest first, joined with video details.
    ///
    /// Rows whose video has left the catalogue keep their watch data and
    /// degrade to a placeholder title instead of failing.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsServiceError::Storage` if repository access fails.
    pub async fn watch_history(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<HistoryEntry>, AnalyticsServiceError> {
        let records = self.watch_history.records_for_student(student_id).await?;
        let ids: Vec<VideoId> = records.iter().map(WatchRecord::video_id).collect();
        let videos: HashMap<VideoId, Video> = self
            .videos
            .videos_by_ids(&ids)
            .await?
            .into_iter()
            .map(|video| (video.id(), video))
            .collect();

        Ok(records
            .iter()
            .map(|record| HistoryEntry::from_parts(record, videos.get(&record.video_id())))
            .collect())
    }
}
