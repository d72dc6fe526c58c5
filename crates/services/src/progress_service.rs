use std::sync::Arc;

use storage::repository::{VideoCatalogRepository, WatchHistoryRepository};
use vidlearn_core::model::{ProgressSample, WatchRecord};

use crate::Clock;
use crate::error::ProgressServiceError;

/// Outcome of recording a progress sample.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedProgress {
    /// True when the sample opened a new history row for the pair.
    pub created: bool,
    /// The record as persisted, derived fields included.
    pub record: WatchRecord,
}

/// Records watch progress and keeps view counts in step with first watches.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    watch_history: Arc<dyn WatchHistoryRepository>,
    videos: Arc<dyn VideoCatalogRepository>,
}

impl ProgressService {
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

    #[must_use]
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Persist a progress sample, stamped with the service clock.
    ///
    /// The first sample for a (student, video) pair creates the history row
    /// and bumps the video's view count once; every later sample updates the
    /// row in place and leaves the count alone. The video does not have to
    /// exist in the catalogue for the save to succeed.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if persistence fails. A
    /// failure on the view-count increment leaves the history row in place;
    /// the caller's next sample retries against the already-created row and
    /// will not bump the count again.
    pub async fn record_progress(
        &self,
        sample: ProgressSample,
    ) -> Result<RecordedProgress, ProgressServiceError> {
        let record = sample.into_record(self.clock.now());
        let outcome = self.watch_history.upsert_watch_record(&record).await?;
        if outcome.created {
            self.videos.increment_view_count(record.video_id()).await?;
            tracing::debug!(
                "first watch: student {} video {}",
                record.student_id(),
                record.video_id()
            );
        }
        Ok(RecordedProgress {
            created: outcome.created,
            record,
        })
    }
}
