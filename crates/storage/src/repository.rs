use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use vidlearn_core::model::{Student, StudentId, Video, VideoId, WatchRecord};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Report of an atomic upsert: whether the write inserted a new record.
///
/// The at-most-once view increment hangs off this flag, so adapters must
/// produce it from the same write that performed the upsert, never from a
/// separate read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub created: bool,
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Repository contract for the per-(student, video) watch state.
#[async_trait]
pub trait WatchHistoryRepository: Send + Sync {
    /// Inserts or updates the record keyed by `(student_id, video_id)`.
    ///
    /// On update the stored `first_watched_at` wins over the incoming one;
    /// every other field is taken from `record` (last write wins). At most
    /// one record per pair ever exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_watch_record(&self, record: &WatchRecord)
    -> Result<UpsertOutcome, StorageError>;

    /// Fetches all records for a student, most recently watched first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure; an unknown student simply
    /// has no records.
    async fn records_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<WatchRecord>, StorageError>;

    /// The most recently watched record still worth resuming (not completed
    /// and under the completion threshold), if any.
    ///
    /// Ties on `watched_at` resolve to the lowest video id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn most_recent_incomplete(
        &self,
        student_id: StudentId,
    ) -> Result<Option<WatchRecord>, StorageError>;

    /// The most recently watched record regardless of completion, if any.
    /// Same tie rule as [`Self::most_recent_incomplete`].
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn most_recent(&self, student_id: StudentId)
    -> Result<Option<WatchRecord>, StorageError>;
}

/// Repository contract for the video catalogue.
#[async_trait]
pub trait VideoCatalogRepository: Send + Sync {
    /// Adds a new catalogue entry.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id is already taken.
    async fn insert_video(&self, video: &Video) -> Result<(), StorageError>;

    /// Fetches one entry; `Ok(None)` when the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn get_video(&self, id: VideoId) -> Result<Option<Video>, StorageError>;

    /// Fetches the distinct entries for `ids` in catalogue order (ascending
    /// id). Unknown ids are skipped, not errors.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn videos_by_ids(&self, ids: &[VideoId]) -> Result<Vec<Video>, StorageError>;

    /// Lists catalogue entries, most recently uploaded first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn list_videos(&self, limit: u32) -> Result<Vec<Video>, StorageError>;

    /// Bumps the view counter by one. A missing video is a silent no-op;
    /// the caller gated on the upsert outcome, not on catalogue state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn increment_view_count(&self, id: VideoId) -> Result<(), StorageError>;

    /// Overwrites the stored duration (metadata backfill path).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown id.
    async fn set_duration(&self, id: VideoId, duration_seconds: f64)
    -> Result<(), StorageError>;
}

/// Repository contract for registered students.
#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// Adds a student.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id or email is already taken.
    async fn insert_student(&self, student: &Student) -> Result<(), StorageError>;

    /// Fetches one student; `Ok(None)` when the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn get_student(&self, id: StudentId) -> Result<Option<Student>, StorageError>;

    /// Looks a student up by email; `Ok(None)` when unknown.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn find_by_email(&self, email: &str) -> Result<Option<Student>, StorageError>;
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    histories: Arc<Mutex<HashMap<(StudentId, VideoId), WatchRecord>>>,
    videos: Arc<Mutex<HashMap<VideoId, Video>>>,
    students: Arc<Mutex<HashMap<StudentId, Student>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            histories: Arc::new(Mutex::new(HashMap::new())),
            videos: Arc::new(Mutex::new(HashMap::new())),
            students: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// All records for a student, newest `watched_at` first, ties broken by
    /// ascending video id. Shared by every history read.
    fn sorted_history(&self, student_id: StudentId) -> Result<Vec<WatchRecord>, StorageError> {
        let guard = self
            .histories
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut records: Vec<WatchRecord> = guard
            .values()
            .filter(|r| r.student_id() == student_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.watched_at()
                .cmp(&a.watched_at())
                .then_with(|| a.video_id().cmp(&b.video_id()))
        });
        Ok(records)
    }
}

#[async_trait]
impl WatchHistoryRepository for InMemoryRepository {
    async fn upsert_watch_record(
        &self,
        record: &WatchRecord,
    ) -> Result<UpsertOutcome, StorageError> {
        let mut guard = self
            .histories
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let key = (record.student_id(), record.video_id());

        let created = match guard.get(&key) {
            Some(existing) => {
                let first = existing.first_watched_at();
                guard.insert(key, record.clone().with_first_watched_at(first));
                false
            }
            None => {
                guard.insert(key, record.clone());
                true
            }
        };
        Ok(UpsertOutcome { created })
    }

    async fn records_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<WatchRecord>, StorageError> {
        self.sorted_history(student_id)
    }

    async fn most_recent_incomplete(
        &self,
        student_id: StudentId,
    ) -> Result<Option<WatchRecord>, StorageError> {
        Ok(self
            .sorted_history(student_id)?
            .into_iter()
            .find(WatchRecord::is_resumable))
    }

    async fn most_recent(
        &self,
        student_id: StudentId,
    ) -> Result<Option<WatchRecord>, StorageError> {
        Ok(self.sorted_history(student_id)?.into_iter().next())
    }
}

#[async_trait]
impl VideoCatalogRepository for InMemoryRepository {
    async fn insert_video(&self, video: &Video) -> Result<(), StorageError> {
        let mut guard = self
            .videos
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.contains_key(&video.id()) {
            return Err(StorageError::Conflict);
        }
        guard.insert(video.id(), video.clone());
        Ok(())
    }

    async fn get_video(&self, id: VideoId) -> Result<Option<Video>, StorageError> {
        let guard = self
            .videos
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn videos_by_ids(&self, ids: &[VideoId]) -> Result<Vec<Video>, StorageError> {
        let guard = self
            .videos
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut wanted = ids.to_vec();
        wanted.sort_unstable();
        wanted.dedup();
        Ok(wanted.into_iter().filter_map(|id| guard.get(&id).cloned()).collect())
    }

    async fn list_videos(&self, limit: u32) -> Result<Vec<Video>, StorageError> {
        let guard = self
            .videos
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut videos: Vec<Video> = guard.values().cloned().collect();
        videos.sort_by(|a, b| {
            b.uploaded_at()
                .cmp(&a.uploaded_at())
                .then_with(|| a.id().cmp(&b.id()))
        });
        videos.truncate(limit as usize);
        Ok(videos)
    }

    async fn increment_view_count(&self, id: VideoId) -> Result<(), StorageError> {
        let mut guard = self
            .videos
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if let Some(video) = guard.get_mut(&id) {
            let views = video.views();
            *video = video.clone().with_views(views + 1);
        }
        Ok(())
    }

    async fn set_duration(
        &self,
        id: VideoId,
        duration_seconds: f64,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .videos
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let video = guard.get_mut(&id).ok_or(StorageError::NotFound)?;
        video
            .set_duration_seconds(duration_seconds)
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl StudentRepository for InMemoryRepository {
    async fn insert_student(&self, student: &Student) -> Result<(), StorageError> {
        let mut guard = self
            .students
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let taken = guard.contains_key(&student.id())
            || guard.values().any(|s| s.email() == student.email());
        if taken {
            return Err(StorageError::Conflict);
        }
        guard.insert(student.id(), student.clone());
        Ok(())
    }

    async fn get_student(&self, id: StudentId) -> Result<Option<Student>, StorageError> {
        let guard = self
            .students
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Student>, StorageError> {
        let guard = self
            .students
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.values().find(|s| s.email() == email).cloned())
    }
}

//
// ─── STORAGE HANDLE ────────────────────────────────────────────────────────────
//

/// Aggregates the three repositories behind trait objects for easy backend
/// swapping. Built once at process start and passed into the services.
#[derive(Clone)]
pub struct Storage {
    pub watch_history: Arc<dyn WatchHistoryRepository>,
    pub videos: Arc<dyn VideoCatalogRepository>,
    pub students: Arc<dyn StudentRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let watch_history: Arc<dyn WatchHistoryRepository> = Arc::new(repo.clone());
        let videos: Arc<dyn VideoCatalogRepository> = Arc::new(repo.clone());
        let students: Arc<dyn StudentRepository> = Arc::new(repo);
        Self {
            watch_history,
            videos,
            students,
        }
    }
}
