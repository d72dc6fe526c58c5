use std::sync::Arc;

use storage::repository::VideoCatalogRepository;
use vidlearn_core::model::{Video, VideoError, VideoId};

use crate::Clock;
use crate::error::CatalogServiceError;

/// Fields supplied when adding a video to the catalogue.
///
/// Ids come from the caller; the catalogue does not mint them. Upload time
/// is stamped by the service clock.
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub id: VideoId,
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub thumbnail: Option<String>,
    pub duration_seconds: f64,
}

/// Thin CRUD layer over the video catalogue.
#[derive(Clone)]
pub struct CatalogService {
    clock: Clock,
    videos: Arc<dyn VideoCatalogRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(clock: Clock, videos: Arc<dyn VideoCatalogRepository>) -> Self {
        Self { clock, videos }
    }

    /// Validate and persist a new catalogue entry.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Video` for validation failures and
    /// `CatalogServiceError::Storage` on persistence failures, including
    /// `Conflict` for an already-used id.
    pub async fn add_video(&self, new: NewVideo) -> Result<Video, CatalogServiceError> {
        let video = Video::new(
            new.id,
            new.title,
            new.description,
            new.url,
            new.thumbnail,
            new.duration_seconds,
            self.clock.now(),
        )?;
        self.videos.insert_video(&video).await?;
        tracing::info!("catalogued video {}: {}", video.id(), video.title());
        Ok(video)
    }

    /// Fetch a video by id. Returns `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn get_video(&self, id: VideoId) -> Result<Option<Video>, CatalogServiceError> {
        let video = self.videos.get_video(id).await?;
        Ok(video)
    }

    /// List videos, most recently uploaded first, up to the given limit.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn list_videos(&self, limit: u32) -> Result<Vec<Video>, CatalogServiceError> {
        let videos = self.videos.list_videos(limit).await?;
        Ok(videos)
    }

    /// Backfill a video's duration, for entries catalogued with a guess.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Video` if the duration is not a
    /// positive finite number, `CatalogServiceError::Storage` with
    /// `NotFound` if the video does not exist.
    pub async fn update_duration(
        &self,
        id: VideoId,
        duration_seconds: f64,
    ) -> Result<(), CatalogServiceError> {
        if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
            return Err(VideoError::InvalidDuration.into());
        }
        self.videos.set_duration(id, duration_seconds).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use storage::repository::{InMemoryRepository, StorageError};
    use vidlearn_core::time::fixed_now;

    fn service(repo: &InMemoryRepository) -> CatalogService {
        CatalogService::new(Clock::fixed(fixed_now()), Arc::new(repo.clone()))
    }

    fn new_video(id: u64, title: &str) -> NewVideo {
        NewVideo {
            id: VideoId::new(id),
            title: title.to_owned(),
            description: None,
            url: "https://youtu.be/dQw4w9WgXcQ".to_owned(),
            thumbnail: None,
            duration_seconds: 600.0,
        }
    }

    #[tokio::test]
    async fn add_video_stamps_upload_time_and_persists() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);

        let video = service.add_video(new_video(1, "Rust Ownership")).await.unwrap();
        assert_eq!(video.uploaded_at(), fixed_now());
        assert_eq!(video.views(), 0);

        let fetched = service.get_video(VideoId::new(1)).await.unwrap();
        assert_eq!(fetched.as_ref().map(Video::title), Some("Rust Ownership"));
    }

    #[tokio::test]
    async fn add_video_rejects_blank_titles_and_duplicate_ids() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);

        let err = service.add_video(new_video(1, "   ")).await.unwrap_err();
        assert!(matches!(
            err,
            CatalogServiceError::Video(VideoError::EmptyTitle)
        ));

        service.add_video(new_video(1, "Rust Ownership")).await.unwrap();
        let err = service.add_video(new_video(1, "Rust Again")).await.unwrap_err();
        assert!(matches!(
            err,
            CatalogServiceError::Storage(StorageError::Conflict)
        ));
    }

    #[tokio::test]
    async fn update_duration_validates_and_requires_the_video() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        service.add_video(new_video(1, "Rust Ownership")).await.unwrap();

        service.update_duration(VideoId::new(1), 725.0).await.unwrap();
        let video = service.get_video(VideoId::new(1)).await.unwrap().unwrap();
        assert!((video.duration_seconds() - 725.0).abs() < f64::EPSILON);

        let err = service.update_duration(VideoId::new(1), 0.0).await.unwrap_err();
        assert!(matches!(
            err,
            CatalogServiceError::Video(VideoError::InvalidDuration)
        ));

        let err = service.update_duration(VideoId::new(9), 300.0).await.unwrap_err();
        assert!(matches!(
            err,
            CatalogServiceError::Storage(StorageError::NotFound)
        ));
    }
}
