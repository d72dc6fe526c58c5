use chrono::{DateTime, Utc};
use thiserror::Error;
use url::Url;

use crate::model::ids::VideoId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum VideoError {
    #[error("video title cannot be empty")]
    EmptyTitle,

    #[error("invalid video url: {0}")]
    InvalidUrl(String),

    #[error("video duration must be a positive number of seconds")]
    InvalidDuration,
}

//
// ─── VIDEO ─────────────────────────────────────────────────────────────────────
//

/// A catalogue entry for one instructional video.
///
/// The watch-progress pipeline treats the catalogue as read-only apart from
/// the view counter; everything here comes from ingestion (manual or via the
/// YouTube metadata lookup).
#[derive(Debug, Clone, PartialEq)]
pub struct Video {
    id: VideoId,
    title: String,
    description: Option<String>,
    url: String,
    thumbnail: Option<String>,
    duration_seconds: f64,
    uploaded_at: DateTime<Utc>,
    views: u64,
}

impl Video {
    /// Creates a validated catalogue entry with a zero view count.
    ///
    /// # Errors
    ///
    /// Returns `VideoError::EmptyTitle` for a blank title,
    /// `VideoError::InvalidUrl` when the url does not parse, and
    /// `VideoError::InvalidDuration` unless the duration is a finite
    /// positive number of seconds.
    pub fn new(
        id: VideoId,
        title: impl Into<String>,
        description: Option<String>,
        url: impl Into<String>,
        thumbnail: Option<String>,
        duration_seconds: f64,
        uploaded_at: DateTime<Utc>,
    ) -> Result<Self, VideoError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(VideoError::EmptyTitle);
        }

        let url = url.into();
        if Url::parse(&url).is_err() {
            return Err(VideoError::InvalidUrl(url));
        }

        if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
            return Err(VideoError::InvalidDuration);
        }

        let description = description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());
        let thumbnail = thumbnail
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty());

        Ok(Self {
            id,
            title: title.trim().to_owned(),
            description,
            url,
            thumbnail,
            duration_seconds,
            uploaded_at,
            views: 0,
        })
    }

    /// Rebuilds a catalogue entry from persisted fields, view count included.
    ///
    /// # Errors
    ///
    /// Applies the same validation as [`Video::new`].
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: VideoId,
        title: String,
        description: Option<String>,
        url: String,
        thumbnail: Option<String>,
        duration_seconds: f64,
        uploaded_at: DateTime<Utc>,
        views: u64,
    ) -> Result<Self, VideoError> {
        let video = Self::new(
            id,
            title,
            description,
            url,
            thumbnail,
            duration_seconds,
            uploaded_at,
        )?;
        Ok(video.with_views(views))
    }

    /// Returns the same entry with the view counter replaced.
    #[must_use]
    pub fn with_views(mut self, views: u64) -> Self {
        self.views = views;
        self
    }

    /// Replaces the duration, e.g. after a metadata backfill corrects it.
    ///
    /// Watch records that referenced the old duration are left alone; the
    /// drift is accepted rather than reconciled.
    ///
    /// # Errors
    ///
    /// Returns `VideoError::InvalidDuration` unless the value is a finite
    /// positive number of seconds.
    pub fn set_duration_seconds(&mut self, duration_seconds: f64) -> Result<(), VideoError> {
        if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
            return Err(VideoError::InvalidDuration);
        }
        self.duration_seconds = duration_seconds;
        Ok(())
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> VideoId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn thumbnail(&self) -> Option<&str> {
        self.thumbnail.as_deref()
    }

    #[must_use]
    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    #[must_use]
    pub fn uploaded_at(&self) -> DateTime<Utc> {
        self.uploaded_at
    }

    #[must_use]
    pub fn views(&self) -> u64 {
        self.views
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
