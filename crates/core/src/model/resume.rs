use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::ids::VideoId;
use crate::model::video::Video;
use crate::model::watch_record::WatchRecord;

/// The join of a watch record with its catalogue entry, ready for a player
/// to jump straight back into.
///
/// Serialized field names are the wire surface the embedding layer exposes,
/// hence the camelCase rename.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeTarget {
    pub video_id: VideoId,
    pub video_title: String,
    pub video_thumbnail: Option<String>,
    pub duration_watched: f64,
    pub total_duration: f64,
    pub progress_percent: f64,
    pub watched_at: DateTime<Utc>,
}

impl ResumeTarget {
    /// Builds the target from a winning record and its video.
    ///
    /// Callers resolve the video first; a record whose video is gone never
    /// becomes a partial target.
    #[must_use]
    pub fn from_parts(record: &WatchRecord, video: &Video) -> Self {
        Self {
            video_id: video.id(),
            video_title: video.title().to_owned(),
            video_thumbnail: video.thumbnail().map(str::to_owned),
            duration_watched: record.duration_watched(),
            total_duration: record.total_duration(),
            progress_percent: record.progress_percent(),
            watched_at: record.watched_at(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::StudentId;
    use crate::model::watch_record::ProgressSample;
    use crate::time::fixed_now;

    #[test]
    fn from_parts_joins_record_and_video() {
        let video = Video::new(
            VideoId::new(9),
            "Async Rust Basics",
            None,
            "https://videos.example.com/async-basics",
            Some("https://videos.example.com/async-basics.jpg".into()),
            600.0,
            fixed_now(),
        )
        .unwrap();
        let record = ProgressSample::new(StudentId::new(1), VideoId::new(9), 300.0, 600.0)
            .unwrap()
            .into_record(fixed_now());

        let target = ResumeTarget::from_parts(&record, &video);
        assert_eq!(target.video_id, VideoId::new(9));
        assert_eq!(target.video_title, "Async Rust Basics");
        assert!((target.progress_percent - 50.0).abs() < f64::EPSILON);
        assert_eq!(target.watched_at, fixed_now());
    }
}
