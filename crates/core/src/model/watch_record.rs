use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{StudentId, VideoId};

/// Progress at or above this percentage marks a video as completed.
pub const COMPLETION_THRESHOLD_PERCENT: f64 = 90.0;

/// Computes the progress percentage for a playback sample.
///
/// The result is deliberately unclamped: a player that reports more watched
/// seconds than the known total yields a value above 100, and that value is
/// preserved as-is. Callers must supply a positive `total_duration`.
#[must_use]
pub fn progress_percent(duration_watched: f64, total_duration: f64) -> f64 {
    duration_watched / total_duration * 100.0
}

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("watched duration must be a finite number of seconds >= 0")]
    InvalidDurationWatched,

    #[error("total duration must be a finite number of seconds > 0")]
    InvalidTotalDuration,
}

//
// ─── PROGRESS SAMPLE ───────────────────────────────────────────────────────────
//

/// One validated playback sample, the input to a progress upsert.
///
/// Players send these periodically during playback and once on teardown.
/// The sample carries raw seconds; the derived percentage and the completion
/// flag are computed when it becomes a [`WatchRecord`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    student_id: StudentId,
    video_id: VideoId,
    duration_watched: f64,
    total_duration: f64,
    explicit_completed: bool,
}

impl ProgressSample {
    /// Creates a validated sample.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidDurationWatched` unless the watched
    /// duration is finite and non-negative, and
    /// `ProgressError::InvalidTotalDuration` unless the total is finite and
    /// strictly positive (the percentage is undefined otherwise).
    pub fn new(
        student_id: StudentId,
        video_id: VideoId,
        duration_watched: f64,
        total_duration: f64,
    ) -> Result<Self, ProgressError> {
        if !duration_watched.is_finite() || duration_watched < 0.0 {
            return Err(ProgressError::InvalidDurationWatched);
        }
        if !total_duration.is_finite() || total_duration <= 0.0 {
            return Err(ProgressError::InvalidTotalDuration);
        }

        Ok(Self {
            student_id,
            video_id,
            duration_watched,
            total_duration,
            explicit_completed: false,
        })
    }

    /// Carries the caller's explicit completion flag (a player may mark a
    /// video done regardless of position, e.g. on skip-to-end).
    #[must_use]
    pub fn with_completed(mut self, completed: bool) -> Self {
        self.explicit_completed = completed;
        self
    }

    /// Materializes the proposed record for this sample.
    ///
    /// Both timestamps start at `now`; when the store already holds a record
    /// for the pair, the upsert keeps the stored `first_watched_at` and this
    /// one is discarded.
    #[must_use]
    pub fn into_record(self, now: DateTime<Utc>) -> WatchRecord {
        let progress = progress_percent(self.duration_watched, self.total_duration);
        WatchRecord {
            student_id: self.student_id,
            video_id: self.video_id,
            watched_at: now,
            first_watched_at: now,
            duration_watched: self.duration_watched,
            total_duration: self.total_duration,
            progress_percent: progress,
            completed: self.explicit_completed || progress >= COMPLETION_THRESHOLD_PERCENT,
        }
    }

    // Accessors
    #[must_use]
    pub fn student_id(&self) -> StudentId {
        self.student_id
    }

    #[must_use]
    pub fn video_id(&self) -> VideoId {
        self.video_id
    }

    #[must_use]
    pub fn duration_watched(&self) -> f64 {
        self.duration_watched
    }

    #[must_use]
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }
}

//
// ─── WATCH RECORD ──────────────────────────────────────────────────────────────
//

/// The durable watch state of one (student, video) pair.
///
/// At most one record exists per pair; creation and update are the same
/// upsert. `progress_percent` is derived from the two duration fields and
/// stored redundantly, so it is only ever written together with them, never
/// on its own. `completed` is recomputed from each incoming sample rather
/// than latched, so rewatching from the start clears the flag.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchRecord {
    student_id: StudentId,
    video_id: VideoId,
    watched_at: DateTime<Utc>,
    first_watched_at: DateTime<Utc>,
    duration_watched: f64,
    total_duration: f64,
    progress_percent: f64,
    completed: bool,
}

impl WatchRecord {
    /// Rebuilds a record from persisted fields, trusting the stored derived
    /// values (they were written atomically with their sources).
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        student_id: StudentId,
        video_id: VideoId,
        watched_at: DateTime<Utc>,
        first_watched_at: DateTime<Utc>,
        duration_watched: f64,
        total_duration: f64,
        progress_percent: f64,
        completed: bool,
    ) -> Self {
        Self {
            student_id,
            video_id,
            watched_at,
            first_watched_at,
            duration_watched,
            total_duration,
            progress_percent,
            completed,
        }
    }

    /// Returns the same record with `first_watched_at` replaced.
    ///
    /// Used by the update arm of the upsert: the incoming record keeps every
    /// mutable field, the stored record keeps the first-watch timestamp.
    #[must_use]
    pub fn with_first_watched_at(mut self, first_watched_at: DateTime<Utc>) -> Self {
        self.first_watched_at = first_watched_at;
        self
    }

    /// True when this record is the kind the resume lookup prefers: not
    /// completed and still under the completion threshold.
    #[must_use]
    pub fn is_resumable(&self) -> bool {
        !self.completed && self.progress_percent < COMPLETION_THRESHOLD_PERCENT
    }

    // Accessors
    #[must_use]
    pub fn student_id(&self) -> StudentId {
        self.student_id
    }

    #[must_use]
    pub fn video_id(&self) -> VideoId {
        self.video_id
    }

    #[must_use]
    pub fn watched_at(&self) -> DateTime<Utc> {
        self.watched_at
    }

    #[must_use]
    pub fn first_watched_at(&self) -> DateTime<Utc> {
        self.first_watched_at
    }

    #[must_use]
    pub fn duration_watched(&self) -> f64 {
        self.duration_watched
    }

    #[must_use]
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        self.progress_percent
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        self.completed
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn sample(watched: f64, total: f64) -> ProgressSample {
        ProgressSample::new(StudentId::new(1), VideoId::new(2), watched, total).unwrap()
    }

    #[test]
    fn sample_rejects_bad_watched_duration() {
        for bad in [-0.5, f64::NAN, f64::INFINITY] {
            let err = ProgressSample::new(StudentId::new(1), VideoId::new(2), bad, 600.0)
                .unwrap_err();
            assert_eq!(err, ProgressError::InvalidDurationWatched);
        }
    }

    #[test]
    fn sample_rejects_bad_total_duration() {
        for bad in [0.0, -600.0, f64::NAN, f64::INFINITY] {
            let err = ProgressSample::new(StudentId::new(1), VideoId::new(2), 30.0, bad)
                .unwrap_err();
            assert_eq!(err, ProgressError::InvalidTotalDuration);
        }
    }

    #[test]
    fn zero_watched_duration_is_a_valid_sample() {
        let record = sample(0.0, 600.0).into_record(fixed_now());
        assert!((record.progress_percent() - 0.0).abs() < f64::EPSILON);
        assert!(!record.completed());
    }

    #[test]
    fn progress_is_recomputed_and_unclamped() {
        let record = sample(700.0, 600.0).into_record(fixed_now());
        assert!(record.progress_percent() > 100.0);
        assert!(record.completed());
    }

    #[test]
    fn completion_boundary_sits_at_ninety_percent() {
        let below = sample(89.0, 100.0).into_record(fixed_now());
        assert!(!below.completed());
        assert!(below.is_resumable());

        let at = sample(90.0, 100.0).into_record(fixed_now());
        assert!(at.completed());
        assert!(!at.is_resumable());
    }

    #[test]
    fn explicit_flag_completes_regardless_of_position() {
        let record = sample(10.0, 600.0)
            .with_completed(true)
            .into_record(fixed_now());
        assert!(record.completed());
        assert!(record.progress_percent() < COMPLETION_THRESHOLD_PERCENT);
        assert!(!record.is_resumable());
    }

    #[test]
    fn into_record_starts_both_timestamps_at_now() {
        let now = fixed_now();
        let record = sample(300.0, 600.0).into_record(now);
        assert_eq!(record.watched_at(), now);
        assert_eq!(record.first_watched_at(), now);
        assert!((record.progress_percent() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn with_first_watched_at_only_touches_that_field() {
        let now = fixed_now();
        let earlier = now - chrono::Duration::days(3);
        let record = sample(300.0, 600.0).into_record(now).with_first_watched_at(earlier);
        assert_eq!(record.first_watched_at(), earlier);
        assert_eq!(record.watched_at(), now);
    }
}
