//! Pure derivation of study statistics from watch records.
//!
//! Everything here is a function of `(records, as_of)`; the aggregation
//! service owns loading and clock concerns. Calendar bucketing uses UTC
//! dates throughout (see [`crate::time::utc_date`]).

use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::model::{Video, WatchRecord};
use crate::time::utc_date;

/// The streak walk never looks further back than a year.
const STREAK_LOOKBACK_DAYS: i64 = 365;

/// How many categories the rollup reports.
const CATEGORY_LIMIT: usize = 5;

//
// ─── REPORT TYPES ──────────────────────────────────────────────────────────────
//

/// Headline numbers for a student's dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyStats {
    pub total_minutes: u64,
    pub videos_completed: u32,
    pub current_streak_days: u32,
    pub average_completion_percent: u32,
}

/// Minutes watched on one calendar day, labelled with its short weekday name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayActivity {
    pub day: String,
    pub minutes: u64,
}

/// Rollup entry for one title-derived category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryActivity {
    pub name: String,
    pub count: u32,
    pub completion_percent: u32,
}

/// The full analytics payload: stats, the trailing week, and the category
/// rollup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub stats: StudyStats,
    pub week_data: Vec<DayActivity>,
    pub category_data: Vec<CategoryActivity>,
}

//
// ─── DERIVATIONS ───────────────────────────────────────────────────────────────
//

/// Derives the headline stats from a student's full history.
///
/// An empty history is a legitimate state and yields all zeroes.
#[must_use]
pub fn study_stats(records: &[WatchRecord], as_of: DateTime<Utc>) -> StudyStats {
    let total_seconds: f64 = records.iter().map(WatchRecord::duration_watched).sum();
    let completed = records.iter().filter(|r| r.completed()).count();

    StudyStats {
        total_minutes: round_u64(total_seconds / 60.0),
        videos_completed: u32::try_from(completed).unwrap_or(u32::MAX),
        current_streak_days: current_streak_days(records, as_of),
        average_completion_percent: average_percent(
            records.iter().map(WatchRecord::progress_percent),
        ),
    }
}

/// Counts consecutive days with at least one watch event, walking backward
/// from `as_of`'s UTC date.
///
/// A quiet day 0 (nothing watched yet today) does not end the streak; any
/// quiet earlier day does. The walk is capped at a year.
#[must_use]
pub fn current_streak_days(records: &[WatchRecord], as_of: DateTime<Utc>) -> u32 {
    let active: HashSet<NaiveDate> = records.iter().map(|r| utc_date(r.watched_at())).collect();
    let today = utc_date(as_of);

    let mut streak = 0;
    for offset in 0..STREAK_LOOKBACK_DAYS {
        if active.contains(&(today - Duration::days(offset))) {
            streak += 1;
        } else if offset > 0 {
            break;
        }
    }
    streak
}

/// Minutes watched per day over the trailing week, oldest day first.
///
/// Always exactly 7 entries, from `as_of - 6 days` through `as_of`. Each
/// record contributes its own floor-divided whole minutes; the per-day value
/// is the sum of those, so 89s + 95s on one day counts as 2 minutes, not 3.
#[must_use]
pub fn weekly_series(records: &[WatchRecord], as_of: DateTime<Utc>) -> Vec<DayActivity> {
    let today = utc_date(as_of);

    (0..7)
        .rev()
        .map(|offset| {
            let day = today - Duration::days(offset);
            let minutes = records
                .iter()
                .filter(|r| utc_date(r.watched_at()) == day)
                .map(|r| floor_minutes(r.duration_watched()))
                .sum();
            DayActivity {
                day: day.format("%a").to_string(),
                minutes,
            }
        })
        .collect()
}

/// Groups watched videos by a coarse category key and reports per-category
/// counts and completion.
///
/// The key is the first whitespace token of the title, a stand-in for a real
/// taxonomy. Videos are processed in the order given (catalogue order);
/// `count` accumulates, while `completion_percent` keeps the value of the
/// most recently processed video in that category rather than a running
/// average. At most the first five categories encountered are reported.
/// Both quirks are intentional; dashboard widgets already rely on them.
#[must_use]
pub fn category_breakdown(videos: &[Video], records: &[WatchRecord]) -> Vec<CategoryActivity> {
    let mut categories: Vec<CategoryActivity> = Vec::new();

    for video in videos {
        let Some(name) = category_key(video.title()) else {
            continue;
        };
        let completion = average_percent(
            records
                .iter()
                .filter(|r| r.video_id() == video.id())
                .map(WatchRecord::progress_percent),
        );

        match categories.iter_mut().find(|c| c.name == name) {
            Some(entry) => {
                entry.count += 1;
                entry.completion_percent = completion;
            }
            None => categories.push(CategoryActivity {
                name: name.to_owned(),
                count: 1,
                completion_percent: completion,
            }),
        }
    }

    categories.truncate(CATEGORY_LIMIT);
    categories
}

/// The category key for a title: its first whitespace-delimited token.
#[must_use]
pub fn category_key(title: &str) -> Option<&str> {
    title.split_whitespace().next()
}

/// Assembles the full report from pre-loaded records and their videos.
#[must_use]
pub fn analytics_report(
    records: &[WatchRecord],
    videos: &[Video],
    as_of: DateTime<Utc>,
) -> AnalyticsReport {
    AnalyticsReport {
        stats: study_stats(records, as_of),
        week_data: weekly_series(records, as_of),
        category_data: category_breakdown(videos, records),
    }
}

//
// ─── ROUNDING HELPERS ──────────────────────────────────────────────────────────
//

// Inputs are non-negative and tiny relative to the integer ranges, so the
// lossy casts cannot misbehave in practice.

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_u64(value: f64) -> u64 {
    value.round() as u64
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn floor_minutes(seconds: f64) -> u64 {
    (seconds / 60.0).floor() as u64
}

/// Rounded mean of a stream of percentages, 0 when the stream is empty.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn average_percent(progress: impl Iterator<Item = f64>) -> u32 {
    let (count, sum) = progress.fold((0_u32, 0.0), |(n, s), p| (n + 1, s + p));
    if count == 0 {
        0
    } else {
        (sum / f64::from(count)).round() as u32
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
