//! YouTube metadata lookup and the URL/duration helpers behind it.
//!
//! The helpers are pure and testable offline. `YouTubeService` talks to the
//! Data API when a key is configured and degrades to the keyless oEmbed
//! endpoint otherwise.

use std::env;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::error::YouTubeError;

/// YouTube video ids are always eleven characters.
const YOUTUBE_ID_LEN: usize = 11;

/// oEmbed does not report video length; catalogue entries created through
/// the fallback start with this guess until a duration backfill runs.
pub const DEFAULT_DURATION_SECONDS: f64 = 600.0;

/// URL fragments that precede a video id in the link forms students paste.
const ID_MARKERS: [&str; 6] = ["youtu.be/", "/embed/", "/shorts/", "watch?v=", "&v=", "/v/"];

//
// ─── PURE HELPERS ──────────────────────────────────────────────────────────────
//

/// Pull the eleven-character video id out of a YouTube URL.
///
/// Accepts watch, embed, shorts, `/v/` and `youtu.be` forms, with or
/// without trailing query parameters. Returns `None` for anything else.
#[must_use]
pub fn extract_video_id(url: &str) -> Option<String> {
    let (at, marker) = ID_MARKERS
        .iter()
        .filter_map(|marker| url.rfind(marker).map(|at| (at, *marker)))
        .max_by_key(|(at, _)| *at)?;
    let tail = &url[at + marker.len()..];
    let id = match tail.find(['#', '&', '?']) {
        Some(end) => &tail[..end],
        None => tail,
    };
    (id.len() == YOUTUBE_ID_LEN).then(|| id.to_owned())
}

/// Parse an ISO 8601 duration of the shape the Data API emits (`PT1H2M10S`)
/// into seconds.
///
/// Returns `None` for anything that is not a plain `PT...` time, including
/// day-carrying durations like `P1DT2H`.
#[must_use]
pub fn parse_iso8601_duration(raw: &str) -> Option<u32> {
    let rest = raw.trim().strip_prefix("PT")?;
    let mut seconds: u32 = 0;
    let mut digits = String::new();
    for c in rest.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let value: u32 = digits.parse().ok()?;
        digits.clear();
        let factor = match c {
            'H' => 3600,
            'M' => 60,
            'S' => 1,
            _ => return None,
        };
        seconds = seconds.checked_add(value.checked_mul(factor)?)?;
    }
    digits.is_empty().then_some(seconds)
}

/// Parse a clock-style duration (`MM:SS`, `H:MM:SS` or `HH:MM:SS`) into
/// seconds.
#[must_use]
pub fn parse_clock_duration(raw: &str) -> Option<u32> {
    let parts = raw
        .trim()
        .split(':')
        .map(|part| part.parse().ok())
        .collect::<Option<Vec<u32>>>()?;
    match parts[..] {
        [minutes, seconds] => minutes.checked_mul(60)?.checked_add(seconds),
        [hours, minutes, seconds] => hours
            .checked_mul(3600)?
            .checked_add(minutes.checked_mul(60)?)?
            .checked_add(seconds),
        _ => None,
    }
}

/// Render seconds as `H:MM:SS`, or `M:SS` under an hour. Fractions floor.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// Thumbnail variants hosted under `img.youtube.com`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThumbnailQuality {
    Default,
    Medium,
    #[default]
    High,
    MaxRes,
}

impl ThumbnailQuality {
    fn file_stem(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Medium => "mqdefault",
            Self::High => "hqdefault",
            Self::MaxRes => "maxresdefault",
        }
    }
}

/// The predictable thumbnail URL for a video id.
#[must_use]
pub fn thumbnail_url(video_id: &str, quality: ThumbnailQuality) -> String {
    format!(
        "https://img.youtube.com/vi/{video_id}/{}.jpg",
        quality.file_stem()
    )
}

//
// ─── LOOKUP SERVICE ────────────────────────────────────────────────────────────
//

#[derive(Clone, Debug)]
pub struct YouTubeConfig {
    pub api_key: String,
}

impl YouTubeConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("VIDLEARN_YOUTUBE_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        Some(Self { api_key })
    }
}

/// Metadata for a video, as complete as the reachable endpoint allows.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub video_id: String,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub channel_title: Option<String>,
    pub duration_seconds: f64,
    pub view_count: u64,
    pub published_at: Option<DateTime<Utc>>,
}

/// Fetches video metadata for catalogue entries.
#[derive(Clone)]
pub struct YouTubeService {
    client: Client,
    config: Option<YouTubeConfig>,
}

impl YouTubeService {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(YouTubeConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<YouTubeConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// True when a Data API key is configured and real durations are
    /// available.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Look up a video's metadata from its URL.
    ///
    /// With a key this queries the Data API and parses the real duration.
    /// Without one it falls back to oEmbed, which knows title, author and
    /// thumbnail but not length, so the duration comes back as
    /// [`DEFAULT_DURATION_SECONDS`].
    ///
    /// # Errors
    ///
    /// Returns `YouTubeError::InvalidUrl` before any request when the URL
    /// carries no video id, `VideoNotFound` for ids YouTube does not know,
    /// and `HttpStatus`/`Http`/`MalformedResponse` for transport and
    /// decoding failures.
    pub async fn video_info(&self, url: &str) -> Result<VideoInfo, YouTubeError> {
        let video_id = extract_video_id(url).ok_or(YouTubeError::InvalidUrl)?;
        match &self.config {
            Some(config) => self.data_api_info(&video_id, config).await,
            None => {
                tracing::debug!("no YouTube API key, using oEmbed for {video_id}");
                self.oembed_info(&video_id).await
            }
        }
    }

    async fn data_api_info(
        &self,
        video_id: &str,
        config: &YouTubeConfig,
    ) -> Result<VideoInfo, YouTubeError> {
        let url = format!(
            "https://www.googleapis.com/youtube/v3/videos?id={video_id}&part=snippet,contentDetails,statistics&key={key}",
            key = config.api_key
        );
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(YouTubeError::HttpStatus(response.status()));
        }

        let body: ApiVideoList = response.json().await?;
        let item = body
            .items
            .into_iter()
            .next()
            .ok_or(YouTubeError::VideoNotFound)?;
        let duration_seconds = parse_iso8601_duration(&item.content_details.duration)
            .map(f64::from)
            .ok_or(YouTubeError::MalformedResponse)?;

        let thumbnail = item
            .snippet
            .thumbnails
            .and_then(|t| t.high)
            .map_or_else(
                || thumbnail_url(video_id, ThumbnailQuality::High),
                |high| high.url,
            );
        let view_count = item
            .statistics
            .and_then(|s| s.view_count)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0);
        let published_at = item
            .snippet
            .published_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|at| at.with_timezone(&Utc));

        Ok(VideoInfo {
            video_id: video_id.to_owned(),
            title: item.snippet.title,
            description: item.snippet.description.filter(|d| !d.is_empty()),
            thumbnail: Some(thumbnail),
            channel_title: item.snippet.channel_title,
            duration_seconds,
            view_count,
            published_at,
        })
    }

    async fn oembed_info(&self, video_id: &str) -> Result<VideoInfo, YouTubeError> {
        let url = format!(
            "https://www.youtube.com/oembed?url=https://www.youtube.com/watch?v={video_id}&format=json"
        );
        let response = self.client.get(url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(YouTubeError::VideoNotFound);
        }
        if !response.status().is_success() {
            return Err(YouTubeError::HttpStatus(response.status()));
        }

        let body: OEmbedResponse = response.json().await?;
        Ok(VideoInfo {
            video_id: video_id.to_owned(),
            title: body.title,
            description: None,
            thumbnail: body
                .thumbnail_url
                .or_else(|| Some(thumbnail_url(video_id, ThumbnailQuality::High))),
            channel_title: body.author_name,
            duration_seconds: DEFAULT_DURATION_SECONDS,
            view_count: 0,
            published_at: None,
        })
    }
}

//
// ─── RESPONSE SHAPES ───────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
struct ApiVideoList {
    #[serde(default)]
    items: Vec<ApiVideo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiVideo {
    snippet: ApiSnippet,
    content_details: ApiContentDetails,
    statistics: Option<ApiStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSnippet {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    thumbnails: Option<ApiThumbnails>,
    #[serde(default)]
    channel_title: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiThumbnails {
    #[serde(default)]
    high: Option<ApiThumbnail>,
}

#[derive(Debug, Deserialize)]
struct ApiThumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ApiContentDetails {
    duration: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiStatistics {
    #[serde(default)]
    view_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    title: String,
    #[serde(default)]
    author_name: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_ids_from_the_common_link_forms() {
        let cases = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?t=42",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/v/dQw4w9WgXcQ#top",
            "https://www.youtube.com/watch?list=PLabc&v=dQw4w9WgXcQ",
        ];
        for url in cases {
            assert_eq!(
                extract_video_id(url).as_deref(),
                Some("dQw4w9WgXcQ"),
                "url: {url}"
            );
        }
    }

    #[test]
    fn rejects_urls_without_a_plausible_id() {
        assert_eq!(extract_video_id("https://example.com/video"), None);
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=short"), None);
        assert_eq!(extract_video_id("https://www.youtube.com/watch"), None);
        assert_eq!(extract_video_id(""), None);
    }

    #[test]
    fn parses_iso8601_durations() {
        assert_eq!(parse_iso8601_duration("PT1H2M10S"), Some(3730));
        assert_eq!(parse_iso8601_duration("PT15M33S"), Some(933));
        assert_eq!(parse_iso8601_duration("PT45S"), Some(45));
        assert_eq!(parse_iso8601_duration("PT2H"), Some(7200));
        assert_eq!(parse_iso8601_duration("PT"), Some(0));
    }

    #[test]
    fn rejects_durations_outside_the_plain_time_shape() {
        assert_eq!(parse_iso8601_duration("P1DT2H"), None);
        assert_eq!(parse_iso8601_duration("PT3X"), None);
        assert_eq!(parse_iso8601_duration("PT12"), None);
        assert_eq!(parse_iso8601_duration("10:30"), None);
        assert_eq!(parse_iso8601_duration(""), None);
    }

    #[test]
    fn parses_clock_durations() {
        assert_eq!(parse_clock_duration("20:27"), Some(1227));
        assert_eq!(parse_clock_duration("1:09:34"), Some(4174));
        assert_eq!(parse_clock_duration("2:17:47"), Some(8267));
        assert_eq!(parse_clock_duration("00:07"), Some(7));
        assert_eq!(parse_clock_duration("12"), None);
        assert_eq!(parse_clock_duration("a:b"), None);
        assert_eq!(parse_clock_duration("1:2:3:4"), None);
    }

    #[test]
    fn formats_durations_like_a_player() {
        assert_eq!(format_duration(3730.0), "1:02:10");
        assert_eq!(format_duration(933.0), "15:33");
        assert_eq!(format_duration(45.0), "0:45");
        assert_eq!(format_duration(90.5), "1:30");
        assert_eq!(format_duration(3600.0), "1:00:00");
        assert_eq!(format_duration(0.0), "0:00");
    }

    #[test]
    fn clock_durations_round_trip_through_formatting() {
        for raw in ["1:09:34", "15:33", "0:45"] {
            let seconds = parse_clock_duration(raw).unwrap();
            assert_eq!(format_duration(f64::from(seconds)), raw);
        }
    }

    #[test]
    fn thumbnail_urls_follow_the_quality_map() {
        assert_eq!(
            thumbnail_url("dQw4w9WgXcQ", ThumbnailQuality::High),
            "https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg"
        );
        assert_eq!(
            thumbnail_url("dQw4w9WgXcQ", ThumbnailQuality::MaxRes),
            "https://img.youtube.com/vi/dQw4w9WgXcQ/maxresdefault.jpg"
        );
    }

    #[test]
    fn service_without_key_reports_disabled() {
        let service = YouTubeService::new(None);
        assert!(!service.enabled());
    }

    #[tokio::test]
    async fn invalid_urls_fail_before_any_request() {
        let service = YouTubeService::new(None);
        let err = service.video_info("https://example.com/clip").await.unwrap_err();
        assert!(matches!(err, YouTubeError::InvalidUrl));
    }

    #[test]
    fn data_api_payloads_decode() {
        let payload = r#"{
            "items": [{
                "snippet": {
                    "title": "Rust Ownership Explained",
                    "description": "Moves, borrows, lifetimes.",
                    "channelTitle": "Rust Channel",
                    "publishedAt": "2024-05-01T09:30:00Z",
                    "thumbnails": { "high": { "url": "https://img.youtube.com/vi/x/hqdefault.jpg" } }
                },
                "contentDetails": { "duration": "PT12M30S" },
                "statistics": { "viewCount": "1024" }
            }]
        }"#;
        let body: ApiVideoList = serde_json::from_str(payload).unwrap();
        let item = &body.items[0];
        assert_eq!(item.snippet.title, "Rust Ownership Explained");
        assert_eq!(parse_iso8601_duration(&item.content_details.duration), Some(750));
        assert_eq!(
            item.statistics.as_ref().unwrap().view_count.as_deref(),
            Some("1024")
        );
    }

    #[test]
    fn oembed_payloads_decode_without_optional_fields() {
        let payload = r#"{ "title": "Rust Ownership Explained" }"#;
        let body: OEmbedResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(body.title, "Rust Ownership Explained");
        assert!(body.author_name.is_none());
        assert!(body.thumbnail_url.is_none());
    }
}
