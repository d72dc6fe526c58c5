#![forbid(unsafe_code)]

pub mod analytics_service;
pub mod app_services;
pub mod catalog_service;
pub mod error;
pub mod progress_service;
pub mod resume_service;
pub mod student_service;
pub mod youtube;

pub use vidlearn_core::Clock;

pub use analytics_service::{AnalyticsService, HistoryEntry};
pub use app_services::AppServices;
pub use catalog_service::{CatalogService, NewVideo};
pub use error::{
    AnalyticsServiceError, AppServicesError, CatalogServiceError, ProgressServiceError,
    ResumeServiceError, StudentServiceError, YouTubeError,
};
pub use progress_service::{ProgressService, RecordedProgress};
pub use resume_service::ResumeService;
pub use student_service::StudentService;
pub use youtube::{ThumbnailQuality, VideoInfo, YouTubeService};
