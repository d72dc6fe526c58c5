mod ids;
mod resume;
mod student;
mod video;
mod watch_record;

pub use ids::{ParseIdError, StudentId, VideoId};

pub use resume::ResumeTarget;
pub use student::{Student, StudentError};
pub use video::{Video, VideoError};
pub use watch_record::{
    COMPLETION_THRESHOLD_PERCENT, ProgressError, ProgressSample, WatchRecord, progress_percent,
};
