use thiserror::Error;

use crate::model::{ProgressError, StudentError, VideoError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Student(#[from] StudentError),
    #[error(transparent)]
    Video(#[from] VideoError),
}
