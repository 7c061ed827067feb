use crate::jobs::JobState;
use thiserror::Error;

/// Request rejected before any job exists.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("URL is required")]
    MissingUrl,
    #[error("Unsupported URL: {0}")]
    UnsupportedUrl(String),
    #[error("This URL is a playlist. Use download_playlist instead.")]
    PlaylistUrl,
    #[error("This URL is not a playlist. Use download_video instead.")]
    NotAPlaylist,
    #[error("Invalid quality '{0}', expected a label such as 720p")]
    InvalidQuality(String),
}

/// Failure reported by (or while talking to) the media extraction tool.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("{0}")]
    Failed(String),
    #[error("Failed to run {program}: {message}")]
    Spawn { program: String, message: String },
    #[error("Unreadable extractor output: {0}")]
    InvalidOutput(String),
    #[error("Transfer cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Failed to fetch metadata: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("Job ID not found: {0}")]
    NotFound(String),
    #[error("Cannot cancel a job with state: {state}")]
    Rejected { job_id: String, state: JobState },
}
