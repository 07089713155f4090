use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SublineError>;

#[derive(Error, Debug)]
pub enum SublineError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Transcript JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Transcript not found: {0:?}")]
    TranscriptNotFound(PathBuf),

    #[error("Unsupported transcript format: {0:?}")]
    UnsupportedFormat(PathBuf),

    #[error("No subtitles available to export")]
    EmptyExport,
}
