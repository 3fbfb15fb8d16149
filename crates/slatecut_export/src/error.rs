use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("media file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("could not run ffprobe: {0}")]
    FfprobeExec(String),

    #[error("ffprobe reported an error: {0}")]
    FfprobeFailed(String),

    #[error("ffmpeg not found on PATH")]
    FfmpegNotFound,

    #[error("ffmpeg failed with {0}")]
    FfmpegFailed(String),

    #[error("no clips to export")]
    NoClips,

    #[error("clip {clip_id} references missing media source {asset_id}")]
    MissingMediaSource { clip_id: Uuid, asset_id: Uuid },

    #[error("export cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;
