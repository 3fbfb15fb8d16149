use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid project file: {0}")]
    InvalidProjectFile(String),

    #[error("nothing left to undo")]
    NothingToUndo,

    #[error("nothing left to redo")]
    NothingToRedo,
}

pub type Result<T> = std::result::Result<T, CoreError>;
