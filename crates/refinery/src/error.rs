//! Error types for the data refinery.

use types::FrameError;

pub type Result<T> = std::result::Result<T, RefineryError>;

#[derive(Debug, thiserror::Error)]
pub enum RefineryError {
    #[error("invalid table: {0}")]
    Frame(#[from] FrameError),

    /// Train/test split parameters that leave one side empty.
    #[error("invalid split: {0}")]
    InvalidSplit(String),

    /// Scaler applied to a table of a different width.
    #[error("scaler fitted on {expected} columns, got {found}")]
    Width { expected: usize, found: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed table file: {0}")]
    Json(#[from] serde_json::Error),
}
