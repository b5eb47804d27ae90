//! Error types for estimator wrappers.

use types::{ColumnKey, FrameError};

/// Result type for weapon operations.
pub type Result<T> = std::result::Result<T, WeaponError>;

/// Errors raised while fitting, predicting, tuning or persisting a weapon.
#[derive(Debug, thiserror::Error)]
pub enum WeaponError {
    /// Input has the wrong shape or contents (empty, ragged, NaN, length mismatch).
    #[error("invalid input: {0}")]
    InputShape(String),

    #[error("invalid table: {0}")]
    Frame(#[from] FrameError),

    /// Prediction requested before the wrapper was fit.
    #[error("{0}: model is not trained")]
    NotTrained(String),

    /// Input lacks named columns recorded at training time.
    #[error("{model}: missing columns [{}]", join_keys(.missing))]
    SchemaMismatch {
        model: String,
        missing: Vec<ColumnKey>,
    },

    /// The underlying estimator could not be fit.
    #[error("fit failed: {0}")]
    Fit(String),

    /// Decoded model state is internally inconsistent.
    #[error("corrupt model state: {0}")]
    CorruptState(String),

    #[error("invalid hyperparameter: {0}")]
    InvalidParam(String),

    #[error("unknown scoring key '{0}'")]
    UnknownScoring(String),

    #[error("hyperparameter search failed: {0}")]
    Search(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

fn join_keys(keys: &[ColumnKey]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
