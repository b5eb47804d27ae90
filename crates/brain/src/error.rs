//! Error types for the decision engine.
//!
//! Only contract violations by the caller surface as errors. Failures of a
//! single artifact or candidate are logged and skipped, and a mission with
//! no usable model resolves to `Ok(None)`.

use std::path::PathBuf;

use types::UnknownTaskKind;

pub type Result<T> = std::result::Result<T, BrainError>;

#[derive(Debug, thiserror::Error)]
pub enum BrainError {
    /// Classification missions need the caller's code-to-label mapping.
    #[error("classification missions require a label map")]
    MissingLabelMap,

    #[error(transparent)]
    UnknownTask(#[from] UnknownTaskKind),

    /// The memory directory could not be created or listed.
    #[error("memory directory {}: {source}", .path.display())]
    Registry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
