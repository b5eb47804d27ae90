//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Settings shared by every mission a [`crate::Brain`] runs.
///
/// # Example
///
/// ```
/// use brain::BrainConfig;
///
/// let config = BrainConfig::default()
///     .memory_path("/tmp/ares_memory")
///     .default_threshold(0.9)
///     .cv_folds(5);
/// assert_eq!(config.cv_folds, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrainConfig {
    /// Directory holding remembered model artifacts.
    pub memory_path: PathBuf,
    /// Recall threshold used when a mission does not set its own.
    pub default_threshold: f64,
    /// Folds for cross-validated hyperparameter search.
    pub cv_folds: usize,
    /// Score grid combinations on the calling thread only.
    pub force_sequential_search: bool,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            memory_path: PathBuf::from("./brain_memory/"),
            default_threshold: 0.85,
            cv_folds: 3,
            force_sequential_search: false,
        }
    }
}

impl BrainConfig {
    /// Read a TOML config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder
    // ─────────────────────────────────────────────────────────────────────────

    pub fn memory_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.memory_path = path.into();
        self
    }

    pub fn default_threshold(mut self, threshold: f64) -> Self {
        self.default_threshold = threshold;
        self
    }

    pub fn cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn force_sequential_search(mut self, sequential: bool) -> Self {
        self.force_sequential_search = sequential;
        self
    }
}
