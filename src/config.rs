//! Mission files for the `ares solve` command.
//!
//! ```toml
//! task = "classification"
//! threshold = 0.9
//!
//! [data]
//! path = "data/cancer.json"
//! target = "diagnosis"
//! test_size = 0.2
//! seed = 42
//!
//! [labels]
//! "0" = "Malignant"
//! "1" = "Benign"
//!
//! [cleaning]
//! drop_missing = true
//! scale = "standard"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use refinery::ScaleMethod;
use types::LabelMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionFile {
    /// "classification" or "regression"; parsed by the engine.
    pub task: String,
    /// Overrides the engine's default recall threshold.
    #[serde(default)]
    pub threshold: Option<f64>,
    /// Overrides the engine's memory directory.
    #[serde(default)]
    pub memory_path: Option<PathBuf>,
    pub data: DataConfig,
    /// Class code to label. TOML keys are strings, so codes are parsed.
    #[serde(default)]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub cleaning: CleaningConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// JSON table, resolved against the mission file's directory.
    pub path: PathBuf,
    /// Target column, named as it reads after cleaning.
    pub target: String,
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    pub drop_missing: bool,
    pub remove_duplicates: bool,
    pub clean_column_names: bool,
    /// Scale features, fitted on the training split only.
    pub scale: Option<ScaleMethod>,
}

fn default_test_size() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

impl MissionFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading mission file {}", path.display()))?;
        let mut mission: MissionFile = toml::from_str(&contents)
            .with_context(|| format!("parsing mission file {}", path.display()))?;
        if let Some(dir) = path.parent() {
            if mission.data.path.is_relative() {
                mission.data.path = dir.join(&mission.data.path);
            }
        }
        Ok(mission)
    }

    /// The `[labels]` table with integer codes, if present.
    pub fn label_map(&self) -> Result<Option<LabelMap>> {
        let Some(labels) = &self.labels else {
            return Ok(None);
        };
        let mut map = LabelMap::new();
        for (code, label) in labels {
            let code: i64 = code
                .trim()
                .parse()
                .with_context(|| format!("label code '{}' is not an integer", code))?;
            map.insert(code, label.clone());
        }
        Ok(Some(map))
    }
}
