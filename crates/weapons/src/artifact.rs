//! On-disk model artifacts.
//!
//! An artifact is a JSON file holding a fitted estimator, the feature names
//! it was trained on, and metadata. Three shapes are accepted when reading,
//! tried in this order:
//!
//! 1. a structured bundle `{model, feature_names, meta}` (what [`write_artifact`]
//!    produces);
//! 2. a bare serialized [`Weapon`];
//! 3. a bare serialized [`Model`] with no schema or metadata.
//!
//! All three decode into one [`ModelArtifact`]. Fitted state is validated
//! after decoding, so a file that parses but could not predict is an error
//! here. Files are only ever created, never rewritten: every save gets a
//! fresh name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use types::{ColumnKey, LabelMap, TaskKind};

use crate::error::Result;
use crate::models::Model;
use crate::weapon::{Tuning, Weapon};

/// File extensions the registry treats as artifacts.
pub const ARTIFACT_EXTENSIONS: &[&str] = &["json", "weapon"];

/// Metadata stored next to the estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    /// Display name of the weapon that produced the artifact.
    pub name: String,
    pub saved_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_map: Option<LabelMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuning: Option<Tuning>,
}

/// The structured artifact shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactBundle {
    pub model: Model,
    pub feature_names: Vec<ColumnKey>,
    pub meta: ArtifactMeta,
}

/// Every shape an artifact file may take.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum StoredArtifact {
    Bundle(ArtifactBundle),
    Wrapper(Weapon),
    Estimator(Model),
}

/// A decoded artifact, whatever shape it was stored in.
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    pub name: String,
    pub path: PathBuf,
    /// `None` for legacy shapes, which carry no timestamp.
    pub saved_at: Option<DateTime<Utc>>,
    pub weapon: Weapon,
}

impl ModelArtifact {
    fn from_stored(stored: StoredArtifact, path: &Path) -> Self {
        match stored {
            StoredArtifact::Bundle(bundle) => {
                let saved_at = Some(bundle.meta.saved_at);
                let weapon = Weapon::from_bundle(bundle);
                Self {
                    name: weapon.name().to_string(),
                    path: path.to_path_buf(),
                    saved_at,
                    weapon,
                }
            }
            StoredArtifact::Wrapper(weapon) => Self {
                name: weapon.name().to_string(),
                path: path.to_path_buf(),
                saved_at: None,
                weapon,
            },
            StoredArtifact::Estimator(model) => {
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| model.model_type().to_string());
                let weapon = Weapon::from_bare_model(name.clone(), model);
                Self {
                    name,
                    path: path.to_path_buf(),
                    saved_at: None,
                    weapon,
                }
            }
        }
    }
}

/// True if `path` has a recognized artifact extension.
pub fn is_artifact_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ARTIFACT_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Decode an artifact file in any supported shape.
pub fn read_artifact(path: &Path) -> Result<ModelArtifact> {
    let reader = BufReader::new(fs::File::open(path)?);
    let stored: StoredArtifact = serde_json::from_reader(reader)?;
    let artifact = ModelArtifact::from_stored(stored, path);
    artifact.weapon.estimator().validate()?;
    Ok(artifact)
}

/// Write `bundle` to a new file in `dir` and return its path.
///
/// The file name is `best_{name}_{timestamp}_{suffix}.json`. The file is
/// opened with `create_new`, so an existing artifact is never overwritten.
pub fn write_artifact(bundle: &ArtifactBundle, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let file_name = format!(
        "best_{}_{}_{}.json",
        slug(&bundle.meta.name),
        bundle.meta.saved_at.format("%Y%m%d_%H%M%S"),
        &suffix[..8]
    );
    let path = dir.join(file_name);

    let file = OpenOptions::new().write(true).create_new(true).open(&path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, bundle)?;
    writer.flush()?;
    Ok(path)
}

/// File-name-safe form of a display name: `PolyRegression(deg=2)` becomes
/// `PolyRegression_deg_2`.
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '-' {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "model".to_string()
    } else {
        trimmed.to_string()
    }
}
