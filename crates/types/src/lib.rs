//! Core types for the Ares brain.
//!
//! This crate holds the data shared by the estimator wrappers, the data
//! refinery and the decision engine: the numeric [`Frame`] that every
//! estimator consumes, the [`TaskKind`] of a mission, the caller-supplied
//! [`LabelMap`], and the [`EvaluationResult`] produced by a prediction.

mod evaluation;
mod frame;

pub use evaluation::{ClassificationResult, EvaluationResult, RegressionResult};
pub use frame::{ColumnKey, Frame, FrameError};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Task Kind
// =============================================================================

/// The kind of supervised problem a mission solves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Classification,
    Regression,
}

impl TaskKind {
    /// Human-readable name of the score used to rank models for this task.
    pub fn metric_name(self) -> &'static str {
        match self {
            TaskKind::Classification => "Accuracy",
            TaskKind::Regression => "R2 Score",
        }
    }

    /// Scoring key handed to cross-validated hyperparameter search.
    pub fn scoring_key(self) -> &'static str {
        match self {
            TaskKind::Classification => "accuracy",
            TaskKind::Regression => "r2",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Classification => write!(f, "classification"),
            TaskKind::Regression => write!(f, "regression"),
        }
    }
}

/// Returned when a task kind string is neither classification nor regression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown task kind '{0}' (expected 'classification' or 'regression')")]
pub struct UnknownTaskKind(pub String);

impl FromStr for TaskKind {
    type Err = UnknownTaskKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classification" => Ok(TaskKind::Classification),
            "regression" => Ok(TaskKind::Regression),
            _ => Err(UnknownTaskKind(s.to_string())),
        }
    }
}

// =============================================================================
// Label Map
// =============================================================================

/// Mapping from integer class code to a human-readable label.
///
/// Label maps are mission-specific and always supplied by the caller.
/// Codes absent from the map render as their own string form.
///
/// Serialized as a list of `[code, label]` pairs so the integer codes
/// survive formats whose map keys must be strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<(i64, String)>", into = "Vec<(i64, String)>")]
pub struct LabelMap(BTreeMap<i64, String>);

impl LabelMap {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Insert or replace the label for `code`.
    pub fn insert(&mut self, code: i64, label: impl Into<String>) {
        self.0.insert(code, label.into());
    }

    /// Label for `code` if one was registered.
    pub fn get(&self, code: i64) -> Option<&str> {
        self.0.get(&code).map(String::as_str)
    }

    /// Resolve `code` to its label, falling back to the code itself.
    pub fn label(&self, code: i64) -> String {
        self.get(code)
            .map(str::to_string)
            .unwrap_or_else(|| code.to_string())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &str)> {
        self.0.iter().map(|(code, label)| (*code, label.as_str()))
    }
}

impl<S: Into<String>> FromIterator<(i64, S)> for LabelMap {
    fn from_iter<I: IntoIterator<Item = (i64, S)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(code, label)| (code, label.into()))
                .collect(),
        )
    }
}

impl From<Vec<(i64, String)>> for LabelMap {
    fn from(pairs: Vec<(i64, String)>) -> Self {
        pairs.into_iter().collect()
    }
}

impl From<LabelMap> for Vec<(i64, String)> {
    fn from(map: LabelMap) -> Self {
        map.0.into_iter().collect()
    }
}

impl<S: Into<String>, const N: usize> From<[(i64, S); N]> for LabelMap {
    fn from(pairs: [(i64, S); N]) -> Self {
        pairs.into_iter().collect()
    }
}
