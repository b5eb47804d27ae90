//! Scoring functions and evaluation reports.
//!
//! Scores follow the "greater is better" convention used by the
//! hyperparameter search: error metrics are negated when used as a
//! [`Scoring`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use types::LabelMap;

use crate::error::WeaponError;

/// Fraction of predictions whose class code equals the target's.
///
/// Returns 0.0 for empty input.
pub fn accuracy(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let hits = y_true
        .iter()
        .zip(y_pred)
        .filter(|(t, p)| t.round() as i64 == p.round() as i64)
        .count();
    hits as f64 / y_true.len() as f64
}

pub fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / y_true.len() as f64
}

/// Coefficient of determination.
///
/// A constant target scores 1.0 on a perfect fit and 0.0 otherwise.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

// =============================================================================
// Scoring
// =============================================================================

/// Named score used to rank hyperparameter combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
    Accuracy,
    R2,
    NegMeanSquaredError,
}

impl Scoring {
    pub fn score(self, y_true: &[f64], y_pred: &[f64]) -> f64 {
        match self {
            Scoring::Accuracy => accuracy(y_true, y_pred),
            Scoring::R2 => r2_score(y_true, y_pred),
            Scoring::NegMeanSquaredError => -mean_squared_error(y_true, y_pred),
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Scoring::Accuracy => "accuracy",
            Scoring::R2 => "r2",
            Scoring::NegMeanSquaredError => "neg_mean_squared_error",
        }
    }
}

impl fmt::Display for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Scoring {
    type Err = WeaponError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "accuracy" => Ok(Scoring::Accuracy),
            "r2" => Ok(Scoring::R2),
            "neg_mean_squared_error" => Ok(Scoring::NegMeanSquaredError),
            other => Err(WeaponError::UnknownScoring(other.to_string())),
        }
    }
}

// =============================================================================
// Reports
// =============================================================================

/// Counts of (actual, predicted) class pairs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfusionMatrix {
    /// Class codes, sorted; indexes both axes.
    pub classes: Vec<i64>,
    /// `counts[actual][predicted]`.
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn from_predictions(y_true: &[i64], y_pred: &[i64]) -> Self {
        let mut classes: Vec<i64> = y_true.iter().chain(y_pred).copied().collect();
        classes.sort_unstable();
        classes.dedup();

        let mut counts = vec![vec![0; classes.len()]; classes.len()];
        for (t, p) in y_true.iter().zip(y_pred) {
            // Both codes were collected above, so the searches succeed
            if let (Ok(i), Ok(j)) = (classes.binary_search(t), classes.binary_search(p)) {
                counts[i][j] += 1;
            }
        }
        Self { classes, counts }
    }

    fn column_sum(&self, j: usize) -> usize {
        self.counts.iter().map(|row| row[j]).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub code: i64,
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of true samples of this class.
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub per_class: Vec<ClassMetrics>,
    pub confusion: ConfusionMatrix,
}

impl ClassificationReport {
    pub fn new(y_true: &[i64], y_pred: &[i64], label_map: &LabelMap) -> Self {
        let confusion = ConfusionMatrix::from_predictions(y_true, y_pred);
        let hits = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
        let accuracy = if y_true.is_empty() {
            0.0
        } else {
            hits as f64 / y_true.len() as f64
        };

        let per_class = confusion
            .classes
            .iter()
            .enumerate()
            .map(|(i, &code)| {
                let tp = confusion.counts[i][i] as f64;
                let support: usize = confusion.counts[i].iter().sum();
                let predicted = confusion.column_sum(i);
                let precision = ratio(tp, predicted as f64);
                let recall = ratio(tp, support as f64);
                let f1 = ratio(2.0 * precision * recall, precision + recall);
                ClassMetrics {
                    code,
                    label: label_map.label(code),
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        Self {
            accuracy,
            per_class,
            confusion,
        }
    }
}

/// Division that yields 0.0 on an empty denominator.
fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 { num / den } else { 0.0 }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionReport {
    pub mse: f64,
    pub r2: f64,
}

impl RegressionReport {
    pub fn new(y_true: &[f64], y_pred: &[f64]) -> Self {
        Self {
            mse: mean_squared_error(y_true, y_pred),
            r2: r2_score(y_true, y_pred),
        }
    }
}

/// Held-out evaluation of a trained weapon.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "task", rename_all = "lowercase")]
pub enum EvaluationReport {
    Classification(ClassificationReport),
    Regression(RegressionReport),
}

impl EvaluationReport {
    /// Headline score: accuracy or R².
    pub fn score(&self) -> f64 {
        match self {
            EvaluationReport::Classification(r) => r.accuracy,
            EvaluationReport::Regression(r) => r.r2,
        }
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationReport::Classification(r) => {
                writeln!(f, "accuracy: {:.4}", r.accuracy)?;
                writeln!(
                    f,
                    "{:>16} {:>9} {:>9} {:>9} {:>8}",
                    "class", "precision", "recall", "f1", "support"
                )?;
                for m in &r.per_class {
                    writeln!(
                        f,
                        "{:>16} {:>9.3} {:>9.3} {:>9.3} {:>8}",
                        m.label, m.precision, m.recall, m.f1, m.support
                    )?;
                }
                Ok(())
            }
            EvaluationReport::Regression(r) => {
                writeln!(f, "mse: {:.4}", r.mse)?;
                writeln!(f, "r2:  {:.4}", r.r2)
            }
        }
    }
}
