//! k-nearest-neighbours classifier (Euclidean, uniform weights).

use serde::{Deserialize, Serialize};

use crate::error::{Result, WeaponError};
use crate::estimator::{Estimator, ParamSet, positive_int, unknown_param};
use crate::linalg::{check_prediction_data, check_training_data, squared_distance};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct KnnState {
    rows: Vec<Vec<f64>>,
    labels: Vec<i64>,
}

impl KnnState {
    fn validate(&self, k: usize) -> Result<()> {
        let width = self.rows.first().map_or(0, Vec::len);
        if self.rows.is_empty() || width == 0 {
            return Err(WeaponError::CorruptState("KNN has no stored rows".into()));
        }
        if self.rows.len() != self.labels.len() {
            return Err(WeaponError::CorruptState(format!(
                "KNN stores {} rows but {} labels",
                self.rows.len(),
                self.labels.len()
            )));
        }
        if self.rows.iter().any(|r| r.len() != width) {
            return Err(WeaponError::CorruptState("KNN rows are ragged".into()));
        }
        if k == 0 || k > self.rows.len() {
            return Err(WeaponError::CorruptState(format!(
                "k={} with {} stored rows",
                k,
                self.rows.len()
            )));
        }
        Ok(())
    }

    /// Winning class and its vote share. Ties go to the smallest code.
    fn vote(&self, row: &[f64], k: usize) -> (i64, f64) {
        let mut by_distance: Vec<(f64, usize)> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, r)| (squared_distance(r, row), i))
            .collect();
        // Equal distances keep training order
        by_distance.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut votes: Vec<(i64, usize)> = Vec::new();
        for &(_, i) in by_distance.iter().take(k) {
            let label = self.labels[i];
            match votes.iter_mut().find(|(l, _)| *l == label) {
                Some((_, count)) => *count += 1,
                None => votes.push((label, 1)),
            }
        }
        votes.sort_by_key(|&(label, _)| label);

        let mut best = votes[0];
        for &candidate in &votes[1..] {
            if candidate.1 > best.1 {
                best = candidate;
            }
        }
        (best.0, best.1 as f64 / k as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnClassifier {
    k: usize,
    #[serde(default)]
    state: Option<KnnState>,
}

impl Default for KnnClassifier {
    fn default() -> Self {
        Self::new(5)
    }
}

impl KnnClassifier {
    pub fn new(k: usize) -> Self {
        Self {
            k: k.max(1),
            state: None,
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Reject a decoded state that prediction could not index safely.
    pub(crate) fn validate(&self) -> Result<()> {
        self.state.as_ref().map_or(Ok(()), |s| s.validate(self.k))
    }

    fn fitted(&self, x: &[Vec<f64>]) -> Result<&KnnState> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| WeaponError::NotTrained(format!("KNN(k={})", self.k)))?;
        check_prediction_data(x, state.rows.first().map_or(0, Vec::len))?;
        Ok(state)
    }
}

impl Estimator for KnnClassifier {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        check_training_data(x, y)?;
        if self.k > x.len() {
            return Err(WeaponError::Fit(format!(
                "k={} exceeds the {} training samples",
                self.k,
                x.len()
            )));
        }
        self.state = Some(KnnState {
            rows: x.to_vec(),
            labels: y.iter().map(|v| v.round() as i64).collect(),
        });
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let state = self.fitted(x)?;
        Ok(x.iter()
            .map(|row| state.vote(row, self.k).0 as f64)
            .collect())
    }

    fn predict_confidence(&self, x: &[Vec<f64>]) -> Option<Result<Vec<f64>>> {
        Some(
            self.fitted(x)
                .map(|state| x.iter().map(|row| state.vote(row, self.k).1).collect()),
        )
    }

    fn set_param(&mut self, name: &str, value: f64) -> Result<()> {
        match name {
            "k" | "n_neighbors" => {
                self.k = positive_int(name, value)?;
                self.state = None;
                Ok(())
            }
            _ => Err(unknown_param("KNN", name)),
        }
    }

    fn params(&self) -> ParamSet {
        vec![("k".to_string(), self.k as f64)]
    }

    fn is_fitted(&self) -> bool {
        self.state.is_some()
    }
}
