//! RBF support vector classifier, one-vs-rest.
//!
//! Each class gets a binary soft-margin machine trained by dual coordinate
//! descent. The bias is absorbed by using `K(a, b) + 1` as the kernel, so
//! the dual has only the box constraint `0 <= alpha <= C`. Predictions take
//! the class with the largest decision value; confidence is the largest
//! softmax probability over decision values.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WeaponError};
use crate::estimator::{Estimator, ParamGrid, ParamSet, positive_float, positive_int, unknown_param};
use crate::linalg::{
    argmax, check_prediction_data, check_training_data, class_codes, rbf_kernel, scale_gamma,
    softmax,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SvmState {
    classes: Vec<i64>,
    n_features: usize,
    gamma: f64,
    /// Rows with a non-zero multiplier in at least one machine.
    support: Vec<Vec<f64>>,
    /// `alpha_j * y_j` per class, aligned with `support`.
    dual_coef: Vec<Vec<f64>>,
}

impl SvmState {
    fn validate(&self) -> Result<()> {
        if self.classes.len() < 2 || self.dual_coef.len() != self.classes.len() {
            return Err(WeaponError::CorruptState(format!(
                "SVM has {} classes but {} machines",
                self.classes.len(),
                self.dual_coef.len()
            )));
        }
        if self.dual_coef.iter().any(|c| c.len() != self.support.len()) {
            return Err(WeaponError::CorruptState(
                "SVM dual coefficients are not aligned with support vectors".into(),
            ));
        }
        if self.support.iter().any(|sv| sv.len() != self.n_features) {
            return Err(WeaponError::CorruptState(format!(
                "SVM support vectors do not have {} features",
                self.n_features
            )));
        }
        Ok(())
    }

    fn decision(&self, row: &[f64]) -> Vec<f64> {
        let kernel: Vec<f64> = self
            .support
            .iter()
            .map(|sv| rbf_kernel(sv, row, self.gamma) + 1.0)
            .collect();
        self.dual_coef
            .iter()
            .map(|coef| coef.iter().zip(&kernel).map(|(a, k)| a * k).sum())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvmClassifier {
    c: f64,
    gamma: Option<f64>,
    /// Whether [`Estimator::predict_confidence`] reports probabilities.
    probability: bool,
    max_iter: usize,
    tol: f64,
    #[serde(default)]
    state: Option<SvmState>,
}

impl Default for SvmClassifier {
    fn default() -> Self {
        Self {
            c: 1.0,
            gamma: None,
            probability: true,
            max_iter: 1000,
            tol: 1e-4,
            state: None,
        }
    }
}

impl SvmClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = Some(gamma);
        self
    }

    pub fn with_probability(mut self, probability: bool) -> Self {
        self.probability = probability;
        self
    }

    pub fn c(&self) -> f64 {
        self.c
    }

    pub fn n_support(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.support.len())
    }

    /// Raw one-vs-rest decision values per row.
    pub fn decision_function(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| WeaponError::NotTrained("SVM".into()))?;
        check_prediction_data(x, state.n_features)?;
        Ok(x.iter().map(|row| state.decision(row)).collect())
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.state.as_ref().map_or(Ok(()), SvmState::validate)
    }

    /// Solve one binary machine; returns `alpha_j * y_j` for every sample.
    fn solve_binary(&self, kernel: &[Vec<f64>], signs: &[f64]) -> Vec<f64> {
        let n = signs.len();
        let mut alpha = vec![0.0; n];
        // f_i = sum_j alpha_j y_j Q_ij
        let mut f = vec![0.0; n];

        for _ in 0..self.max_iter {
            let mut max_step: f64 = 0.0;
            for i in 0..n {
                let qii = kernel[i][i];
                let grad = signs[i] * f[i] - 1.0;
                let updated = (alpha[i] - grad / qii).clamp(0.0, self.c);
                let delta = updated - alpha[i];
                if delta != 0.0 {
                    alpha[i] = updated;
                    let scaled = delta * signs[i];
                    for (fj, kij) in f.iter_mut().zip(&kernel[i]) {
                        *fj += scaled * kij;
                    }
                    max_step = max_step.max(delta.abs());
                }
            }
            if max_step < self.tol {
                break;
            }
        }

        alpha.iter().zip(signs).map(|(a, s)| a * s).collect()
    }
}

impl Estimator for SvmClassifier {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        let n_features = check_training_data(x, y)?;
        let classes = class_codes(y);
        if classes.len() < 2 {
            return Err(WeaponError::Fit(format!(
                "SVM needs at least 2 classes, got {}",
                classes.len()
            )));
        }

        let gamma = self.gamma.unwrap_or_else(|| scale_gamma(x));
        let kernel: Vec<Vec<f64>> = x
            .iter()
            .map(|a| x.iter().map(|b| rbf_kernel(a, b, gamma) + 1.0).collect())
            .collect();

        let full_coef: Vec<Vec<f64>> = classes
            .iter()
            .map(|&class| {
                let signs: Vec<f64> = y
                    .iter()
                    .map(|v| if v.round() as i64 == class { 1.0 } else { -1.0 })
                    .collect();
                self.solve_binary(&kernel, &signs)
            })
            .collect();

        let keep: Vec<usize> = (0..x.len())
            .filter(|&j| full_coef.iter().any(|coef| coef[j] != 0.0))
            .collect();
        let support = keep.iter().map(|&j| x[j].clone()).collect();
        let dual_coef = full_coef
            .iter()
            .map(|coef| keep.iter().map(|&j| coef[j]).collect())
            .collect();

        self.state = Some(SvmState {
            classes,
            n_features,
            gamma,
            support,
            dual_coef,
        });
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| WeaponError::NotTrained("SVM".into()))?;
        check_prediction_data(x, state.n_features)?;
        Ok(x.iter()
            .map(|row| state.classes[argmax(&state.decision(row))] as f64)
            .collect())
    }

    fn predict_confidence(&self, x: &[Vec<f64>]) -> Option<Result<Vec<f64>>> {
        if !self.probability {
            return None;
        }
        Some(self.decision_function(x).map(|decisions| {
            decisions
                .iter()
                .map(|d| softmax(d).into_iter().fold(0.0, f64::max))
                .collect()
        }))
    }

    fn param_grid(&self) -> Option<ParamGrid> {
        Some(ParamGrid::new().with("c", vec![0.1, 1.0, 10.0]))
    }

    fn set_param(&mut self, name: &str, value: f64) -> Result<()> {
        match name {
            "c" => self.c = positive_float(name, value)?,
            "gamma" => self.gamma = Some(positive_float(name, value)?),
            "max_iter" => self.max_iter = positive_int(name, value)?,
            _ => return Err(unknown_param("SVM", name)),
        }
        self.state = None;
        Ok(())
    }

    fn params(&self) -> ParamSet {
        let mut params = vec![("c".to_string(), self.c)];
        if let Some(gamma) = self.gamma {
            params.push(("gamma".to_string(), gamma));
        }
        params
    }

    fn is_fitted(&self) -> bool {
        self.state.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> (Vec<Vec<f64>>, Vec<f64>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..12 {
            let t = i as f64 * 0.1;
            x.push(vec![-2.0 + t, -2.0 - t]);
            y.push(0.0);
            x.push(vec![2.0 - t, 2.0 + t]);
            y.push(1.0);
        }
        (x, y)
    }

    #[test]
    fn test_separates_two_blobs() {
        let (x, y) = two_blobs();
        let mut model = SvmClassifier::new();
        model.fit(&x, &y).unwrap();

        assert_eq!(model.predict(&x).unwrap(), y);
        assert_eq!(
            model.predict(&[vec![-2.5, -2.0], vec![2.5, 2.0]]).unwrap(),
            vec![0.0, 1.0]
        );
        assert!(model.n_support().unwrap() <= x.len());
    }

    #[test]
    fn test_three_classes() {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for (label, cx) in [(0.0, -6.0), (1.0, 0.0), (2.0, 6.0)] {
            for j in 0..8 {
                x.push(vec![cx + j as f64 * 0.1]);
                y.push(label);
            }
        }
        let mut model = SvmClassifier::new().with_c(10.0);
        model.fit(&x, &y).unwrap();
        assert_eq!(
            model.predict(&[vec![-5.8], vec![0.3], vec![6.2]]).unwrap(),
            vec![0.0, 1.0, 2.0]
        );
    }

    #[test]
    fn test_confidence_respects_probability_flag() {
        let (x, y) = two_blobs();
        let mut with_proba = SvmClassifier::new();
        with_proba.fit(&x, &y).unwrap();
        let conf = with_proba.predict_confidence(&x).unwrap().unwrap();
        assert!(conf.iter().all(|c| *c >= 0.5 && *c <= 1.0));

        let mut without = SvmClassifier::new().with_probability(false);
        without.fit(&x, &y).unwrap();
        assert!(without.predict_confidence(&x).is_none());
    }

    #[test]
    fn test_single_class_is_rejected() {
        let err = SvmClassifier::new()
            .fit(&[vec![0.0], vec![1.0]], &[2.0, 2.0])
            .unwrap_err();
        assert!(matches!(err, WeaponError::Fit(_)));
    }

    #[test]
    fn test_validate_rejects_misaligned_machines() {
        let (x, y) = two_blobs();
        let mut model = SvmClassifier::new();
        model.fit(&x, &y).unwrap();
        assert!(model.validate().is_ok());

        let mut missing = model.clone();
        if let Some(state) = missing.state.as_mut() {
            state.dual_coef.pop();
        }
        assert!(matches!(missing.validate(), Err(WeaponError::CorruptState(_))));

        let mut short = model.clone();
        if let Some(state) = short.state.as_mut() {
            state.dual_coef[0].push(1.0);
        }
        assert!(short.validate().is_err());
    }
}
