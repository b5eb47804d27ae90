//! Multinomial logistic regression with L2 penalty.
//!
//! Features are standardized before fitting. The penalized mean
//! cross-entropy
//!
//! ```text
//! L(W, b) = mean_i CE(softmax(W x_i + b), y_i) + ||W||^2 / (2 * C * n)
//! ```
//!
//! is minimized by full-batch gradient descent with step `1 / L`, where
//! `L = 0.5 * (d + 1) + 1 / (C * n)` bounds the Hessian on standardized
//! inputs. Iteration stops once the largest gradient component drops
//! below `tol`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WeaponError};
use crate::estimator::{Estimator, ParamGrid, ParamSet, positive_float, positive_int, unknown_param};
use crate::linalg::{
    Standardizer, argmax, check_prediction_data, check_training_data, class_codes, dot, softmax,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LogisticState {
    classes: Vec<i64>,
    standardizer: Standardizer,
    /// One weight row per class.
    weights: Vec<Vec<f64>>,
    biases: Vec<f64>,
}

impl LogisticState {
    fn n_features(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }

    fn validate(&self) -> Result<()> {
        let n_classes = self.classes.len();
        if n_classes < 2 {
            return Err(WeaponError::CorruptState(format!(
                "logistic model has {} classes",
                n_classes
            )));
        }
        if self.weights.len() != n_classes || self.biases.len() != n_classes {
            return Err(WeaponError::CorruptState(format!(
                "logistic model has {} classes, {} weight rows and {} biases",
                n_classes,
                self.weights.len(),
                self.biases.len()
            )));
        }
        let width = self.n_features();
        if width == 0
            || self.weights.iter().any(|w| w.len() != width)
            || !self.standardizer.covers(width)
        {
            return Err(WeaponError::CorruptState(
                "logistic weights and scaling disagree on feature count".into(),
            ));
        }
        Ok(())
    }

    fn probabilities(&self, row: &[f64]) -> Vec<f64> {
        let z = self.standardizer.transform_row(row);
        let scores: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.biases)
            .map(|(w, b)| dot(w, &z) + b)
            .collect();
        softmax(&scores)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    c: f64,
    max_iter: usize,
    tol: f64,
    #[serde(default)]
    state: Option<LogisticState>,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            tol: 1e-6,
            state: None,
        }
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn c(&self) -> f64 {
        self.c
    }

    pub fn classes(&self) -> Option<&[i64]> {
        self.state.as_ref().map(|s| s.classes.as_slice())
    }

    /// Class probabilities per row, columns in [`Self::classes`] order.
    pub fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let state = self.fitted()?;
        check_prediction_data(x, state.n_features())?;
        Ok(x.iter().map(|row| state.probabilities(row)).collect())
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.state.as_ref().map_or(Ok(()), LogisticState::validate)
    }

    fn fitted(&self) -> Result<&LogisticState> {
        self.state
            .as_ref()
            .ok_or_else(|| WeaponError::NotTrained("LogisticRegression".into()))
    }
}

impl Estimator for LogisticRegression {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        let d = check_training_data(x, y)?;
        let classes = class_codes(y);
        if classes.len() < 2 {
            return Err(WeaponError::Fit(format!(
                "LogisticRegression needs at least 2 classes, got {}",
                classes.len()
            )));
        }

        let n = x.len() as f64;
        let k = classes.len();
        let standardizer = Standardizer::fit(x);
        let z = standardizer.transform(x);
        let targets: Vec<usize> = y
            .iter()
            .map(|v| classes.partition_point(|&c| c < v.round() as i64))
            .collect();

        let penalty = 1.0 / (self.c * n);
        let step = 1.0 / (0.5 * (d as f64 + 1.0) + penalty);
        let mut weights = vec![vec![0.0; d]; k];
        let mut biases = vec![0.0; k];

        for _ in 0..self.max_iter {
            let mut grad_w = vec![vec![0.0; d]; k];
            let mut grad_b = vec![0.0; k];

            for (row, &target) in z.iter().zip(&targets) {
                let scores: Vec<f64> = weights
                    .iter()
                    .zip(&biases)
                    .map(|(w, b)| dot(w, row) + b)
                    .collect();
                let probs = softmax(&scores);
                for (class, p) in probs.iter().enumerate() {
                    let residual = (p - if class == target { 1.0 } else { 0.0 }) / n;
                    grad_b[class] += residual;
                    for (g, v) in grad_w[class].iter_mut().zip(row) {
                        *g += residual * v;
                    }
                }
            }

            let mut max_grad: f64 = 0.0;
            for class in 0..k {
                for (g, w) in grad_w[class].iter_mut().zip(&weights[class]) {
                    *g += penalty * w;
                    max_grad = max_grad.max(g.abs());
                }
                max_grad = max_grad.max(grad_b[class].abs());
            }
            if max_grad < self.tol {
                break;
            }

            for class in 0..k {
                for (w, g) in weights[class].iter_mut().zip(&grad_w[class]) {
                    *w -= step * g;
                }
                biases[class] -= step * grad_b[class];
            }
        }

        self.state = Some(LogisticState {
            classes,
            standardizer,
            weights,
            biases,
        });
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let state = self.fitted()?;
        check_prediction_data(x, state.n_features())?;
        Ok(x.iter()
            .map(|row| state.classes[argmax(&state.probabilities(row))] as f64)
            .collect())
    }

    fn predict_confidence(&self, x: &[Vec<f64>]) -> Option<Result<Vec<f64>>> {
        Some(self.predict_proba(x).map(|probs| {
            probs
                .iter()
                .map(|p| p.iter().copied().fold(0.0, f64::max))
                .collect()
        }))
    }

    fn param_grid(&self) -> Option<ParamGrid> {
        Some(ParamGrid::new().with("c", vec![0.1, 1.0, 10.0]))
    }

    fn set_param(&mut self, name: &str, value: f64) -> Result<()> {
        match name {
            "c" => self.c = positive_float(name, value)?,
            "max_iter" => self.max_iter = positive_int(name, value)?,
            _ => return Err(unknown_param("LogisticRegression", name)),
        }
        self.state = None;
        Ok(())
    }

    fn params(&self) -> ParamSet {
        vec![
            ("c".to_string(), self.c),
            ("max_iter".to_string(), self.max_iter as f64),
        ]
    }

    fn is_fitted(&self) -> bool {
        self.state.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three well separated clusters on a line, labelled 0, 1, 2.
    fn clusters() -> (Vec<Vec<f64>>, Vec<f64>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for (label, center) in [(0.0, -5.0), (1.0, 0.0), (2.0, 5.0)] {
            for j in 0..10 {
                x.push(vec![center + (j as f64 - 4.5) * 0.1, (j % 2) as f64]);
                y.push(label);
            }
        }
        (x, y)
    }

    #[test]
    fn test_separates_three_classes() {
        let (x, y) = clusters();
        let mut model = LogisticRegression::new().with_c(10.0);
        model.fit(&x, &y).unwrap();

        assert_eq!(model.classes(), Some(&[0, 1, 2][..]));
        let pred = model.predict(&[vec![-5.0, 0.0], vec![0.1, 1.0], vec![4.8, 0.0]]).unwrap();
        assert_eq!(pred, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (x, y) = clusters();
        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();

        for row in model.predict_proba(&x).unwrap() {
            assert_eq!(row.len(), 3);
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
        let conf = model.predict_confidence(&x).unwrap().unwrap();
        assert!(conf.iter().all(|c| *c > 1.0 / 3.0 && *c <= 1.0));
    }

    #[test]
    fn test_non_contiguous_class_codes() {
        let x = vec![vec![0.0], vec![0.2], vec![5.0], vec![5.2]];
        let y = vec![3.0, 3.0, 7.0, 7.0];
        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&[vec![0.1], vec![5.1]]).unwrap(), vec![3.0, 7.0]);
    }

    #[test]
    fn test_single_class_is_rejected() {
        let err = LogisticRegression::new()
            .fit(&[vec![1.0], vec![2.0]], &[1.0, 1.0])
            .unwrap_err();
        assert!(matches!(err, WeaponError::Fit(_)));
    }

    #[test]
    fn test_validate_rejects_misaligned_weights() {
        let (x, y) = clusters();
        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();
        assert!(model.validate().is_ok());

        let mut dropped = model.clone();
        if let Some(state) = dropped.state.as_mut() {
            state.biases.pop();
        }
        assert!(matches!(dropped.validate(), Err(WeaponError::CorruptState(_))));

        let mut narrow = model.clone();
        if let Some(state) = narrow.state.as_mut() {
            state.weights[1].pop();
        }
        assert!(narrow.validate().is_err());
    }
}
