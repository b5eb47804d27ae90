//! Epsilon support vector regression with an RBF kernel.
//!
//! The dual is solved by cyclic coordinate descent with the intercept
//! fixed at `mean(y)`:
//!
//! ```text
//! min  0.5 * b'Kb - t'b + eps * |b|_1    s.t.  -C <= b_i <= C
//! ```
//!
//! where `t = y - mean(y)`. Each coordinate step is a soft-threshold
//! followed by a box clip. Only samples with a non-zero coefficient are
//! kept as support vectors.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WeaponError};
use crate::estimator::{Estimator, ParamGrid, ParamSet, positive_float, positive_int, unknown_param};
use crate::linalg::{check_prediction_data, check_training_data, rbf_kernel, scale_gamma};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SvrState {
    n_features: usize,
    support: Vec<Vec<f64>>,
    coefficients: Vec<f64>,
    intercept: f64,
    gamma: f64,
}

/// RBF-kernel epsilon-SVR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Svr {
    c: f64,
    epsilon: f64,
    /// Kernel width; `None` means `1 / (n_features * Var(X))`.
    gamma: Option<f64>,
    max_iter: usize,
    tol: f64,
    #[serde(default)]
    state: Option<SvrState>,
}

impl Default for Svr {
    fn default() -> Self {
        Self {
            c: 1.0,
            epsilon: 0.1,
            gamma: None,
            max_iter: 1000,
            tol: 1e-4,
            state: None,
        }
    }
}

impl Svr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = Some(gamma);
        self
    }

    pub fn c(&self) -> f64 {
        self.c
    }

    /// Number of support vectors retained after fitting.
    pub fn n_support(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.support.len())
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let Some(state) = &self.state else {
            return Ok(());
        };
        if state.support.len() != state.coefficients.len() {
            return Err(WeaponError::CorruptState(format!(
                "SVR stores {} support vectors but {} coefficients",
                state.support.len(),
                state.coefficients.len()
            )));
        }
        if state.n_features == 0 || state.support.iter().any(|sv| sv.len() != state.n_features) {
            return Err(WeaponError::CorruptState(format!(
                "SVR support vectors do not have {} features",
                state.n_features
            )));
        }
        Ok(())
    }
}

#[inline]
fn soft_threshold(z: f64, lambda: f64) -> f64 {
    if z > lambda {
        z - lambda
    } else if z < -lambda {
        z + lambda
    } else {
        0.0
    }
}

impl Estimator for Svr {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        check_training_data(x, y)?;
        let n = x.len();
        let gamma = self.gamma.unwrap_or_else(|| scale_gamma(x));
        let intercept = y.iter().sum::<f64>() / n as f64;
        let target: Vec<f64> = y.iter().map(|v| v - intercept).collect();

        let kernel: Vec<Vec<f64>> = x
            .iter()
            .map(|a| x.iter().map(|b| rbf_kernel(a, b, gamma)).collect())
            .collect();

        let mut beta = vec![0.0; n];
        // Running decision values (K * beta)
        let mut f = vec![0.0; n];

        for _ in 0..self.max_iter {
            let mut max_step: f64 = 0.0;
            for i in 0..n {
                let kii = kernel[i][i];
                if kii <= 0.0 {
                    continue;
                }
                let grad = f[i] - target[i];
                let z = beta[i] - grad / kii;
                let updated = soft_threshold(z, self.epsilon / kii).clamp(-self.c, self.c);
                let delta = updated - beta[i];
                if delta != 0.0 {
                    beta[i] = updated;
                    for (fj, kij) in f.iter_mut().zip(&kernel[i]) {
                        *fj += delta * kij;
                    }
                    max_step = max_step.max(delta.abs());
                }
            }
            if max_step < self.tol {
                break;
            }
        }

        let (support, coefficients): (Vec<Vec<f64>>, Vec<f64>) = x
            .iter()
            .zip(beta)
            .filter(|(_, b)| *b != 0.0)
            .map(|(row, b)| (row.clone(), b))
            .unzip();

        self.state = Some(SvrState {
            n_features: x[0].len(),
            support,
            coefficients,
            intercept,
            gamma,
        });
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| WeaponError::NotTrained("SVR".into()))?;
        check_prediction_data(x, state.n_features)?;
        Ok(x.iter()
            .map(|row| {
                state
                    .support
                    .iter()
                    .zip(&state.coefficients)
                    .map(|(sv, b)| b * rbf_kernel(sv, row, state.gamma))
                    .sum::<f64>()
                    + state.intercept
            })
            .collect())
    }

    fn param_grid(&self) -> Option<ParamGrid> {
        Some(ParamGrid::new().with("c", vec![0.1, 1.0, 10.0]))
    }

    fn set_param(&mut self, name: &str, value: f64) -> Result<()> {
        match name {
            "c" => self.c = positive_float(name, value)?,
            "epsilon" if value.is_finite() && value >= 0.0 => self.epsilon = value,
            "epsilon" => {
                return Err(WeaponError::InvalidParam(format!(
                    "epsilon must be >= 0, got {}",
                    value
                )));
            }
            "gamma" => self.gamma = Some(positive_float(name, value)?),
            "max_iter" => self.max_iter = positive_int(name, value)?,
            _ => return Err(unknown_param("SVR", name)),
        }
        self.state = None;
        Ok(())
    }

    fn params(&self) -> ParamSet {
        let mut params = vec![
            ("c".to_string(), self.c),
            ("epsilon".to_string(), self.epsilon),
        ];
        if let Some(gamma) = self.gamma {
            params.push(("gamma".to_string(), gamma));
        }
        params
    }

    fn is_fitted(&self) -> bool {
        self.state.is_some()
    }
}
