//! Least-squares regressors.
//!
//! [`LinearRegression`] solves the normal equations on centered data, so the
//! intercept is recovered exactly as `mean(y) - mean(x) . w`. A vanishing
//! ridge term keeps collinear designs solvable.
//!
//! [`PolynomialRegression`] expands every row into all monomials up to the
//! configured degree (no bias column, the linear model owns the intercept)
//! and fits a [`LinearRegression`] on the expanded features.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WeaponError};
use crate::estimator::{Estimator, ParamSet, positive_int, unknown_param};
use crate::linalg::{check_prediction_data, check_training_data, dot, solve};

/// Relative ridge added to the Gram diagonal.
const RIDGE_EPS: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LinearState {
    coefficients: Vec<f64>,
    intercept: f64,
}

/// Ordinary least squares with intercept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    #[serde(default)]
    state: Option<LinearState>,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coefficients(&self) -> Option<&[f64]> {
        self.state.as_ref().map(|s| s.coefficients.as_slice())
    }

    pub fn intercept(&self) -> Option<f64> {
        self.state.as_ref().map(|s| s.intercept)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match &self.state {
            Some(state) if state.coefficients.is_empty() => Err(WeaponError::CorruptState(
                "linear model has no coefficients".into(),
            )),
            _ => Ok(()),
        }
    }
}

impl Estimator for LinearRegression {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        let d = check_training_data(x, y)?;
        let n = x.len() as f64;

        let mut x_mean = vec![0.0; d];
        for row in x {
            for (m, v) in x_mean.iter_mut().zip(row) {
                *m += v / n;
            }
        }
        let y_mean = y.iter().sum::<f64>() / n;

        let mut gram = vec![vec![0.0; d]; d];
        let mut rhs = vec![0.0; d];
        for (row, target) in x.iter().zip(y) {
            let centered: Vec<f64> = row.iter().zip(&x_mean).map(|(v, m)| v - m).collect();
            let yc = target - y_mean;
            for i in 0..d {
                rhs[i] += centered[i] * yc;
                for j in i..d {
                    gram[i][j] += centered[i] * centered[j];
                }
            }
        }
        for i in 0..d {
            for j in 0..i {
                gram[i][j] = gram[j][i];
            }
        }

        let avg_diag = (0..d).map(|i| gram[i][i]).sum::<f64>() / d as f64;
        let ridge = RIDGE_EPS * avg_diag.max(1.0);
        for (i, row) in gram.iter_mut().enumerate() {
            row[i] += ridge;
        }

        let coefficients = solve(gram, rhs)
            .ok_or_else(|| WeaponError::Fit("singular design matrix".into()))?;
        let intercept = y_mean - dot(&x_mean, &coefficients);

        self.state = Some(LinearState {
            coefficients,
            intercept,
        });
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| WeaponError::NotTrained("LinearRegression".into()))?;
        check_prediction_data(x, state.coefficients.len())?;
        Ok(x.iter()
            .map(|row| dot(row, &state.coefficients) + state.intercept)
            .collect())
    }

    fn set_param(&mut self, name: &str, _value: f64) -> Result<()> {
        Err(unknown_param("LinearRegression", name))
    }

    fn params(&self) -> ParamSet {
        Vec::new()
    }

    fn is_fitted(&self) -> bool {
        self.state.is_some()
    }
}

// =============================================================================
// Polynomial expansion
// =============================================================================

/// Polynomial feature expansion followed by ordinary least squares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolynomialRegression {
    degree: usize,
    #[serde(default)]
    n_features: Option<usize>,
    #[serde(default)]
    linear: LinearRegression,
}

impl PolynomialRegression {
    pub fn new(degree: usize) -> Self {
        Self {
            degree: degree.max(1),
            n_features: None,
            linear: LinearRegression::new(),
        }
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// The inner model must be fitted on exactly the monomials of the
    /// recorded feature count.
    pub(crate) fn validate(&self) -> Result<()> {
        self.linear.validate()?;
        let Some(d) = self.n_features else {
            return Ok(());
        };
        let expected = monomial_count(d, self.degree);
        match (self.linear.coefficients(), expected) {
            (Some(coefs), Some(expected)) if d > 0 && coefs.len() == expected => Ok(()),
            _ => Err(WeaponError::CorruptState(format!(
                "polynomial of degree {} over {} features does not match its coefficients",
                self.degree, d
            ))),
        }
    }

    fn expand(&self, x: &[Vec<f64>], n_features: usize) -> Vec<Vec<f64>> {
        let terms = monomials(n_features, self.degree);
        x.iter()
            .map(|row| {
                terms
                    .iter()
                    .map(|term| term.iter().map(|&i| row[i]).product())
                    .collect()
            })
            .collect()
    }
}

impl Estimator for PolynomialRegression {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        let d = check_training_data(x, y)?;
        let expanded = self.expand(x, d);
        self.linear.fit(&expanded, y)?;
        self.n_features = Some(d);
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let d = self
            .n_features
            .ok_or_else(|| WeaponError::NotTrained("PolynomialRegression".into()))?;
        check_prediction_data(x, d)?;
        self.linear.predict(&self.expand(x, d))
    }

    fn set_param(&mut self, name: &str, value: f64) -> Result<()> {
        match name {
            "degree" => {
                self.degree = positive_int(name, value)?;
                self.n_features = None;
                self.linear = LinearRegression::new();
                Ok(())
            }
            _ => Err(unknown_param("PolynomialRegression", name)),
        }
    }

    fn params(&self) -> ParamSet {
        vec![("degree".into(), self.degree as f64)]
    }

    fn is_fitted(&self) -> bool {
        self.n_features.is_some() && self.linear.is_fitted()
    }
}

/// Number of monomials `monomials` yields, `C(n + degree, degree) - 1`.
/// `None` on overflow.
fn monomial_count(n_features: usize, degree: usize) -> Option<usize> {
    let mut count: usize = 1;
    for i in 1..=degree {
        count = count.checked_mul(n_features + i)? / i;
    }
    count.checked_sub(1)
}

/// Index tuples of every monomial of degree `1..=degree` over `n_features`.
///
/// Ordered by degree, then lexicographically (x0, x1, x0^2, x0*x1, x1^2, ...).
fn monomials(n_features: usize, degree: usize) -> Vec<Vec<usize>> {
    fn extend(start: usize, n: usize, remaining: usize, term: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if remaining == 0 {
            out.push(term.clone());
            return;
        }
        for i in start..n {
            term.push(i);
            extend(i, n, remaining - 1, term, out);
            term.pop();
        }
    }

    let mut out = Vec::new();
    for k in 1..=degree {
        extend(0, n_features, k, &mut Vec::with_capacity(k), &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_recovers_exact_plane() {
        // y = 3a - 2b + 1
        let x: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![i as f64, ((i * 7) % 5) as f64])
            .collect();
        let y: Vec<f64> = x.iter().map(|r| 3.0 * r[0] - 2.0 * r[1] + 1.0).collect();

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let coef = model.coefficients().unwrap();
        assert!((coef[0] - 3.0).abs() < 1e-6);
        assert!((coef[1] + 2.0).abs() < 1e-6);
        assert!((model.intercept().unwrap() - 1.0).abs() < 1e-6);

        let pred = model.predict(&[vec![10.0, 1.0]]).unwrap();
        assert!((pred[0] - 29.0).abs() < 1e-6);
    }

    #[test]
    fn test_linear_predict_before_fit() {
        let err = LinearRegression::new().predict(&[vec![1.0]]).unwrap_err();
        assert!(matches!(err, WeaponError::NotTrained(_)));
    }

    #[test]
    fn test_linear_rejects_wrong_width() {
        let mut model = LinearRegression::new();
        model.fit(&[vec![1.0, 2.0], vec![2.0, 1.0], vec![0.0, 0.0]], &[1.0, 2.0, 0.5]).unwrap();
        assert!(model.predict(&[vec![1.0]]).is_err());
    }

    #[test]
    fn test_monomial_order() {
        assert_eq!(
            monomials(2, 2),
            vec![vec![0], vec![1], vec![0, 0], vec![0, 1], vec![1, 1]]
        );
        assert_eq!(monomials(3, 1).len(), 3);
        for (n, degree) in [(1, 4), (2, 2), (3, 3), (5, 2)] {
            assert_eq!(monomial_count(n, degree), Some(monomials(n, degree).len()));
        }
    }

    #[test]
    fn test_polynomial_validate_rejects_mismatched_coefficients() {
        let mut model = PolynomialRegression::new(2);
        model.fit(&[vec![0.0], vec![1.0], vec![2.0]], &[0.0, 1.0, 4.0]).unwrap();
        assert!(model.validate().is_ok());

        // Two coefficients fit degree 2 over one feature; claiming two features needs five
        model.n_features = Some(2);
        assert!(matches!(model.validate(), Err(WeaponError::CorruptState(_))));

        model.n_features = Some(1);
        model.degree = usize::MAX;
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_polynomial_fits_quadratic() {
        let x: Vec<Vec<f64>> = (-10..=10).map(|i| vec![i as f64 / 2.0]).collect();
        let y: Vec<f64> = x.iter().map(|r| 0.5 * r[0] * r[0] - r[0] + 2.0).collect();

        let mut model = PolynomialRegression::new(2);
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&[vec![3.0]]).unwrap();
        assert!((pred[0] - 3.5).abs() < 1e-6);
    }

    #[test]
    fn test_polynomial_degree_param_resets_fit() {
        let mut model = PolynomialRegression::new(2);
        model.fit(&[vec![0.0], vec![1.0], vec![2.0]], &[0.0, 1.0, 4.0]).unwrap();
        assert!(model.is_fitted());

        model.set_param("degree", 3.0).unwrap();
        assert_eq!(model.degree(), 3);
        assert!(!model.is_fitted());
        assert!(model.set_param("alpha", 1.0).is_err());
    }
}
