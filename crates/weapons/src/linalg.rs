//! Small dense numeric helpers shared by the estimators.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WeaponError};

/// Pivot magnitude below which a system is treated as singular.
const SINGULAR_EPS: f64 = 1e-12;

#[inline]
pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
pub(crate) fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[inline]
pub(crate) fn rbf_kernel(a: &[f64], b: &[f64], gamma: f64) -> f64 {
    (-gamma * squared_distance(a, b)).exp()
}

/// Kernel width for `gamma = "scale"`: `1 / (n_features * Var(X))`.
///
/// Falls back to 1.0 when the data has no variance.
pub(crate) fn scale_gamma(x: &[Vec<f64>]) -> f64 {
    let n_features = x.first().map_or(0, Vec::len);
    let count = (x.len() * n_features) as f64;
    if count == 0.0 {
        return 1.0;
    }
    let mean = x.iter().flatten().sum::<f64>() / count;
    let var = x.iter().flatten().map(|v| (v - mean).powi(2)).sum::<f64>() / count;
    if var > 0.0 {
        1.0 / (n_features as f64 * var)
    } else {
        1.0
    }
}

/// Solve `a * x = b` by Gaussian elimination with partial pivoting.
///
/// Returns `None` when the matrix is singular.
pub(crate) fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < SINGULAR_EPS {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

/// Numerically stable softmax over any number of scores.
pub(crate) fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exp.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        exp.into_iter().map(|e| e / sum).collect()
    } else {
        vec![1.0 / scores.len() as f64; scores.len()]
    }
}

/// Index of the first maximal value.
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// Sorted distinct class codes from an integral target.
pub(crate) fn class_codes(y: &[f64]) -> Vec<i64> {
    let mut classes: Vec<i64> = y.iter().map(|v| v.round() as i64).collect();
    classes.sort_unstable();
    classes.dedup();
    classes
}

/// Per-feature standardization fitted on training rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Standardizer {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl Standardizer {
    pub(crate) fn fit(x: &[Vec<f64>]) -> Self {
        let n = x.len() as f64;
        let width = x.first().map_or(0, Vec::len);
        let mut mean = vec![0.0; width];
        for row in x {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v / n;
            }
        }
        let mut scale = vec![0.0; width];
        for row in x {
            for ((s, v), m) in scale.iter_mut().zip(row).zip(&mean) {
                *s += (v - m).powi(2) / n;
            }
        }
        // Constant columns pass through centered but unscaled.
        let scale = scale
            .into_iter()
            .map(|var| if var > 0.0 { var.sqrt() } else { 1.0 })
            .collect();
        Self { mean, scale }
    }

    /// True when both moment vectors cover exactly `width` columns.
    pub(crate) fn covers(&self, width: usize) -> bool {
        self.mean.len() == width && self.scale.len() == width
    }

    pub(crate) fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .map(|((v, m), s)| (v - m) / s)
            .collect()
    }

    pub(crate) fn transform(&self, x: &[Vec<f64>]) -> Vec<Vec<f64>> {
        x.iter().map(|row| self.transform_row(row)).collect()
    }
}

/// Validate a training batch and return its feature count.
pub(crate) fn check_training_data(x: &[Vec<f64>], y: &[f64]) -> Result<usize> {
    if x.is_empty() {
        return Err(WeaponError::InputShape("training data has no rows".into()));
    }
    if x.len() != y.len() {
        return Err(WeaponError::InputShape(format!(
            "X has {} rows but y has {} values",
            x.len(),
            y.len()
        )));
    }
    let width = x[0].len();
    if width == 0 {
        return Err(WeaponError::InputShape("training data has no columns".into()));
    }
    if let Some(i) = x.iter().position(|row| row.len() != width) {
        return Err(WeaponError::InputShape(format!(
            "row {} has {} values, expected {}",
            i,
            x[i].len(),
            width
        )));
    }
    Ok(width)
}

/// Validate a prediction batch against the fitted feature count.
pub(crate) fn check_prediction_data(x: &[Vec<f64>], n_features: usize) -> Result<()> {
    if let Some(i) = x.iter().position(|row| row.len() != n_features) {
        return Err(WeaponError::InputShape(format!(
            "row {} has {} values, model expects {}",
            i,
            x[i].len(),
            n_features
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_small_system() {
        // 2x + y = 5, x - y = 1  ->  x = 2, y = 1
        let a = vec![vec![2.0, 1.0], vec![1.0, -1.0]];
        let x = solve(a, vec![5.0, 1.0]).unwrap();
        assert!((x[0] - 2.0).abs() < 1e-12);
        assert!((x[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_solve_needs_pivoting() {
        let a = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        let x = solve(a, vec![3.0, 4.0]).unwrap();
        assert_eq!(x, vec![4.0, 3.0]);
    }

    #[test]
    fn test_solve_singular() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(solve(a, vec![1.0, 2.0]).is_none());
    }

    #[test]
    fn test_softmax_stable_for_large_scores() {
        let probs = softmax(&[1000.0, 1001.0, 1002.0]);
        let sum: f64 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-10);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_argmax_first_wins_ties() {
        assert_eq!(argmax(&[0.2, 0.7, 0.7]), 1);
        assert_eq!(argmax(&[3.0]), 0);
    }

    #[test]
    fn test_standardizer_handles_constant_columns() {
        let x = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let s = Standardizer::fit(&x);
        let t = s.transform(&x);
        assert!((t[0][0] + 1.0).abs() < 1e-12);
        assert!((t[1][0] - 1.0).abs() < 1e-12);
        assert_eq!(t[0][1], 0.0);
    }

    #[test]
    fn test_check_training_data_length_mismatch() {
        let err = check_training_data(&[vec![1.0]], &[1.0, 2.0]).unwrap_err();
        assert!(err.to_string().contains("1 rows"));
    }

    #[test]
    fn test_class_codes_sorted_unique() {
        assert_eq!(class_codes(&[1.0, 0.0, 2.0, 1.0]), vec![0, 1, 2]);
    }
}
