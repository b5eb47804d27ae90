//! Shaping clean tables into model inputs.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use types::{ColumnKey, Frame};

use crate::error::{RefineryError, Result};

/// Separate the target column from the features.
///
/// When `target` is absent the whole frame comes back with no target, and
/// a warning is logged.
pub fn split_x_y(frame: &Frame, target: &ColumnKey) -> Result<(Frame, Option<Vec<f64>>)> {
    let Some(y) = frame.column_values(target) else {
        warn!(target = %target, "Target column not found, returning all columns as features");
        return Ok((frame.clone(), None));
    };
    let x = frame.drop_column(target)?;
    Ok((x, Some(y)))
}

// =============================================================================
// Scaling
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMethod {
    /// Map each column onto [0, 1].
    #[default]
    MinMax,
    /// Zero mean, unit variance.
    Standard,
}

impl fmt::Display for ScaleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaleMethod::MinMax => write!(f, "minmax"),
            ScaleMethod::Standard => write!(f, "standard"),
        }
    }
}

impl FromStr for ScaleMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minmax" => Ok(ScaleMethod::MinMax),
            "standard" => Ok(ScaleMethod::Standard),
            other => Err(format!("unknown scale method '{}'", other)),
        }
    }
}

/// Per-column affine scaling `(v - offset) / scale`, fitted on one table and
/// reusable on others.
///
/// Constant columns get `scale = 1`, so they map to 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    method: ScaleMethod,
    offset: Vec<f64>,
    scale: Vec<f64>,
}

impl Scaler {
    pub fn fit(frame: &Frame, method: ScaleMethod) -> Self {
        let width = frame.n_cols();
        let n = frame.n_rows() as f64;
        let (offset, spread) = match method {
            ScaleMethod::MinMax => {
                let mut min = vec![f64::INFINITY; width];
                let mut max = vec![f64::NEG_INFINITY; width];
                for row in frame.rows() {
                    for (j, v) in row.iter().enumerate() {
                        min[j] = min[j].min(*v);
                        max[j] = max[j].max(*v);
                    }
                }
                let range: Vec<f64> = min.iter().zip(&max).map(|(lo, hi)| hi - lo).collect();
                (min, range)
            }
            ScaleMethod::Standard => {
                let mut mean = vec![0.0; width];
                for row in frame.rows() {
                    for (m, v) in mean.iter_mut().zip(row) {
                        *m += v / n;
                    }
                }
                let mut var = vec![0.0; width];
                for row in frame.rows() {
                    for ((s, v), m) in var.iter_mut().zip(row).zip(&mean) {
                        *s += (v - m).powi(2) / n;
                    }
                }
                let std: Vec<f64> = var.into_iter().map(f64::sqrt).collect();
                (mean, std)
            }
        };
        let scale = spread
            .into_iter()
            .map(|s: f64| if s > 0.0 && s.is_finite() { s } else { 1.0 })
            .collect();
        let offset = offset
            .into_iter()
            .map(|o: f64| if o.is_finite() { o } else { 0.0 })
            .collect();
        Self {
            method,
            offset,
            scale,
        }
    }

    pub fn method(&self) -> ScaleMethod {
        self.method
    }

    pub fn transform(&self, frame: &Frame) -> Result<Frame> {
        if frame.n_cols() != self.offset.len() {
            return Err(RefineryError::Width {
                expected: self.offset.len(),
                found: frame.n_cols(),
            });
        }
        let rows = frame
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&self.offset)
                    .zip(&self.scale)
                    .map(|((v, o), s)| (v - o) / s)
                    .collect()
            })
            .collect();
        Ok(Frame::new(frame.columns().to_vec(), rows)?)
    }

    pub fn fit_transform(frame: &Frame, method: ScaleMethod) -> Result<(Self, Frame)> {
        let scaler = Self::fit(frame, method);
        let scaled = scaler.transform(frame)?;
        Ok((scaler, scaled))
    }
}

/// Fit a scaler on `frame` and return the scaled copy.
pub fn scale_features(frame: &Frame, method: ScaleMethod) -> Result<Frame> {
    Scaler::fit_transform(frame, method).map(|(_, scaled)| scaled)
}

// =============================================================================
// Train/test split
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct TrainTestSplit {
    pub x_train: Frame,
    pub x_test: Frame,
    pub y_train: Vec<f64>,
    pub y_test: Vec<f64>,
}

/// Shuffle rows with a seeded RNG and hold out `ceil(test_size * n)` of them.
///
/// The same seed always yields the same split.
pub fn train_test_split(x: &Frame, y: &[f64], test_size: f64, seed: u64) -> Result<TrainTestSplit> {
    let n = x.n_rows();
    if n != y.len() {
        return Err(RefineryError::InvalidSplit(format!(
            "X has {} rows but y has {} values",
            n,
            y.len()
        )));
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(RefineryError::InvalidSplit(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }
    let n_test = (test_size * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(RefineryError::InvalidSplit(format!(
            "test_size {} leaves an empty side for {} samples",
            test_size, n
        )));
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);
    let (test_idx, train_idx) = order.split_at(n_test);

    Ok(TrainTestSplit {
        x_train: x.take_rows(train_idx),
        x_test: x.take_rows(test_idx),
        y_train: train_idx.iter().map(|&i| y[i]).collect(),
        y_test: test_idx.iter().map(|&i| y[i]).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Frame {
        Frame::with_names(["a", "b", "target"], vec![
            vec![1.0, 10.0, 0.0],
            vec![2.0, 10.0, 1.0],
            vec![3.0, 10.0, 0.0],
            vec![4.0, 10.0, 1.0],
            vec![5.0, 10.0, 1.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_split_x_y() {
        let (x, y) = split_x_y(&table(), &ColumnKey::from("target")).unwrap();
        assert_eq!(x.columns(), &[ColumnKey::from("a"), ColumnKey::from("b")]);
        assert_eq!(y.unwrap(), vec![0.0, 1.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_split_x_y_missing_target() {
        let (x, y) = split_x_y(&table(), &ColumnKey::from("label")).unwrap();
        assert_eq!(x.n_cols(), 3);
        assert!(y.is_none());
    }

    #[test]
    fn test_minmax_scaling() {
        let scaled = scale_features(&table(), ScaleMethod::MinMax).unwrap();
        let a: Vec<f64> = scaled.column_values(&ColumnKey::from("a")).unwrap();
        assert_eq!(a, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        // Constant column maps to zero
        let b = scaled.column_values(&ColumnKey::from("b")).unwrap();
        assert!(b.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_standard_scaling() {
        let scaled = scale_features(&table(), ScaleMethod::Standard).unwrap();
        let a = scaled.column_values(&ColumnKey::from("a")).unwrap();
        let mean = a.iter().sum::<f64>() / a.len() as f64;
        let var = a.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / a.len() as f64;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_scaler_reused_on_test_split() {
        let train = Frame::with_names(["a"], vec![vec![0.0], vec![10.0]]).unwrap();
        let test = Frame::with_names(["a"], vec![vec![5.0], vec![20.0]]).unwrap();
        let scaler = Scaler::fit(&train, ScaleMethod::MinMax);
        let scaled = scaler.transform(&test).unwrap();
        assert_eq!(scaled.into_rows(), vec![vec![0.5], vec![2.0]]);

        let wide = Frame::from_matrix(vec![vec![1.0, 2.0]]).unwrap();
        assert!(matches!(
            scaler.transform(&wide),
            Err(RefineryError::Width { expected: 1, found: 2 })
        ));
    }

    #[test]
    fn test_scale_method_parse() {
        assert_eq!("MinMax".parse::<ScaleMethod>().unwrap(), ScaleMethod::MinMax);
        assert_eq!("standard".parse::<ScaleMethod>().unwrap(), ScaleMethod::Standard);
        assert!("robust".parse::<ScaleMethod>().is_err());
    }

    #[test]
    fn test_train_test_split_deterministic() {
        let x = Frame::from_matrix((0..10).map(|i| vec![i as f64]).collect()).unwrap();
        let y: Vec<f64> = (0..10).map(|i| i as f64).collect();

        let first = train_test_split(&x, &y, 0.25, 42).unwrap();
        let second = train_test_split(&x, &y, 0.25, 42).unwrap();
        assert_eq!(first, second);

        assert_eq!(first.x_test.n_rows(), 3);
        assert_eq!(first.x_train.n_rows(), 7);
        // Rows stay paired with their targets
        for (row, target) in first.x_test.rows().iter().zip(&first.y_test) {
            assert_eq!(row[0], *target);
        }

        let mut all: Vec<f64> = first.y_train.iter().chain(&first.y_test).copied().collect();
        all.sort_by(f64::total_cmp);
        assert_eq!(all, y);
    }

    #[test]
    fn test_train_test_split_rejects_bad_sizes() {
        let x = Frame::from_matrix(vec![vec![0.0], vec![1.0]]).unwrap();
        assert!(train_test_split(&x, &[0.0, 1.0], 0.0, 1).is_err());
        assert!(train_test_split(&x, &[0.0, 1.0], 1.0, 1).is_err());
        assert!(train_test_split(&x, &[0.0], 0.5, 1).is_err());
    }
}
