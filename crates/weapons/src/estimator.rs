//! The capability interface every estimator backend implements.
//!
//! The decision engine and the grid search never look at a concrete model;
//! they only see [`Estimator`]: fit, predict, an optional confidence
//! signal, and an optional default hyperparameter grid.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WeaponError};

/// One concrete hyperparameter assignment, in grid order.
pub type ParamSet = Vec<(String, f64)>;

/// Uniform interface over heterogeneous regressors and classifiers.
///
/// Inputs are row-major feature matrices already aligned to the training
/// schema. Classifiers receive and return integer class codes as `f64`.
pub trait Estimator: Send + Sync {
    /// Fit on `x` (one row per sample) against target `y`.
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()>;

    /// Predict one value per row. Fails if the estimator has not been fit.
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>>;

    /// Confidence of each prediction (max class probability).
    ///
    /// `None` when the estimator has no confidence mechanism.
    fn predict_confidence(&self, _x: &[Vec<f64>]) -> Option<Result<Vec<f64>>> {
        None
    }

    /// Default search space, if this estimator is worth tuning.
    fn param_grid(&self) -> Option<ParamGrid> {
        None
    }

    /// Set a hyperparameter by name. Discards any fitted state.
    fn set_param(&mut self, name: &str, value: f64) -> Result<()>;

    /// Current hyperparameters, for logging and artifact metadata.
    fn params(&self) -> ParamSet;

    fn is_fitted(&self) -> bool;
}

/// Apply every assignment in `params` to `estimator`.
pub fn apply_params<E: Estimator + ?Sized>(estimator: &mut E, params: &ParamSet) -> Result<()> {
    for (name, value) in params {
        estimator.set_param(name, *value)?;
    }
    Ok(())
}

/// Convert a grid value to a positive integer hyperparameter.
pub(crate) fn positive_int(name: &str, value: f64) -> Result<usize> {
    if value.is_finite() && value >= 1.0 && value.fract() == 0.0 {
        Ok(value as usize)
    } else {
        Err(WeaponError::InvalidParam(format!(
            "{} must be a positive integer, got {}",
            name, value
        )))
    }
}

/// Convert a grid value to a strictly positive float hyperparameter.
pub(crate) fn positive_float(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(WeaponError::InvalidParam(format!(
            "{} must be > 0, got {}",
            name, value
        )))
    }
}

pub(crate) fn unknown_param(model: &str, name: &str) -> WeaponError {
    WeaponError::InvalidParam(format!("{} has no hyperparameter '{}'", model, name))
}

// =============================================================================
// ParamGrid
// =============================================================================

/// Ordered hyperparameter search space.
///
/// Combinations are enumerated as a Cartesian product; the last entry
/// varies fastest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    entries: Vec<(String, Vec<f64>)>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a parameter and its candidate values.
    pub fn with(mut self, name: impl Into<String>, values: impl Into<Vec<f64>>) -> Self {
        self.entries.push((name.into(), values.into()));
        self
    }

    pub fn entries(&self) -> &[(String, Vec<f64>)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every parameter assignment in the grid.
    ///
    /// An empty grid yields a single empty assignment. A parameter with no
    /// candidate values yields no assignments at all.
    pub fn combinations(&self) -> Vec<ParamSet> {
        let mut combos: Vec<ParamSet> = vec![Vec::new()];
        for (name, values) in &self.entries {
            combos = combos
                .iter()
                .flat_map(|prefix| {
                    values.iter().map(move |v| {
                        let mut next = prefix.clone();
                        next.push((name.clone(), *v));
                        next
                    })
                })
                .collect();
        }
        combos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combinations_cartesian_order() {
        let grid = ParamGrid::new()
            .with("c", vec![0.1, 1.0])
            .with("max_depth", vec![3.0, 5.0, 8.0]);
        let combos = grid.combinations();

        assert_eq!(combos.len(), 6);
        assert_eq!(
            combos[0],
            vec![("c".to_string(), 0.1), ("max_depth".to_string(), 3.0)]
        );
        assert_eq!(
            combos[1],
            vec![("c".to_string(), 0.1), ("max_depth".to_string(), 5.0)]
        );
        assert_eq!(
            combos[5],
            vec![("c".to_string(), 1.0), ("max_depth".to_string(), 8.0)]
        );
    }

    #[test]
    fn test_empty_grid_has_single_assignment() {
        assert_eq!(ParamGrid::new().combinations(), vec![ParamSet::new()]);
    }

    #[test]
    fn test_parameter_without_values_has_no_assignments() {
        let grid = ParamGrid::new().with("c", Vec::<f64>::new());
        assert!(grid.combinations().is_empty());
    }

    #[test]
    fn test_positive_int_validation() {
        assert_eq!(positive_int("k", 5.0).unwrap(), 5);
        assert!(positive_int("k", 0.0).is_err());
        assert!(positive_int("k", 2.5).is_err());
        assert!(positive_float("c", -1.0).is_err());
    }
}
