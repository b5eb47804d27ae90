//! Exhaustive cross-validated hyperparameter search.
//!
//! Every combination in a [`ParamGrid`] is scored by k-fold cross-validation
//! and the best one is refit on the full training data.
//!
//! - Classification uses stratified folds: samples are grouped by class and
//!   the groups are dealt round-robin across folds as one sequence, so each
//!   class picks up where the previous one stopped. Every fold sees roughly
//!   the class balance of the whole set and no fold is left empty.
//! - Regression uses contiguous, unshuffled folds; the first `n % k` folds get
//!   one extra sample.
//!
//! A combination whose fit or prediction fails on any fold scores NaN and can
//! never win. Among finite scores the first strictly greater one wins, so ties
//! go to the earlier combination in grid order. Combinations run in parallel
//! unless `force_sequential` is set; results are identical either way.

use tracing::{debug, info};
use types::TaskKind;

use crate::error::{Result, WeaponError};
use crate::estimator::{Estimator, ParamGrid, ParamSet, apply_params};
use crate::metrics::Scoring;
use crate::models::Model;

/// Search configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSearch {
    pub cv: usize,
    pub scoring: Scoring,
    /// Keep every combination on the calling thread.
    pub force_sequential: bool,
}

impl GridSearch {
    pub fn new(cv: usize, scoring: Scoring) -> Self {
        Self {
            cv,
            scoring,
            force_sequential: false,
        }
    }

    /// Builder: toggle sequential execution.
    pub fn sequential(mut self, force_sequential: bool) -> Self {
        self.force_sequential = force_sequential;
        self
    }

    /// Score every combination of `grid` on `template` and refit the winner.
    ///
    /// `template` is never modified; each combination works on a clone.
    pub fn run(
        &self,
        template: &Model,
        task: TaskKind,
        x: &[Vec<f64>],
        y: &[f64],
        grid: &ParamGrid,
    ) -> Result<SearchOutcome> {
        if self.cv < 2 {
            return Err(WeaponError::Search(format!(
                "cv must be at least 2, got {}",
                self.cv
            )));
        }
        if x.len() < self.cv {
            return Err(WeaponError::Search(format!(
                "cannot split {} samples into {} folds",
                x.len(),
                self.cv
            )));
        }
        if x.len() != y.len() {
            return Err(WeaponError::InputShape(format!(
                "X has {} rows but y has {} values",
                x.len(),
                y.len()
            )));
        }

        let combos = grid.combinations();
        if combos.is_empty() {
            return Err(WeaponError::Search("parameter grid is empty".into()));
        }

        let folds = match task {
            TaskKind::Classification => stratified_folds(y, self.cv),
            TaskKind::Regression => contiguous_folds(y.len(), self.cv),
        };

        let scores = parallel::map_slice(
            &combos,
            |params| self.cross_validate(template, params, x, y, &folds),
            self.force_sequential,
        );

        let mut best: Option<usize> = None;
        for (i, score) in scores.iter().enumerate() {
            debug!(params = ?combos[i], score, "Scored parameter combination");
            if score.is_finite() && best.is_none_or(|b| *score > scores[b]) {
                best = Some(i);
            }
        }
        let best = best.ok_or_else(|| {
            WeaponError::Search(format!(
                "all {} parameter combinations failed",
                combos.len()
            ))
        })?;

        let best_params = combos[best].clone();
        let mut best_model = template.clone();
        apply_params(&mut best_model, &best_params)?;
        best_model.fit(x, y)?;

        info!(
            params = ?best_params,
            score = scores[best],
            scoring = %self.scoring,
            "Grid search complete"
        );

        Ok(SearchOutcome {
            best_params,
            best_score: scores[best],
            best_model,
            results: combos.into_iter().zip(scores).collect(),
        })
    }

    /// Mean fold score for one combination, NaN on any failure.
    fn cross_validate(
        &self,
        template: &Model,
        params: &ParamSet,
        x: &[Vec<f64>],
        y: &[f64],
        folds: &[usize],
    ) -> f64 {
        let mut total = 0.0;
        for fold in 0..self.cv {
            match self.score_fold(template, params, x, y, folds, fold) {
                Ok(score) => total += score,
                Err(e) => {
                    debug!(params = ?params, fold, error = %e, "Fold failed");
                    return f64::NAN;
                }
            }
        }
        total / self.cv as f64
    }

    fn score_fold(
        &self,
        template: &Model,
        params: &ParamSet,
        x: &[Vec<f64>],
        y: &[f64],
        folds: &[usize],
        fold: usize,
    ) -> Result<f64> {
        let mut x_train = Vec::new();
        let mut y_train = Vec::new();
        let mut x_test = Vec::new();
        let mut y_test = Vec::new();
        for (i, &f) in folds.iter().enumerate() {
            if f == fold {
                x_test.push(x[i].clone());
                y_test.push(y[i]);
            } else {
                x_train.push(x[i].clone());
                y_train.push(y[i]);
            }
        }

        if x_test.is_empty() {
            return Err(WeaponError::Search(format!("fold {} has no samples", fold)));
        }

        let mut model = template.clone();
        apply_params(&mut model, params)?;
        model.fit(&x_train, &y_train)?;
        let pred = model.predict(&x_test)?;
        Ok(self.scoring.score(&y_test, &pred))
    }
}

/// Result of a completed search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best_params: ParamSet,
    /// Mean cross-validated score of `best_params`.
    pub best_score: f64,
    /// Estimator refit on the full data with `best_params`.
    pub best_model: Model,
    /// Every combination with its mean score, in grid order.
    pub results: Vec<(ParamSet, f64)>,
}

/// Fold index per sample. Classes are taken in first-seen order and dealt
/// round-robin without restarting at fold 0.
fn stratified_folds(y: &[f64], cv: usize) -> Vec<usize> {
    let codes: Vec<i64> = y.iter().map(|v| v.round() as i64).collect();
    let mut classes: Vec<i64> = Vec::new();
    for &code in &codes {
        if !classes.contains(&code) {
            classes.push(code);
        }
    }

    let mut folds = vec![0; codes.len()];
    let mut dealt = 0;
    for class in classes {
        for (i, _) in codes.iter().enumerate().filter(|&(_, &c)| c == class) {
            folds[i] = dealt % cv;
            dealt += 1;
        }
    }
    folds
}

/// Fold index per sample for unshuffled k-fold.
fn contiguous_folds(n: usize, cv: usize) -> Vec<usize> {
    let base = n / cv;
    let extra = n % cv;
    let mut folds = Vec::with_capacity(n);
    for fold in 0..cv {
        let size = base + usize::from(fold < extra);
        folds.extend(std::iter::repeat_n(fold, size));
    }
    folds
}
