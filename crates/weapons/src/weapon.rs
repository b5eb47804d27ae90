//! The estimator wrapper ("weapon").
//!
//! A [`Weapon`] pairs an estimator backend with a display name, a task kind,
//! the feature schema recorded at its first successful fit, and, for
//! classifiers, the caller's label map. It validates and realigns every
//! input frame before the backend sees it.
//!
//! # Schema alignment
//!
//! Prediction input must contain every schema column; extra columns are
//! ignored and columns are reordered to the training order. Missing named
//! columns are a [`WeaponError::SchemaMismatch`]. When every missing column
//! is positional, the input is taken to be a plain matrix and its leading
//! columns are used in order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use types::{
    ClassificationResult, ColumnKey, EvaluationResult, Frame, LabelMap, RegressionResult,
    TaskKind,
};

use crate::artifact::{self, ArtifactBundle, ArtifactMeta};
use crate::error::{Result, WeaponError};
use crate::estimator::{Estimator, ParamGrid, ParamSet};
use crate::metrics::{
    ClassificationReport, EvaluationReport, RegressionReport, Scoring, accuracy, r2_score,
};
use crate::models::Model;
use crate::search::GridSearch;

/// Outcome of the last hyperparameter search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    pub best_params: ParamSet,
    /// Mean cross-validated score of `best_params`.
    pub cv_score: f64,
    pub scoring: Scoring,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    name: String,
    task: TaskKind,
    estimator: Model,
    #[serde(default)]
    schema: Option<Vec<ColumnKey>>,
    #[serde(default)]
    label_map: Option<LabelMap>,
    #[serde(default)]
    tuning: Option<Tuning>,
}

impl Weapon {
    /// Wrap a regression backend.
    pub fn regressor(name: impl Into<String>, estimator: impl Into<Model>) -> Self {
        Self {
            name: name.into(),
            task: TaskKind::Regression,
            estimator: estimator.into(),
            schema: None,
            label_map: None,
            tuning: None,
        }
    }

    /// Wrap a classification backend with the labels for its class codes.
    pub fn classifier(
        name: impl Into<String>,
        estimator: impl Into<Model>,
        label_map: LabelMap,
    ) -> Self {
        Self {
            name: name.into(),
            task: TaskKind::Classification,
            estimator: estimator.into(),
            schema: None,
            label_map: Some(label_map),
            tuning: None,
        }
    }

    pub(crate) fn from_bundle(bundle: ArtifactBundle) -> Self {
        let task = bundle
            .meta
            .task
            .unwrap_or_else(|| bundle.model.task());
        Self {
            name: bundle.meta.name,
            task,
            estimator: bundle.model,
            schema: Some(bundle.feature_names),
            label_map: bundle.meta.label_map,
            tuning: bundle.meta.tuning,
        }
    }

    /// A legacy artifact that stored only the estimator.
    pub(crate) fn from_bare_model(name: String, estimator: Model) -> Self {
        Self {
            name,
            task: estimator.task(),
            estimator,
            schema: None,
            label_map: None,
            tuning: None,
        }
    }

    pub(crate) fn to_bundle(&self, saved_at: DateTime<Utc>) -> ArtifactBundle {
        ArtifactBundle {
            model: self.estimator.clone(),
            feature_names: self.schema.clone().unwrap_or_default(),
            meta: ArtifactMeta {
                name: self.name.clone(),
                saved_at,
                task: Some(self.task),
                label_map: self.label_map.clone(),
                tuning: self.tuning.clone(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn task(&self) -> TaskKind {
        self.task
    }

    pub fn estimator(&self) -> &Model {
        &self.estimator
    }

    /// Feature columns recorded at the first successful fit.
    pub fn schema(&self) -> Option<&[ColumnKey]> {
        self.schema.as_deref()
    }

    pub fn label_map(&self) -> Option<&LabelMap> {
        self.label_map.as_ref()
    }

    pub fn tuning(&self) -> Option<&Tuning> {
        self.tuning.as_ref()
    }

    pub fn is_trained(&self) -> bool {
        self.estimator.is_fitted()
    }

    /// Default hyperparameter grid of the backend, if it has one.
    pub fn param_grid(&self) -> Option<ParamGrid> {
        self.estimator.param_grid()
    }

    // =========================================================================
    // Training
    // =========================================================================

    pub fn fit(&mut self, x: &Frame, y: &[f64]) -> Result<()> {
        let matrix = self.training_matrix(x, y)?;
        self.estimator.fit(&matrix, y)?;
        self.record_schema(x);
        Ok(())
    }

    /// Grid-search `grid` with `cv` folds under the named scoring and keep the
    /// best configuration, refit on all of `x`.
    pub fn optimize(
        &mut self,
        x: &Frame,
        y: &[f64],
        grid: &ParamGrid,
        cv: usize,
        scoring: &str,
    ) -> Result<()> {
        let search = GridSearch::new(cv, scoring.parse()?);
        self.optimize_with(&search, x, y, grid)
    }

    /// [`Weapon::optimize`] with a fully configured search.
    pub fn optimize_with(
        &mut self,
        search: &GridSearch,
        x: &Frame,
        y: &[f64],
        grid: &ParamGrid,
    ) -> Result<()> {
        let matrix = self.training_matrix(x, y)?;
        let outcome = search.run(&self.estimator, self.task, &matrix, y, grid)?;

        info!(
            weapon = %self.name,
            params = ?outcome.best_params,
            cv_score = outcome.best_score,
            "Tuned"
        );
        self.estimator = outcome.best_model;
        self.tuning = Some(Tuning {
            best_params: outcome.best_params,
            cv_score: outcome.best_score,
            scoring: search.scoring,
        });
        self.record_schema(x);
        Ok(())
    }

    fn training_matrix(&self, x: &Frame, y: &[f64]) -> Result<Vec<Vec<f64>>> {
        if x.n_rows() != y.len() {
            return Err(WeaponError::InputShape(format!(
                "X has {} rows but y has {} values",
                x.n_rows(),
                y.len()
            )));
        }
        if let Some(i) = y.iter().position(|v| !v.is_finite()) {
            return Err(WeaponError::InputShape(format!(
                "target value {} is not finite",
                i
            )));
        }
        if self.task == TaskKind::Classification {
            if let Some(i) = y.iter().position(|v| v.fract() != 0.0) {
                return Err(WeaponError::InputShape(format!(
                    "classification target {} = {} is not an integer class code",
                    i, y[i]
                )));
            }
        }
        match self.schema {
            Some(_) => self.align(x),
            None => {
                check_finite(x)?;
                Ok(x.rows().to_vec())
            }
        }
    }

    fn record_schema(&mut self, x: &Frame) {
        if self.schema.is_none() {
            self.schema = Some(x.columns().to_vec());
        }
    }

    // =========================================================================
    // Prediction
    // =========================================================================

    pub fn predict(&self, x: &Frame) -> Result<EvaluationResult> {
        if !self.is_trained() {
            return Err(WeaponError::NotTrained(self.name.clone()));
        }
        let matrix = match self.schema {
            Some(_) => self.align(x)?,
            None => {
                check_finite(x)?;
                x.rows().to_vec()
            }
        };
        let raw = self.estimator.predict(&matrix)?;

        Ok(match self.task {
            TaskKind::Regression => EvaluationResult::Regression(RegressionResult {
                predictions: raw,
                actuals: None,
            }),
            TaskKind::Classification => {
                let codes = raw.iter().map(|v| v.round() as i64).collect();
                let confidence = self.estimator.predict_confidence(&matrix).transpose()?;
                let empty = LabelMap::new();
                let labels = self.label_map.as_ref().unwrap_or(&empty);
                EvaluationResult::Classification(ClassificationResult::new(
                    codes, confidence, labels,
                ))
            }
        })
    }

    /// Predict on labelled data. Regression results carry `y` as actuals.
    pub fn predict_labelled(&self, x: &Frame, y: &[f64]) -> Result<EvaluationResult> {
        let result = self.predict(x)?;
        if result.len() != y.len() {
            return Err(WeaponError::InputShape(format!(
                "X has {} rows but y has {} values",
                result.len(),
                y.len()
            )));
        }
        Ok(result.with_actuals(y))
    }

    /// Task score on labelled data: accuracy or R².
    pub fn score(&self, x: &Frame, y: &[f64]) -> Result<f64> {
        let pred = self.predict_labelled(x, y)?.predictions_f64();
        Ok(match self.task {
            TaskKind::Classification => accuracy(y, &pred),
            TaskKind::Regression => r2_score(y, &pred),
        })
    }

    /// Held-out report, also written to the log.
    pub fn evaluate(&self, x: &Frame, y: &[f64]) -> Result<EvaluationReport> {
        let result = self.predict_labelled(x, y)?;
        let report = match &result {
            EvaluationResult::Classification(r) => {
                let truth: Vec<i64> = y.iter().map(|v| v.round() as i64).collect();
                let empty = LabelMap::new();
                let labels = self.label_map.as_ref().unwrap_or(&empty);
                EvaluationReport::Classification(ClassificationReport::new(
                    &truth,
                    &r.predictions,
                    labels,
                ))
            }
            EvaluationResult::Regression(r) => {
                EvaluationReport::Regression(RegressionReport::new(y, &r.predictions))
            }
        };
        info!(weapon = %self.name, score = report.score(), "Evaluation report\n{}", report);
        Ok(report)
    }

    /// Reorder `x` to the recorded schema.
    fn align(&self, x: &Frame) -> Result<Vec<Vec<f64>>> {
        let Some(schema) = self.schema.as_deref() else {
            return Err(WeaponError::NotTrained(self.name.clone()));
        };
        let missing: Vec<ColumnKey> = schema
            .iter()
            .filter(|key| x.column_position(key).is_none())
            .cloned()
            .collect();

        let aligned = if missing.is_empty() {
            x.select_columns(schema)?
        } else if missing.iter().all(ColumnKey::is_positional) {
            if x.n_cols() < schema.len() {
                return Err(WeaponError::InputShape(format!(
                    "{}: expected {} columns, got {}",
                    self.name,
                    schema.len(),
                    x.n_cols()
                )));
            }
            let positions: Vec<usize> = (0..schema.len()).collect();
            x.select_positions(schema.to_vec(), &positions)
        } else {
            return Err(WeaponError::SchemaMismatch {
                model: self.name.clone(),
                missing,
            });
        };

        check_finite(&aligned)?;
        Ok(aligned.into_rows())
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Persist to a new artifact file in `dir`.
    ///
    /// Returns `Ok(None)` without touching the disk when the weapon was never
    /// fit.
    pub fn save(&self, dir: &Path) -> Result<Option<PathBuf>> {
        if !self.is_trained() {
            warn!(weapon = %self.name, "Refusing to save an untrained model");
            return Ok(None);
        }
        let path = artifact::write_artifact(&self.to_bundle(Utc::now()), dir)?;
        info!(weapon = %self.name, path = %path.display(), "Saved model");
        Ok(Some(path))
    }

    /// Restore a weapon from an artifact file of any supported shape.
    pub fn load(path: &Path) -> Result<Weapon> {
        artifact::read_artifact(path).map(|a| a.weapon)
    }
}

fn check_finite(x: &Frame) -> Result<()> {
    match x.first_non_finite() {
        Some((row, col)) => Err(WeaponError::InputShape(format!(
            "non-finite value at row {}, column '{}'",
            row,
            x.columns()[col]
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{KnnClassifier, LinearRegression, SvmClassifier};
    use tempfile::TempDir;

    fn plane() -> (Frame, Vec<f64>) {
        let rows: Vec<Vec<f64>> = (0..12)
            .map(|i| vec![i as f64, ((i * 5) % 7) as f64])
            .collect();
        let y = rows.iter().map(|r| 2.0 * r[0] - r[1] + 3.0).collect();
        (Frame::with_names(["a", "b"], rows).unwrap(), y)
    }

    fn blobs() -> (Frame, Vec<f64>) {
        let mut rows = Vec::new();
        let mut y = Vec::new();
        for i in 0..10 {
            let t = i as f64 * 0.1;
            rows.push(vec![t, t]);
            y.push(0.0);
            rows.push(vec![5.0 + t, 5.0 - t]);
            y.push(1.0);
        }
        (Frame::with_names(["a", "b"], rows).unwrap(), y)
    }

    #[test]
    fn test_predict_before_fit() {
        let weapon = Weapon::regressor("LinearRegression", LinearRegression::new());
        let (x, _) = plane();
        assert!(matches!(
            weapon.predict(&x).unwrap_err(),
            WeaponError::NotTrained(_)
        ));
    }

    #[test]
    fn test_schema_recorded_and_enforced() {
        let (x, y) = plane();
        let mut weapon = Weapon::regressor("LinearRegression", LinearRegression::new());
        weapon.fit(&x, &y).unwrap();
        assert_eq!(
            weapon.schema(),
            Some(&[ColumnKey::from("a"), ColumnKey::from("b")][..])
        );

        // Only {a}
        let only_a = x.select_columns(&[ColumnKey::from("a")]).unwrap();
        let err = weapon.predict(&only_a).unwrap_err();
        match err {
            WeaponError::SchemaMismatch { missing, .. } => {
                assert_eq!(missing, vec![ColumnKey::from("b")]);
            }
            other => panic!("expected schema mismatch, got {:?}", other),
        }

        // {c, b, a}: extra column ignored, order restored
        let rows: Vec<Vec<f64>> = x.rows().iter().map(|r| vec![99.0, r[1], r[0]]).collect();
        let shuffled = Frame::with_names(["c", "b", "a"], rows).unwrap();
        let pred = weapon.predict(&shuffled).unwrap().predictions_f64();
        for (p, t) in pred.iter().zip(&y) {
            assert!((p - t).abs() < 1e-6);
        }
    }

    #[test]
    fn test_positional_schema_accepts_any_matrix_of_width() {
        let (x, y) = plane();
        let matrix = Frame::from_matrix(x.rows().to_vec()).unwrap();
        let mut weapon = Weapon::regressor("LinearRegression", LinearRegression::new());
        weapon.fit(&matrix, &y).unwrap();

        // Named columns of the right width are used in order
        assert!(weapon.predict(&x).is_ok());

        let narrow = Frame::from_matrix(vec![vec![1.0]]).unwrap();
        assert!(matches!(
            weapon.predict(&narrow).unwrap_err(),
            WeaponError::InputShape(_)
        ));
    }

    #[test]
    fn test_nan_input_rejected() {
        let (x, y) = plane();
        let mut weapon = Weapon::regressor("LinearRegression", LinearRegression::new());
        weapon.fit(&x, &y).unwrap();

        let bad = Frame::with_names(["a", "b"], vec![vec![1.0, f64::NAN]]).unwrap();
        assert!(matches!(
            weapon.predict(&bad).unwrap_err(),
            WeaponError::InputShape(_)
        ));
    }

    #[test]
    fn test_classifier_labels_and_confidence() {
        let (x, y) = blobs();
        let map = LabelMap::from([(0, "Safe"), (1, "Toxic")]);
        let mut weapon = Weapon::classifier("KNN(k=5)", KnnClassifier::new(5), map);
        weapon.fit(&x, &y).unwrap();

        let probe = Frame::with_names(["a", "b"], vec![vec![0.2, 0.1], vec![5.3, 4.9]]).unwrap();
        let result = weapon.predict(&probe).unwrap();
        let cls = result.as_classification().unwrap();
        assert_eq!(cls.predictions, vec![0, 1]);
        assert_eq!(cls.prediction_labels, vec!["Safe", "Toxic"]);
        assert_eq!(cls.probabilities, vec![1.0, 1.0]);
    }

    #[test]
    fn test_classifier_without_confidence_reports_zeros() {
        let (x, y) = blobs();
        let mut weapon = Weapon::classifier(
            "SVM",
            SvmClassifier::new().with_probability(false),
            LabelMap::new(),
        );
        weapon.fit(&x, &y).unwrap();
        let result = weapon.predict(&x).unwrap();
        let cls = result.as_classification().unwrap();
        assert!(cls.probabilities.iter().all(|p| *p == 0.0));
        assert_eq!(cls.prediction_labels[0], "0");
    }

    #[test]
    fn test_fractional_class_target_rejected() {
        let (x, mut y) = blobs();
        y[3] = 0.5;
        let mut weapon = Weapon::classifier("KNN(k=5)", KnnClassifier::new(5), LabelMap::new());
        assert!(matches!(
            weapon.fit(&x, &y).unwrap_err(),
            WeaponError::InputShape(_)
        ));
    }

    #[test]
    fn test_optimize_records_tuning() {
        let (x, y) = blobs();
        let mut weapon = Weapon::classifier("SVM", SvmClassifier::new(), LabelMap::new());
        let grid = weapon.param_grid().unwrap();
        weapon.optimize(&x, &y, &grid, 3, "accuracy").unwrap();

        let tuning = weapon.tuning().unwrap();
        assert_eq!(tuning.scoring, Scoring::Accuracy);
        assert_eq!(tuning.best_params.len(), 1);
        assert!(weapon.is_trained());
        assert!(weapon.schema().is_some());
        assert_eq!(weapon.score(&x, &y).unwrap(), 1.0);
    }

    #[test]
    fn test_optimize_unknown_scoring() {
        let (x, y) = blobs();
        let mut weapon = Weapon::classifier("SVM", SvmClassifier::new(), LabelMap::new());
        let grid = weapon.param_grid().unwrap();
        assert!(matches!(
            weapon.optimize(&x, &y, &grid, 3, "roc_auc").unwrap_err(),
            WeaponError::UnknownScoring(_)
        ));
    }

    #[test]
    fn test_evaluate_regression_report() {
        let (x, y) = plane();
        let mut weapon = Weapon::regressor("LinearRegression", LinearRegression::new());
        weapon.fit(&x, &y).unwrap();
        match weapon.evaluate(&x, &y).unwrap() {
            EvaluationReport::Regression(r) => {
                assert!(r.mse < 1e-9);
                assert!((r.r2 - 1.0).abs() < 1e-9);
            }
            other => panic!("expected regression report, got {:?}", other),
        }
    }

    #[test]
    fn test_labelled_prediction_attaches_actuals() {
        let (x, y) = plane();
        let mut weapon = Weapon::regressor("LinearRegression", LinearRegression::new());
        weapon.fit(&x, &y).unwrap();

        let plain = weapon.predict(&x).unwrap();
        assert_eq!(plain.as_regression().unwrap().actuals, None);
        let labelled = weapon.predict_labelled(&x, &y).unwrap();
        assert_eq!(labelled.as_regression().unwrap().actuals.as_deref(), Some(&y[..]));
        assert!(weapon.predict_labelled(&x, &y[1..]).is_err());
    }

    #[test]
    fn test_save_untrained_is_soft_failure() {
        let dir = TempDir::new().unwrap();
        let weapon = Weapon::regressor("LinearRegression", LinearRegression::new());
        assert_eq!(weapon.save(dir.path()).unwrap(), None);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let (x, y) = blobs();
        let map = LabelMap::from([(0, "Safe"), (1, "Toxic")]);
        let mut weapon = Weapon::classifier("KNN(k=5)", KnnClassifier::new(5), map);
        weapon.fit(&x, &y).unwrap();

        let path = weapon.save(dir.path()).unwrap().unwrap();
        let restored = Weapon::load(&path).unwrap();

        assert_eq!(restored.name(), "KNN(k=5)");
        assert_eq!(restored.task(), TaskKind::Classification);
        assert_eq!(restored.predict(&x).unwrap(), weapon.predict(&x).unwrap());
    }
}
