//! Prediction reports produced by estimator wrappers.

use crate::{LabelMap, TaskKind};

/// Classification output for a batch of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    /// Predicted integer class codes, one per input row.
    pub predictions: Vec<i64>,
    /// Confidence of each prediction (max class probability).
    /// All zeros when the estimator exposes no confidence mechanism.
    pub probabilities: Vec<f64>,
    /// Human-readable label for each prediction.
    pub prediction_labels: Vec<String>,
}

impl ClassificationResult {
    /// Assemble a result, resolving labels through `label_map`.
    ///
    /// `probabilities` of `None` yields all-zero confidences.
    pub fn new(predictions: Vec<i64>, probabilities: Option<Vec<f64>>, label_map: &LabelMap) -> Self {
        let probabilities = probabilities.unwrap_or_else(|| vec![0.0; predictions.len()]);
        let prediction_labels = predictions.iter().map(|&c| label_map.label(c)).collect();
        Self {
            predictions,
            probabilities,
            prediction_labels,
        }
    }
}

/// Regression output for a batch of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionResult {
    pub predictions: Vec<f64>,
    /// Ground truth, attached by [`EvaluationResult::with_actuals`];
    /// `None` from plain prediction.
    pub actuals: Option<Vec<f64>>,
}

/// Tagged union of the two result shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationResult {
    Classification(ClassificationResult),
    Regression(RegressionResult),
}

impl EvaluationResult {
    pub fn task(&self) -> TaskKind {
        match self {
            EvaluationResult::Classification(_) => TaskKind::Classification,
            EvaluationResult::Regression(_) => TaskKind::Regression,
        }
    }

    /// Number of predicted rows.
    pub fn len(&self) -> usize {
        match self {
            EvaluationResult::Classification(r) => r.predictions.len(),
            EvaluationResult::Regression(r) => r.predictions.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attach ground truth to a regression result. Classification results
    /// are returned unchanged.
    pub fn with_actuals(self, y: &[f64]) -> Self {
        match self {
            EvaluationResult::Regression(r) => EvaluationResult::Regression(RegressionResult {
                actuals: Some(y.to_vec()),
                ..r
            }),
            other => other,
        }
    }

    /// Predictions as floats, for scoring against a numeric target.
    pub fn predictions_f64(&self) -> Vec<f64> {
        match self {
            EvaluationResult::Classification(r) => {
                r.predictions.iter().map(|&c| c as f64).collect()
            }
            EvaluationResult::Regression(r) => r.predictions.clone(),
        }
    }

    pub fn as_classification(&self) -> Option<&ClassificationResult> {
        match self {
            EvaluationResult::Classification(r) => Some(r),
            EvaluationResult::Regression(_) => None,
        }
    }

    pub fn as_regression(&self) -> Option<&RegressionResult> {
        match self {
            EvaluationResult::Regression(r) => Some(r),
            EvaluationResult::Classification(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_result_labels_and_zero_probs() {
        let map = LabelMap::from([(0, "Safe"), (1, "Toxic")]);
        let result = ClassificationResult::new(vec![0, 1, 2], None, &map);

        assert_eq!(result.prediction_labels, vec!["Safe", "Toxic", "2"]);
        assert_eq!(result.probabilities, vec![0.0, 0.0, 0.0]);
        assert_eq!(result.predictions.len(), result.prediction_labels.len());
    }

    #[test]
    fn test_evaluation_result_accessors() {
        let reg = EvaluationResult::Regression(RegressionResult {
            predictions: vec![1.5, 2.5],
            actuals: None,
        });
        assert_eq!(reg.task(), TaskKind::Regression);
        assert_eq!(reg.len(), 2);
        assert!(reg.as_classification().is_none());
        let labelled = reg.with_actuals(&[1.0, 3.0]);
        assert_eq!(labelled.as_regression().unwrap().actuals, Some(vec![1.0, 3.0]));

        let cls = EvaluationResult::Classification(ClassificationResult::new(
            vec![1, 0],
            Some(vec![0.9, 0.6]),
            &LabelMap::new(),
        ));
        assert_eq!(cls.predictions_f64(), vec![1.0, 0.0]);
        assert_eq!(cls.as_classification().unwrap().prediction_labels, vec!["1", "0"]);
        assert_eq!(cls.clone().with_actuals(&[1.0, 1.0]), cls);
    }
}
