//! Concrete estimator backends.
//!
//! [`Model`] is the closed set of backends a weapon can hold. It is
//! serialized with a `model_type` tag so saved artifacts name the
//! algorithm they contain:
//!
//! ```json
//! { "model_type": "decision_tree_regressor", "max_depth": 5, "state": { ... } }
//! ```

mod knn;
mod linear;
mod logistic;
mod svm;
mod svr;
mod tree;

pub use knn::KnnClassifier;
pub use linear::{LinearRegression, PolynomialRegression};
pub use logistic::LogisticRegression;
pub use svm::SvmClassifier;
pub use svr::Svr;
pub use tree::{DecisionTreeRegressor, TreeNode};

use serde::{Deserialize, Serialize};
use types::TaskKind;

use crate::error::Result;
use crate::estimator::{Estimator, ParamGrid, ParamSet};

/// Any supported estimator backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model_type", rename_all = "snake_case")]
pub enum Model {
    LinearRegression(LinearRegression),
    PolynomialRegression(PolynomialRegression),
    DecisionTreeRegressor(DecisionTreeRegressor),
    Svr(Svr),
    LogisticRegression(LogisticRegression),
    SvmClassifier(SvmClassifier),
    KnnClassifier(KnnClassifier),
}

macro_rules! dispatch {
    ($self:expr, $m:ident => $body:expr) => {
        match $self {
            Model::LinearRegression($m) => $body,
            Model::PolynomialRegression($m) => $body,
            Model::DecisionTreeRegressor($m) => $body,
            Model::Svr($m) => $body,
            Model::LogisticRegression($m) => $body,
            Model::SvmClassifier($m) => $body,
            Model::KnnClassifier($m) => $body,
        }
    };
}

impl Model {
    /// Task the backend solves.
    pub fn task(&self) -> TaskKind {
        match self {
            Model::LinearRegression(_)
            | Model::PolynomialRegression(_)
            | Model::DecisionTreeRegressor(_)
            | Model::Svr(_) => TaskKind::Regression,
            Model::LogisticRegression(_) | Model::SvmClassifier(_) | Model::KnnClassifier(_) => {
                TaskKind::Classification
            }
        }
    }

    /// Check that decoded fitted state is internally consistent.
    ///
    /// Unfitted models always pass. Artifacts are validated on load so a
    /// damaged file fails there instead of panicking at prediction time.
    pub fn validate(&self) -> Result<()> {
        dispatch!(self, m => m.validate())
    }

    /// Serialized tag of this backend.
    pub fn model_type(&self) -> &'static str {
        match self {
            Model::LinearRegression(_) => "linear_regression",
            Model::PolynomialRegression(_) => "polynomial_regression",
            Model::DecisionTreeRegressor(_) => "decision_tree_regressor",
            Model::Svr(_) => "svr",
            Model::LogisticRegression(_) => "logistic_regression",
            Model::SvmClassifier(_) => "svm_classifier",
            Model::KnnClassifier(_) => "knn_classifier",
        }
    }
}

impl Estimator for Model {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        dispatch!(self, m => m.fit(x, y))
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        dispatch!(self, m => m.predict(x))
    }

    fn predict_confidence(&self, x: &[Vec<f64>]) -> Option<Result<Vec<f64>>> {
        dispatch!(self, m => m.predict_confidence(x))
    }

    fn param_grid(&self) -> Option<ParamGrid> {
        dispatch!(self, m => m.param_grid())
    }

    fn set_param(&mut self, name: &str, value: f64) -> Result<()> {
        dispatch!(self, m => m.set_param(name, value))
    }

    fn params(&self) -> ParamSet {
        dispatch!(self, m => m.params())
    }

    fn is_fitted(&self) -> bool {
        dispatch!(self, m => m.is_fitted())
    }
}

macro_rules! impl_from {
    ($($variant:ident),*) => {
        $(impl From<$variant> for Model {
            fn from(m: $variant) -> Self {
                Model::$variant(m)
            }
        })*
    };
}

impl_from!(
    LinearRegression,
    PolynomialRegression,
    DecisionTreeRegressor,
    Svr,
    LogisticRegression,
    SvmClassifier,
    KnnClassifier
);
