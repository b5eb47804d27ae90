//! Ready-made weapons with the display names and defaults used by the
//! decision engine's candidate roster.

use types::LabelMap;

use crate::models::{
    DecisionTreeRegressor, KnnClassifier, LinearRegression, LogisticRegression,
    PolynomialRegression, SvmClassifier, Svr,
};
use crate::weapon::Weapon;

pub fn linear_regression() -> Weapon {
    Weapon::regressor("LinearRegression", LinearRegression::new())
}

pub fn polynomial_regression(degree: usize) -> Weapon {
    Weapon::regressor(
        format!("PolyRegression(deg={})", degree),
        PolynomialRegression::new(degree),
    )
}

/// CART regressor; tuned over `max_depth` in {3, 5, 8}.
pub fn regression_tree(max_depth: Option<usize>) -> Weapon {
    Weapon::regressor("RegressionTree", DecisionTreeRegressor::new(max_depth))
}

/// RBF epsilon-SVR; tuned over `c` in {0.1, 1, 10}.
pub fn svr() -> Weapon {
    Weapon::regressor("SVR(rbf)", Svr::new())
}

pub fn logistic_regression(label_map: &LabelMap) -> Weapon {
    Weapon::classifier(
        "LogisticRegression",
        LogisticRegression::new(),
        label_map.clone(),
    )
}

/// RBF one-vs-rest SVC with probability output.
pub fn svm_classifier(label_map: &LabelMap) -> Weapon {
    Weapon::classifier("SVM", SvmClassifier::new(), label_map.clone())
}

/// k-NN vote. `k` is part of the name, so this weapon is never tuned.
pub fn knn_classifier(label_map: &LabelMap, k: usize) -> Weapon {
    Weapon::classifier(
        format!("KNN(k={})", k),
        KnnClassifier::new(k),
        label_map.clone(),
    )
}
