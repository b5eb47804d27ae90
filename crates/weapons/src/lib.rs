//! Estimator wrappers ("weapons") for the Ares brain.
//!
//! Every candidate model the decision engine can train is a [`Weapon`]: a
//! backend implementing [`Estimator`], wrapped with a display name, the
//! feature schema seen at training time and an optional label map.
//!
//! # Architecture
//!
//! ```text
//! Weapon ── schema alignment, result wrapping, save/load
//!   └── Model (tagged enum, serde)
//!         ├── LinearRegression / PolynomialRegression
//!         ├── DecisionTreeRegressor
//!         ├── Svr
//!         ├── LogisticRegression
//!         ├── SvmClassifier
//!         └── KnnClassifier
//! ```
//!
//! Hyperparameter tuning goes through [`GridSearch`], which cross-validates
//! each combination of a [`ParamGrid`] and can fan combinations out across
//! cores via the `parallel` feature.

pub mod arsenal;
pub mod artifact;
mod error;
mod estimator;
mod linalg;
pub mod metrics;
pub mod models;
mod search;
mod weapon;

pub use artifact::{ARTIFACT_EXTENSIONS, ModelArtifact, is_artifact_path, read_artifact};
pub use error::{Result, WeaponError};
pub use estimator::{Estimator, ParamGrid, ParamSet, apply_params};
pub use metrics::{EvaluationReport, Scoring};
pub use models::Model;
pub use search::{GridSearch, SearchOutcome};
pub use weapon::{Tuning, Weapon};
