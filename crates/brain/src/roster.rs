//! Candidate weapons the engine trains when recall fails.
//!
//! Regressors need nothing from the mission, so they are stored as untrained
//! templates and cloned for each mission. Classifiers carry the caller's
//! label map and are built by factories on every mission instead.
//!
//! A candidate whose task does not match its slot is dropped with a
//! warning, never trained.

use std::fmt;
use tracing::warn;

use types::{LabelMap, TaskKind};
use weapons::{Weapon, arsenal};

use crate::error::{BrainError, Result};

/// Builds one classification candidate for a mission's label map.
pub type ClassifierFactory = Box<dyn Fn(&LabelMap) -> Weapon + Send + Sync>;

pub struct CandidateRoster {
    regressors: Vec<Weapon>,
    classifier_factories: Vec<ClassifierFactory>,
}

impl CandidateRoster {
    /// The default candidates, in the order they are tried.
    pub fn standard() -> Self {
        Self::empty()
            .with_regressor(arsenal::linear_regression())
            .with_regressor(arsenal::polynomial_regression(2))
            .with_regressor(arsenal::regression_tree(Some(5)))
            .with_regressor(arsenal::svr())
            .with_classifier(arsenal::logistic_regression)
            .with_classifier(arsenal::svm_classifier)
            .with_classifier(|labels: &LabelMap| arsenal::knn_classifier(labels, 5))
    }

    pub fn empty() -> Self {
        Self {
            regressors: Vec::new(),
            classifier_factories: Vec::new(),
        }
    }

    /// Append an untrained regression template. Classifiers are ignored.
    pub fn with_regressor(mut self, weapon: Weapon) -> Self {
        if weapon.task() != TaskKind::Regression {
            warn!(
                model = %weapon.name(),
                task = %weapon.task(),
                "Ignoring non-regression candidate"
            );
            return self;
        }
        self.regressors.push(weapon);
        self
    }

    /// Append a classifier factory. Weapons it builds for another task are
    /// dropped when the roster is instantiated.
    pub fn with_classifier<F>(mut self, factory: F) -> Self
    where
        F: Fn(&LabelMap) -> Weapon + Send + Sync + 'static,
    {
        self.classifier_factories.push(Box::new(factory));
        self
    }

    /// Fresh, untrained candidates for one mission.
    pub fn instantiate(&self, task: TaskKind, label_map: Option<&LabelMap>) -> Result<Vec<Weapon>> {
        match task {
            TaskKind::Regression => Ok(self.regressors.clone()),
            TaskKind::Classification => {
                let labels = label_map.ok_or(BrainError::MissingLabelMap)?;
                Ok(self
                    .classifier_factories
                    .iter()
                    .map(|factory| factory(labels))
                    .filter(|weapon| {
                        let fits = weapon.task() == TaskKind::Classification;
                        if !fits {
                            warn!(
                                model = %weapon.name(),
                                task = %weapon.task(),
                                "Ignoring non-classification candidate"
                            );
                        }
                        fits
                    })
                    .collect())
            }
        }
    }

    pub fn len(&self, task: TaskKind) -> usize {
        match task {
            TaskKind::Regression => self.regressors.len(),
            TaskKind::Classification => self.classifier_factories.len(),
        }
    }
}

impl Default for CandidateRoster {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for CandidateRoster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateRoster")
            .field(
                "regressors",
                &self.regressors.iter().map(Weapon::name).collect::<Vec<_>>(),
            )
            .field("classifier_factories", &self.classifier_factories.len())
            .finish()
    }
}
