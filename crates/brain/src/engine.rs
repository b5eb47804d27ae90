//! The decision engine.
//!
//! A mission runs in two phases:
//!
//! 1. **Recall**: score every remembered artifact on the mission's test set
//!    and reuse the best one if it clears the threshold.
//! 2. **Train**: otherwise train every candidate in the roster, keep the
//!    best on the test set and persist it to memory.
//!
//! Artifacts and candidates that fail are logged and skipped. Only caller
//! contract violations (a classification mission without a label map)
//! return an error.

use std::path::PathBuf;
use tracing::{info, warn};

use types::{Frame, LabelMap, TaskKind};
use weapons::{GridSearch, Scoring, Weapon};

use crate::config::BrainConfig;
use crate::error::{BrainError, Result};
use crate::registry::ModelRegistry;
use crate::roster::CandidateRoster;

// =============================================================================
// Mission
// =============================================================================

/// One model-selection request: the task, its splits and the quality bar.
#[derive(Debug, Clone)]
pub struct Mission {
    pub task: TaskKind,
    pub x_train: Frame,
    pub y_train: Vec<f64>,
    pub x_test: Frame,
    pub y_test: Vec<f64>,
    /// Required for classification.
    pub label_map: Option<LabelMap>,
    /// Minimum recall score; falls back to the engine default.
    pub threshold: Option<f64>,
}

impl Mission {
    pub fn new(
        task: TaskKind,
        x_train: Frame,
        y_train: Vec<f64>,
        x_test: Frame,
        y_test: Vec<f64>,
    ) -> Self {
        Self {
            task,
            x_train,
            y_train,
            x_test,
            y_test,
            label_map: None,
            threshold: None,
        }
    }

    pub fn label_map(mut self, label_map: LabelMap) -> Self {
        self.label_map = Some(label_map);
        self
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.task == TaskKind::Classification && self.label_map.is_none() {
            return Err(BrainError::MissingLabelMap);
        }
        Ok(())
    }
}

// =============================================================================
// Solution
// =============================================================================

/// Where a mission's winning weapon came from.
#[derive(Debug, Clone, PartialEq)]
pub enum SolutionSource {
    /// Reused from the artifact at `path`.
    Recalled { path: PathBuf },
    /// Trained for this mission. `saved_to` is `None` if persisting failed.
    Trained { saved_to: Option<PathBuf> },
}

#[derive(Debug, Clone)]
pub struct Solution {
    pub weapon: Weapon,
    /// Test-set score: accuracy or R².
    pub score: f64,
    pub source: SolutionSource,
}

impl Solution {
    pub fn is_recalled(&self) -> bool {
        matches!(self.source, SolutionSource::Recalled { .. })
    }
}

// =============================================================================
// Brain
// =============================================================================

#[derive(Debug)]
pub struct Brain {
    config: BrainConfig,
    registry: ModelRegistry,
    roster: CandidateRoster,
}

impl Brain {
    /// Open the engine over `config.memory_path` with the standard roster.
    pub fn new(config: BrainConfig) -> Result<Self> {
        let registry = ModelRegistry::new(&config.memory_path)?;
        Ok(Self {
            config,
            registry,
            roster: CandidateRoster::standard(),
        })
    }

    /// Replace the candidates trained when recall fails.
    pub fn with_roster(mut self, roster: CandidateRoster) -> Self {
        self.roster = roster;
        self
    }

    pub fn config(&self) -> &BrainConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Recall a remembered model or train a new one.
    ///
    /// Returns `Ok(None)` when recall fails and no candidate could be
    /// trained.
    pub fn solve_mission(&self, mission: &Mission) -> Result<Option<Solution>> {
        mission.validate()?;
        let threshold = mission.threshold.unwrap_or(self.config.default_threshold);

        info!(
            task = %mission.task,
            threshold,
            train_rows = mission.x_train.n_rows(),
            test_rows = mission.x_test.n_rows(),
            "Mission received"
        );

        if let Some(solution) = self.recall_memory(mission, threshold) {
            return Ok(Some(solution));
        }
        self.think_and_train(mission)
    }

    /// Best remembered artifact scoring at least `threshold`, if any.
    pub fn recall_memory(&self, mission: &Mission, threshold: f64) -> Option<Solution> {
        info!("Recalling memory");
        let metric = mission.task.metric_name();

        let mut best: Option<(Weapon, f64, PathBuf)> = None;
        for artifact in self.registry.load_all_models() {
            if artifact.weapon.task() != mission.task {
                warn!(
                    model = %artifact.name,
                    model_task = %artifact.weapon.task(),
                    "Skipping memory of another task"
                );
                continue;
            }
            let score = match artifact.weapon.score(&mission.x_test, &mission.y_test) {
                Ok(score) if score.is_finite() => score,
                Ok(score) => {
                    warn!(model = %artifact.name, score, "Skipping memory with non-finite score");
                    continue;
                }
                Err(e) => {
                    warn!(model = %artifact.name, error = %e, "Memory does not fit this mission");
                    continue;
                }
            };
            info!(model = %artifact.name, metric, score, "Remembered model scored");
            if best.as_ref().is_none_or(|(_, b, _)| score > *b) {
                best = Some((artifact.weapon, score, artifact.path));
            }
        }

        match best {
            Some((weapon, score, path)) if score >= threshold => {
                info!(
                    model = %weapon.name(),
                    metric,
                    score,
                    threshold,
                    path = %path.display(),
                    "Memory recalled"
                );
                Some(Solution {
                    weapon,
                    score,
                    source: SolutionSource::Recalled { path },
                })
            }
            Some((weapon, score, _)) => {
                info!(
                    model = %weapon.name(),
                    metric,
                    score,
                    threshold,
                    "Best memory below threshold"
                );
                None
            }
            None => {
                info!("No usable memory");
                None
            }
        }
    }

    /// Train every candidate, keep the best on the test set and save it.
    pub fn think_and_train(&self, mission: &Mission) -> Result<Option<Solution>> {
        let candidates = self
            .roster
            .instantiate(mission.task, mission.label_map.as_ref())?;
        let metric = mission.task.metric_name();
        let search = GridSearch::new(self.config.cv_folds, Self::scoring(mission.task))
            .sequential(self.config.force_sequential_search);

        info!(task = %mission.task, candidates = candidates.len(), "Training candidates");

        let mut best: Option<(Weapon, f64)> = None;
        for mut weapon in candidates {
            info!(model = %weapon.name(), "Training");
            let trained = match weapon.param_grid() {
                Some(grid) => weapon.optimize_with(&search, &mission.x_train, &mission.y_train, &grid),
                None => weapon.fit(&mission.x_train, &mission.y_train),
            };
            if let Err(e) = trained {
                warn!(model = %weapon.name(), error = %e, "Candidate failed to train");
                continue;
            }

            let score = match weapon.score(&mission.x_test, &mission.y_test) {
                Ok(score) if score.is_finite() => score,
                Ok(score) => {
                    warn!(model = %weapon.name(), score, "Candidate scored non-finite");
                    continue;
                }
                Err(e) => {
                    warn!(model = %weapon.name(), error = %e, "Candidate failed to predict");
                    continue;
                }
            };
            info!(model = %weapon.name(), metric, score, "Candidate scored");

            if best.as_ref().is_none_or(|(_, b)| score > *b) {
                best = Some((weapon, score));
            }
        }

        let Some((weapon, score)) = best else {
            warn!(task = %mission.task, "No candidate survived training");
            return Ok(None);
        };
        info!(model = %weapon.name(), metric, score, "Winner");

        let saved_to = match weapon.save(&self.config.memory_path) {
            Ok(path) => path,
            Err(e) => {
                warn!(model = %weapon.name(), error = %e, "Failed to save winner");
                None
            }
        };

        Ok(Some(Solution {
            weapon,
            score,
            source: SolutionSource::Trained { saved_to },
        }))
    }

    fn scoring(task: TaskKind) -> Scoring {
        match task {
            TaskKind::Classification => Scoring::Accuracy,
            TaskKind::Regression => Scoring::R2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use weapons::arsenal;

    fn line_mission() -> Mission {
        let rows: Vec<Vec<f64>> = (0..12).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = rows.iter().map(|r| 2.0 * r[0] + 1.0).collect();
        let x_train = Frame::with_names(["a"], rows[..9].to_vec()).unwrap();
        let x_test = Frame::with_names(["a"], rows[9..].to_vec()).unwrap();
        Mission::new(
            TaskKind::Regression,
            x_train,
            y[..9].to_vec(),
            x_test,
            y[9..].to_vec(),
        )
    }

    fn brain(dir: &TempDir, roster: CandidateRoster) -> Brain {
        let config = BrainConfig::default()
            .memory_path(dir.path())
            .force_sequential_search(true);
        Brain::new(config).unwrap().with_roster(roster)
    }

    #[test]
    fn test_threshold_defaults_to_config() {
        let dir = TempDir::new().unwrap();
        let brain = brain(&dir, CandidateRoster::empty().with_regressor(arsenal::linear_regression()));
        let mission = line_mission();

        let trained = brain.solve_mission(&mission).unwrap().unwrap();
        assert!(!trained.is_recalled());
        assert!((trained.score - 1.0).abs() < 1e-9);

        // A perfect fit clears the default 0.85 on the second run
        let recalled = brain.solve_mission(&mission).unwrap().unwrap();
        assert!(recalled.is_recalled());
    }

    #[test]
    fn test_empty_roster_yields_no_solution() {
        let dir = TempDir::new().unwrap();
        let brain = brain(&dir, CandidateRoster::empty());
        assert!(brain.solve_mission(&line_mission()).unwrap().is_none());
        assert!(brain.registry().is_empty());
    }

    #[test]
    fn test_failing_candidate_is_skipped() {
        let dir = TempDir::new().unwrap();
        // Ten folds cannot split nine rows, so the tuned tree fails; the
        // untuned linear model never searches
        let config = BrainConfig::default()
            .memory_path(dir.path())
            .cv_folds(10)
            .force_sequential_search(true);
        let roster = CandidateRoster::empty()
            .with_regressor(arsenal::regression_tree(Some(3)))
            .with_regressor(arsenal::linear_regression());
        let brain = Brain::new(config).unwrap().with_roster(roster);

        let solution = brain.solve_mission(&line_mission()).unwrap().unwrap();
        assert_eq!(solution.weapon.name(), "LinearRegression");
        assert!(matches!(solution.source, SolutionSource::Trained { saved_to: Some(_) }));
    }

    #[test]
    fn test_recall_rejects_below_threshold() {
        let dir = TempDir::new().unwrap();
        let brain = brain(&dir, CandidateRoster::empty().with_regressor(arsenal::linear_regression()));
        let mission = line_mission();
        brain.solve_mission(&mission).unwrap();

        assert!(brain.recall_memory(&mission, 1.5).is_none());
        assert!(brain.recall_memory(&mission, 0.5).is_some());
    }
}
