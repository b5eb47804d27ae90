//! The Ares decision engine ("brain").
//!
//! Given a mission (a task kind, train and test splits, an optional label map
//! and a quality threshold), the brain first tries to **recall** a model from
//! its on-disk memory. If nothing remembered is good enough it **trains**
//! every candidate weapon, keeps the best one and remembers it.
//!
//! ```text
//! solve_mission
//!   ├── recall_memory ── ModelRegistry::load_all_models ── score on test set
//!   └── think_and_train ── CandidateRoster ── fit / optimize ── save winner
//! ```
//!
//! Everything runs on the caller's thread. Grid search inside a candidate may
//! fan out across cores (`parallel` feature) unless
//! `force_sequential_search` is set in [`BrainConfig`].

mod config;
mod engine;
mod error;
mod registry;
mod roster;

pub use config::BrainConfig;
pub use engine::{Brain, Mission, Solution, SolutionSource};
pub use error::{BrainError, Result};
pub use registry::{ArtifactScan, ModelRegistry};
pub use roster::{CandidateRoster, ClassifierFactory};
