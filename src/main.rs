//! ares CLI - recall a remembered model or train the best candidate

mod config;

use anyhow::bail;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

use brain::{Brain, BrainConfig, Mission, ModelRegistry, SolutionSource};
use refinery::{Scaler, clean_column_names, drop_missing, remove_duplicates, split_x_y};
use types::{ColumnKey, TaskKind};

use crate::config::MissionFile;

#[derive(Parser)]
#[command(name = "ares")]
#[command(about = "AutoML model selection with a persistent model memory")]
struct Cli {
    /// Engine config (TOML); defaults apply if the file does not exist
    #[arg(short, long, env = "ARES_CONFIG", default_value = "ares.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a mission described by a TOML file
    Solve {
        #[arg(value_name = "MISSION")]
        mission: PathBuf,
    },
    /// Delete every remembered model
    Clear,
    /// List remembered models
    List,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = BrainConfig::load(&cli.config)?;

    match cli.command {
        Commands::Solve { mission } => solve(config, MissionFile::load(&mission)?)?,
        Commands::Clear => {
            let registry = ModelRegistry::new(&config.memory_path)?;
            let removed = registry.clear_memory();
            info!(removed, path = %registry.memory_path().display(), "Memory cleared");
        }
        Commands::List => {
            let registry = ModelRegistry::new(&config.memory_path)?;
            for artifact in registry.load_all_models() {
                info!(
                    name = %artifact.name,
                    task = %artifact.weapon.task(),
                    saved_at = ?artifact.saved_at,
                    path = %artifact.path.display(),
                    "Remembered"
                );
            }
        }
    }

    Ok(())
}

fn solve(mut config: BrainConfig, file: MissionFile) -> anyhow::Result<()> {
    let task: TaskKind = file.task.parse()?;
    if let Some(path) = &file.memory_path {
        config = config.memory_path(path.clone());
    }

    // Step 1: load and clean the table
    let mut table = refinery::load_table(&file.data.path)?;
    info!(
        path = %file.data.path.display(),
        rows = table.n_rows(),
        cols = table.n_cols(),
        "Loaded table"
    );
    if file.cleaning.clean_column_names {
        table = clean_column_names(table)?;
    }
    if file.cleaning.drop_missing {
        table = drop_missing(&table);
    }
    if file.cleaning.remove_duplicates {
        table = remove_duplicates(&table, None)?;
    }

    // Step 2: separate the target and split
    let target = ColumnKey::from(file.data.target.as_str());
    let (features, Some(y)) = split_x_y(&table, &target)? else {
        bail!("target column '{}' not found", file.data.target);
    };
    let mut split = refinery::train_test_split(&features, &y, file.data.test_size, file.data.seed)?;
    if let Some(method) = file.cleaning.scale {
        let (scaler, x_train) = Scaler::fit_transform(&split.x_train, method)?;
        split.x_test = scaler.transform(&split.x_test)?;
        split.x_train = x_train;
    }

    // Step 3: run the mission
    let mut mission = Mission::new(task, split.x_train, split.y_train, split.x_test, split.y_test);
    if let Some(labels) = file.label_map()? {
        mission = mission.label_map(labels);
    }
    if let Some(threshold) = file.threshold {
        mission = mission.threshold(threshold);
    }

    let brain = Brain::new(config)?;
    match brain.solve_mission(&mission)? {
        Some(solution) => {
            let origin = match &solution.source {
                SolutionSource::Recalled { path } => format!("recalled from {}", path.display()),
                SolutionSource::Trained { saved_to: Some(path) } => {
                    format!("trained, saved to {}", path.display())
                }
                SolutionSource::Trained { saved_to: None } => "trained, not saved".to_string(),
            };
            info!(
                model = %solution.weapon.name(),
                metric = task.metric_name(),
                score = solution.score,
                %origin,
                "Mission solved"
            );
            solution.weapon.evaluate(&mission.x_test, &mission.y_test)?;
        }
        None => warn!(task = %task, "No model could solve the mission"),
    }

    Ok(())
}
