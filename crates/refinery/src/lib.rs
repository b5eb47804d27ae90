//! The data refinery: cleaning and shaping raw tables before they reach a
//! mission.
//!
//! - [`cleaner`]: missing values, duplicates, column names.
//! - [`transformer`]: target extraction, feature scaling, train/test split.
//! - [`dataset`]: loading tables from JSON files.

pub mod cleaner;
pub mod dataset;
mod error;
pub mod transformer;

pub use cleaner::{
    clean_column_names, clean_text_basic, drop_missing, fill_missing, remove_duplicates,
};
pub use dataset::{load_table, parse_table};
pub use error::{RefineryError, Result};
pub use transformer::{
    ScaleMethod, Scaler, TrainTestSplit, scale_features, split_x_y, train_test_split,
};
