//! Loading tables from JSON.
//!
//! The file layout is column keys plus row-major values, with `null` for a
//! missing reading:
//!
//! ```json
//! {
//!   "columns": ["age", "dose", "toxic"],
//!   "rows": [[54, 1.5, 0], [61, null, 1]]
//! }
//! ```
//!
//! Integer column keys produce positional columns.

use serde::Deserialize;
use std::fs;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

use types::{ColumnKey, Frame};

use crate::error::Result;

#[derive(Debug, Deserialize)]
struct TableFile {
    columns: Vec<ColumnKey>,
    rows: Vec<Vec<Option<f64>>>,
}

impl TableFile {
    fn into_frame(self) -> Result<Frame> {
        let rows = self
            .rows
            .into_iter()
            .map(|row| row.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
            .collect();
        Ok(Frame::new(self.columns, rows)?)
    }
}

/// Read a table file from disk.
pub fn load_table(path: &Path) -> Result<Frame> {
    let reader = BufReader::new(fs::File::open(path)?);
    let table: TableFile = serde_json::from_reader(reader)?;
    let frame = table.into_frame()?;
    info!(
        path = %path.display(),
        rows = frame.n_rows(),
        cols = frame.n_cols(),
        "Loaded table"
    );
    Ok(frame)
}

/// Parse a table from a JSON string.
pub fn parse_table(json: &str) -> Result<Frame> {
    serde_json::from_str::<TableFile>(json)?.into_frame()
}
