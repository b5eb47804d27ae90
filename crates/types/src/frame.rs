//! Two-dimensional numeric table consumed by every estimator.
//!
//! A [`Frame`] is row-major: one `Vec<f64>` per sample, with one value per
//! column. Columns are addressed either by name (labeled tables) or by
//! position (plain numeric matrices coerced into a frame). Missing values
//! are represented as `NaN`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Column identifier: a feature name, or a positional index for matrix input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnKey {
    Position(usize),
    Name(String),
}

impl ColumnKey {
    /// True for positional placeholders produced by matrix coercion.
    pub fn is_positional(&self) -> bool {
        matches!(self, ColumnKey::Position(_))
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKey::Position(i) => write!(f, "{}", i),
            ColumnKey::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<&str> for ColumnKey {
    fn from(name: &str) -> Self {
        ColumnKey::Name(name.to_string())
    }
}

impl From<String> for ColumnKey {
    fn from(name: String) -> Self {
        ColumnKey::Name(name)
    }
}

impl From<usize> for ColumnKey {
    fn from(position: usize) -> Self {
        ColumnKey::Position(position)
    }
}

/// Structural problems with tabular input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameError {
    #[error("row {row} has {found} values, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("duplicate column '{0}'")]
    DuplicateColumn(ColumnKey),

    #[error("column '{0}' not found")]
    MissingColumn(ColumnKey),

    #[error("expected {expected} column names, got {found}")]
    ColumnCount { expected: usize, found: usize },
}

/// Row-major numeric table with named or positional columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    columns: Vec<ColumnKey>,
    rows: Vec<Vec<f64>>,
}

impl Frame {
    /// Build a frame from explicit column keys and rows.
    ///
    /// # Errors
    /// - Duplicate column keys
    /// - Any row whose width differs from the column count
    pub fn new(columns: Vec<ColumnKey>, rows: Vec<Vec<f64>>) -> Result<Self, FrameError> {
        let mut seen = HashSet::with_capacity(columns.len());
        for key in &columns {
            if !seen.insert(key) {
                return Err(FrameError::DuplicateColumn(key.clone()));
            }
        }

        check_row_widths(&rows, columns.len())?;
        Ok(Self { columns, rows })
    }

    /// Build a labeled frame from feature names.
    pub fn with_names<S: Into<String>>(
        names: impl IntoIterator<Item = S>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, FrameError> {
        let columns = names
            .into_iter()
            .map(|n| ColumnKey::Name(n.into()))
            .collect();
        Self::new(columns, rows)
    }

    /// Coerce a plain numeric matrix into a frame with positional columns `0..n`.
    pub fn from_matrix(rows: Vec<Vec<f64>>) -> Result<Self, FrameError> {
        let width = rows.first().map_or(0, Vec::len);
        let columns = (0..width).map(ColumnKey::Position).collect();
        Self::new(columns, rows)
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[ColumnKey] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[f64]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn into_rows(self) -> Vec<Vec<f64>> {
        self.rows
    }

    pub fn into_parts(self) -> (Vec<ColumnKey>, Vec<Vec<f64>>) {
        (self.columns, self.rows)
    }

    /// Position of `key` in the column order.
    pub fn column_position(&self, key: &ColumnKey) -> Option<usize> {
        self.columns.iter().position(|c| c == key)
    }

    /// Copy out a single column.
    pub fn column_values(&self, key: &ColumnKey) -> Option<Vec<f64>> {
        let idx = self.column_position(key)?;
        Some(self.rows.iter().map(|row| row[idx]).collect())
    }

    /// Project onto `keys`, in the given order.
    pub fn select_columns(&self, keys: &[ColumnKey]) -> Result<Frame, FrameError> {
        let positions = keys
            .iter()
            .map(|k| {
                self.column_position(k)
                    .ok_or_else(|| FrameError::MissingColumn(k.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.select_positions(keys.to_vec(), &positions))
    }

    /// Project onto column positions, relabeling the result with `columns`.
    ///
    /// Positions must be in range; callers resolve them first.
    pub fn select_positions(&self, columns: Vec<ColumnKey>, positions: &[usize]) -> Frame {
        let rows = self
            .rows
            .iter()
            .map(|row| positions.iter().map(|&p| row[p]).collect())
            .collect();
        Frame { columns, rows }
    }

    /// Drop a column, returning the remaining frame.
    pub fn drop_column(&self, key: &ColumnKey) -> Result<Frame, FrameError> {
        let idx = self
            .column_position(key)
            .ok_or_else(|| FrameError::MissingColumn(key.clone()))?;
        let keep: Vec<usize> = (0..self.n_cols()).filter(|&i| i != idx).collect();
        let columns = keep.iter().map(|&i| self.columns[i].clone()).collect();
        Ok(self.select_positions(columns, &keep))
    }

    /// New frame containing the given rows, in the given order.
    ///
    /// Indices must be in range.
    pub fn take_rows(&self, indices: &[usize]) -> Frame {
        Frame {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Keep only rows for which `keep` returns true.
    pub fn filter_rows(&self, mut keep: impl FnMut(&[f64]) -> bool) -> Frame {
        Frame {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| keep(row))
                .cloned()
                .collect(),
        }
    }

    /// Replace the column keys, keeping the data.
    pub fn rename_columns(self, columns: Vec<ColumnKey>) -> Result<Frame, FrameError> {
        if columns.len() != self.columns.len() {
            return Err(FrameError::ColumnCount {
                expected: self.columns.len(),
                found: columns.len(),
            });
        }
        Frame::new(columns, self.rows)
    }

    /// Apply `f` to every cell.
    pub fn map_values(mut self, f: impl Fn(f64) -> f64) -> Frame {
        for row in &mut self.rows {
            for v in row.iter_mut() {
                *v = f(*v);
            }
        }
        self
    }

    /// First `(row, column)` holding a NaN or infinite value.
    pub fn first_non_finite(&self) -> Option<(usize, usize)> {
        self.rows.iter().enumerate().find_map(|(r, row)| {
            row.iter().position(|v| !v.is_finite()).map(|c| (r, c))
        })
    }
}

impl TryFrom<Vec<Vec<f64>>> for Frame {
    type Error = FrameError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        Frame::from_matrix(rows)
    }
}

fn check_row_widths(rows: &[Vec<f64>], expected: usize) -> Result<(), FrameError> {
    match rows.iter().enumerate().find(|(_, r)| r.len() != expected) {
        Some((row, r)) => Err(FrameError::RaggedRow {
            row,
            expected,
            found: r.len(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Frame {
        Frame::with_names(
            ["a", "b", "c"],
            vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_matrix_coercion_uses_positions() {
        let frame = Frame::from_matrix(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(
            frame.columns(),
            &[ColumnKey::Position(0), ColumnKey::Position(1)]
        );
        assert!(frame.columns().iter().all(ColumnKey::is_positional));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = Frame::from_matrix(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert_eq!(
            err,
            FrameError::RaggedRow {
                row: 1,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let err = Frame::with_names(["a", "a"], vec![vec![1.0, 2.0]]).unwrap_err();
        assert_eq!(err, FrameError::DuplicateColumn(ColumnKey::from("a")));
    }

    #[test]
    fn test_select_columns_reorders() {
        let frame = sample();
        let picked = frame
            .select_columns(&[ColumnKey::from("c"), ColumnKey::from("a")])
            .unwrap();
        assert_eq!(picked.rows(), &[vec![3.0, 1.0], vec![6.0, 4.0]]);
    }

    #[test]
    fn test_select_missing_column() {
        let err = sample()
            .select_columns(&[ColumnKey::from("zzz")])
            .unwrap_err();
        assert_eq!(err, FrameError::MissingColumn(ColumnKey::from("zzz")));
    }

    #[test]
    fn test_drop_column() {
        let frame = sample().drop_column(&ColumnKey::from("b")).unwrap();
        assert_eq!(frame.columns(), &[ColumnKey::from("a"), ColumnKey::from("c")]);
        assert_eq!(frame.rows(), &[vec![1.0, 3.0], vec![4.0, 6.0]]);
    }

    #[test]
    fn test_first_non_finite() {
        let frame = Frame::from_matrix(vec![vec![1.0, 2.0], vec![f64::NAN, 4.0]]).unwrap();
        assert_eq!(frame.first_non_finite(), Some((1, 0)));
        assert_eq!(sample().first_non_finite(), None);
    }

    #[test]
    fn test_column_key_serde_shapes() {
        let keys = vec![ColumnKey::from("mean radius"), ColumnKey::Position(3)];
        let json = serde_json::to_string(&keys).unwrap();
        assert_eq!(json, r#"["mean radius",3]"#);
        let back: Vec<ColumnKey> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, keys);
    }
}
