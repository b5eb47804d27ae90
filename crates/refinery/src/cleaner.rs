//! Row and column hygiene for raw tables.
//!
//! Missing values are NaN throughout. Every operation returns a new frame
//! and logs how many rows it touched.

use std::collections::HashSet;
use tracing::info;

use types::{ColumnKey, Frame};

use crate::error::Result;

/// Drop every row containing a NaN.
pub fn drop_missing(frame: &Frame) -> Frame {
    let cleaned = frame.filter_rows(|row| !row.iter().any(|v| v.is_nan()));
    let dropped = frame.n_rows() - cleaned.n_rows();
    if dropped > 0 {
        info!(dropped, "Removed rows with missing values");
    }
    cleaned
}

/// Replace every NaN with `value`.
pub fn fill_missing(frame: Frame, value: f64) -> Frame {
    info!(value, "Filling missing values");
    frame.map_values(|v| if v.is_nan() { value } else { v })
}

/// Drop repeated rows, keeping the first occurrence.
///
/// With `subset`, only those columns are compared. NaN equals NaN here, as
/// two missing readings of the same record are still the same record.
pub fn remove_duplicates(frame: &Frame, subset: Option<&[ColumnKey]>) -> Result<Frame> {
    let positions: Vec<usize> = match subset {
        Some(keys) => keys
            .iter()
            .map(|k| {
                frame
                    .column_position(k)
                    .ok_or_else(|| types::FrameError::MissingColumn(k.clone()))
            })
            .collect::<std::result::Result<_, _>>()?,
        None => (0..frame.n_cols()).collect(),
    };

    let mut seen = HashSet::with_capacity(frame.n_rows());
    let cleaned = frame.filter_rows(|row| {
        let key: Vec<u64> = positions.iter().map(|&p| canonical_bits(row[p])).collect();
        seen.insert(key)
    });

    let removed = frame.n_rows() - cleaned.n_rows();
    if removed > 0 {
        info!(removed, "Removed duplicate rows");
    }
    Ok(cleaned)
}

/// Bit pattern with all NaNs collapsed and -0.0 folded into 0.0.
fn canonical_bits(v: f64) -> u64 {
    if v.is_nan() {
        f64::NAN.to_bits()
    } else if v == 0.0 {
        0.0f64.to_bits()
    } else {
        v.to_bits()
    }
}

/// Normalize column names: trim, spaces to underscores, lowercase.
///
/// `" Drug Toxicity "` becomes `"drug_toxicity"`. Positional columns are
/// left alone.
pub fn clean_column_names(frame: Frame) -> Result<Frame> {
    let columns = frame
        .columns()
        .iter()
        .map(|key| match key {
            ColumnKey::Name(name) => {
                ColumnKey::Name(name.trim().replace(' ', "_").to_lowercase())
            }
            ColumnKey::Position(_) => key.clone(),
        })
        .collect();
    Ok(frame.rename_columns(columns)?)
}

/// Trim surrounding whitespace and strip line breaks.
pub fn clean_text_basic(text: &str) -> String {
    text.trim().replace(['\n', '\r'], "")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Four rows: two identical, two with a missing value.
    fn dirty() -> Frame {
        Frame::with_names(["  ID ", "Val ", "Score"], vec![
            vec![1.0, 10.0, 0.5],
            vec![1.0, 10.0, 0.5],
            vec![2.0, f64::NAN, 0.7],
            vec![3.0, 30.0, f64::NAN],
        ])
        .unwrap()
    }

    #[test]
    fn test_drop_missing() {
        let cleaned = drop_missing(&dirty());
        assert_eq!(cleaned.n_rows(), 2);
        assert!(cleaned.first_non_finite().is_none());
    }

    #[test]
    fn test_fill_missing() {
        let filled = fill_missing(dirty(), 0.0);
        assert_eq!(filled.n_rows(), 4);
        assert_eq!(filled.row(2).unwrap()[1], 0.0);
        assert_eq!(filled.row(3).unwrap()[2], 0.0);
    }

    #[test]
    fn test_remove_duplicates() {
        let deduped = remove_duplicates(&dirty(), None).unwrap();
        assert_eq!(deduped.n_rows(), 3);

        let by_id = remove_duplicates(&dirty(), Some(&[ColumnKey::from("  ID ")])).unwrap();
        assert_eq!(by_id.n_rows(), 3);

        let missing = remove_duplicates(&dirty(), Some(&[ColumnKey::from("nope")]));
        assert!(missing.is_err());
    }

    #[test]
    fn test_duplicate_nan_rows_collapse() {
        let frame = Frame::from_matrix(vec![vec![f64::NAN, 1.0], vec![f64::NAN, 1.0]]).unwrap();
        assert_eq!(remove_duplicates(&frame, None).unwrap().n_rows(), 1);
    }

    #[test]
    fn test_clean_column_names() {
        let cleaned = clean_column_names(dirty()).unwrap();
        assert_eq!(
            cleaned.columns(),
            &[
                ColumnKey::from("id"),
                ColumnKey::from("val"),
                ColumnKey::from("score")
            ]
        );

        let spaced = Frame::with_names([" Drug Toxicity "], vec![vec![1.0]]).unwrap();
        assert_eq!(
            clean_column_names(spaced).unwrap().columns(),
            &[ColumnKey::from("drug_toxicity")]
        );
    }

    #[test]
    fn test_clean_text_basic() {
        assert_eq!(clean_text_basic("  ABC  "), "ABC");
        assert_eq!(clean_text_basic("line\r\nbreak\n"), "linebreak");
        assert_eq!(clean_text_basic(""), "");
    }
}
