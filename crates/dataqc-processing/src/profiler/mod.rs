//! Data-quality profiling.
//!
//! The profiler reads a dataset without modifying it and reports:
//! - missing values per column
//! - duplicate rows
//! - IQR outliers per numeric column
//! - shape and a preview of the first rows

mod statistics;

pub use statistics::{count_outliers, iqr_bounds, quantile_linear};

use crate::error::{Result, ResultExt};
use crate::types::EdaSummary;
use crate::utils::{any_value_to_json, column_as_f64, is_numeric_dtype};
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

/// Number of rows included in the summary preview.
pub const HEAD_ROWS: usize = 5;

/// Data profiler for computing [`EdaSummary`] values.
pub struct EdaProfiler;

impl EdaProfiler {
    /// Profile an entire dataset.
    pub fn profile(df: &DataFrame) -> Result<EdaSummary> {
        let missing = Self::missing_counts(df);
        let duplicates = Self::duplicate_rows(df)?;
        let outliers = Self::outlier_counts(df)?;
        let head = Self::head_records(df)?;

        debug!(
            "Profiled {:?}: {} duplicates, {} numeric columns",
            df.shape(),
            duplicates,
            outliers.len()
        );

        Ok(EdaSummary {
            shape: (df.height(), df.width()),
            missing,
            duplicates,
            outliers,
            head,
        })
    }

    fn missing_counts(df: &DataFrame) -> BTreeMap<String, usize> {
        df.get_columns()
            .iter()
            .map(|col| (col.name().to_string(), col.null_count()))
            .collect()
    }

    /// Count rows that repeat an earlier row exactly (nulls compare equal).
    fn duplicate_rows(df: &DataFrame) -> Result<usize> {
        let unique = df
            .unique::<&str, &str>(None, UniqueKeepStrategy::First, None)
            .context("Failed to count duplicate rows")?;
        Ok(df.height() - unique.height())
    }

    fn outlier_counts(df: &DataFrame) -> Result<BTreeMap<String, usize>> {
        let mut outliers = BTreeMap::new();

        for col in df.get_columns() {
            if !is_numeric_dtype(col.dtype()) {
                continue;
            }
            let name = col.name().to_string();
            let values = column_as_f64(df, &name)
                .context(format!("Failed to read numeric column '{}'", name))?;
            outliers.insert(name, count_outliers(&values));
        }

        Ok(outliers)
    }

    fn head_records(df: &DataFrame) -> Result<Vec<serde_json::Map<String, serde_json::Value>>> {
        let head = df.head(Some(HEAD_ROWS));
        let mut records = vec![serde_json::Map::new(); head.height()];

        for col in head.get_columns() {
            let series = col.as_materialized_series();
            for (idx, record) in records.iter_mut().enumerate() {
                record.insert(col.name().to_string(), any_value_to_json(series.get(idx)?));
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_profile_shape_and_missing() {
        let df = df![
            "age" => [Some(25i64), None, Some(40), Some(22)],
            "city" => [Some("Paris"), Some("Rome"), None, None],
        ]
        .unwrap();

        let summary = EdaProfiler::profile(&df).unwrap();

        assert_eq!(summary.shape, (4, 2));
        assert_eq!(summary.missing["age"], 1);
        assert_eq!(summary.missing["city"], 2);
        assert_eq!(summary.total_missing(), 3);
    }

    #[test]
    fn test_profile_counts_duplicates_after_first() {
        let df = df![
            "a" => [1i64, 1, 1, 2],
            "b" => ["x", "x", "x", "y"],
        ]
        .unwrap();

        let summary = EdaProfiler::profile(&df).unwrap();
        assert_eq!(summary.duplicates, 2);
    }

    #[test]
    fn test_profile_null_rows_are_duplicates() {
        let df = df!["a" => [None::<i64>, None]].unwrap();
        assert_eq!(EdaProfiler::profile(&df).unwrap().duplicates, 1);
    }

    #[test]
    fn test_profile_duplicates_with_null_cells() {
        let df = df![
            "a" => [Some(1i64), Some(1), None, None, Some(2)],
            "b" => ["x", "x", "y", "y", "z"],
        ]
        .unwrap();
        assert_eq!(EdaProfiler::profile(&df).unwrap().duplicates, 2);
    }

    #[test]
    fn test_profile_null_and_nan_are_distinct() {
        let df = df!["v" => [Some(f64::NAN), None, Some(1.0)]].unwrap();
        assert_eq!(EdaProfiler::profile(&df).unwrap().duplicates, 0);
    }

    #[test]
    fn test_profile_outliers_numeric_only() {
        let df = df![
            "value" => [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 100.0],
            "label" => ["a", "b", "a", "b", "a", "b", "a", "b", "a", "b"],
        ]
        .unwrap();

        let summary = EdaProfiler::profile(&df).unwrap();
        assert_eq!(summary.outliers.len(), 1);
        assert_eq!(summary.outliers["value"], 1);
    }

    #[test]
    fn test_profile_constant_column_has_no_outliers() {
        let df = df!["flat" => [3i64, 3, 3, 3, 3, 3]].unwrap();
        assert_eq!(EdaProfiler::profile(&df).unwrap().outliers["flat"], 0);
    }

    #[test]
    fn test_profile_head_is_capped_at_five() {
        let df = df!["n" => (0i64..12).collect::<Vec<_>>()].unwrap();
        let summary = EdaProfiler::profile(&df).unwrap();

        assert_eq!(summary.head.len(), HEAD_ROWS);
        assert_eq!(summary.head[0]["n"], serde_json::json!(0));
        assert_eq!(summary.head[4]["n"], serde_json::json!(4));
    }

    #[test]
    fn test_profile_empty_frame() {
        let df = df!["a" => Vec::<f64>::new()].unwrap();
        let summary = EdaProfiler::profile(&df).unwrap();

        assert_eq!(summary.shape, (0, 1));
        assert_eq!(summary.duplicates, 0);
        assert_eq!(summary.outliers["a"], 0);
        assert!(summary.head.is_empty());
    }
}
