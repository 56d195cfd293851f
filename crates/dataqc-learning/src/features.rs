//! Column extraction from DataFrames into plain vectors and matrices.

use crate::error::{LearningError, Result};
use crate::types::ClassLabel;
use dataqc_processing::{DtypeCategory, column_as_f64, get_dtype_category};
use ndarray::Array2;
use polars::prelude::*;

/// Feature columns of a dataset partitioned by kind, in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureColumns {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
    /// Columns with dtypes no transform accepts (dates, lists, ...).
    pub dropped: Vec<String>,
}

impl FeatureColumns {
    /// Partition every column except `exclude`.
    ///
    /// Booleans are treated as categorical.
    pub fn partition(df: &DataFrame, exclude: Option<&str>) -> Self {
        let mut columns = Self::default();

        for col in df.get_columns() {
            let name = col.name().to_string();
            if exclude == Some(name.as_str()) {
                continue;
            }
            match get_dtype_category(col.dtype()) {
                DtypeCategory::Numeric => columns.numeric.push(name),
                DtypeCategory::Categorical | DtypeCategory::Boolean => {
                    columns.categorical.push(name)
                }
                DtypeCategory::Other => columns.dropped.push(name),
            }
        }

        columns
    }

    /// Whether no usable feature column exists.
    pub fn is_empty(&self) -> bool {
        self.numeric.is_empty() && self.categorical.is_empty()
    }
}

/// Read a column as strings. Booleans become `"true"`/`"false"`.
pub fn column_as_strings(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df.column(name)?.as_materialized_series();
    let cast = series.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

/// Read a target column as class labels, nulls as `None`.
///
/// Integer columns yield [`ClassLabel::Int`], floats [`ClassLabel::Float`],
/// booleans [`ClassLabel::Bool`]; everything else is read as text.
pub fn column_as_labels(df: &DataFrame, name: &str) -> Result<Vec<Option<ClassLabel>>> {
    let series = df.column(name)?.as_materialized_series();

    let labels = match series.dtype() {
        DataType::Boolean => series
            .bool()?
            .into_iter()
            .map(|v| v.map(ClassLabel::Bool))
            .collect(),
        DataType::Float32 | DataType::Float64 => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.filter(|f| !f.is_nan()).map(ClassLabel::Float))
            .collect(),
        dtype if dtype.is_integer() => series
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|v| v.map(ClassLabel::Int))
            .collect(),
        _ => series
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|v| v.map(|s| ClassLabel::Text(s.to_string())))
            .collect(),
    };

    Ok(labels)
}

/// Build a `rows x columns` matrix from numeric columns, nulls and NaN
/// replaced by `fill`.
///
/// Every column must exist; non-numeric cells become `fill`.
pub fn numeric_matrix(df: &DataFrame, columns: &[String], fill: f64) -> Result<Array2<f64>> {
    let mut matrix = Array2::<f64>::zeros((df.height(), columns.len()));

    for (j, name) in columns.iter().enumerate() {
        let values = column_as_f64(df, name)?;
        for (i, value) in values.into_iter().enumerate() {
            matrix[[i, j]] = value.filter(|v| !v.is_nan()).unwrap_or(fill);
        }
    }

    Ok(matrix)
}

/// Names from `columns` that are absent from `df`, in the given order.
pub fn missing_columns(df: &DataFrame, columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .filter(|name| df.column(name).is_err())
        .cloned()
        .collect()
}

/// Fail unless every listed column is present.
pub fn require_columns(df: &DataFrame, columns: &[String]) -> Result<()> {
    let missing = missing_columns(df, columns);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(LearningError::MissingColumns(missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partition_excludes_target() {
        let df = df![
            "age" => [25i64, 40],
            "city" => ["Paris", "Rome"],
            "active" => [true, false],
            "clicked" => [0i64, 1],
        ]
        .unwrap();

        let columns = FeatureColumns::partition(&df, Some("clicked"));
        assert_eq!(columns.numeric, vec!["age"]);
        assert_eq!(columns.categorical, vec!["city", "active"]);
        assert!(columns.dropped.is_empty());
    }

    #[test]
    fn test_column_as_strings_booleans() {
        let df = df!["b" => [Some(true), None, Some(false)]].unwrap();
        assert_eq!(
            column_as_strings(&df, "b").unwrap(),
            vec![Some("true".to_string()), None, Some("false".to_string())]
        );
    }

    #[test]
    fn test_column_as_labels_by_dtype() {
        let df = df![
            "i" => [Some(1i64), None],
            "f" => [0.5f64, 1.5],
            "s" => ["a", "b"],
        ]
        .unwrap();

        assert_eq!(
            column_as_labels(&df, "i").unwrap(),
            vec![Some(ClassLabel::Int(1)), None]
        );
        assert_eq!(
            column_as_labels(&df, "f").unwrap()[1],
            Some(ClassLabel::Float(1.5))
        );
        assert_eq!(
            column_as_labels(&df, "s").unwrap()[0],
            Some(ClassLabel::Text("a".to_string()))
        );
    }

    #[test]
    fn test_numeric_matrix_fills_nulls() {
        let df = df![
            "a" => [Some(1.0f64), None],
            "b" => [Some(3i64), Some(4)],
        ]
        .unwrap();
        let matrix = numeric_matrix(&df, &["b".to_string(), "a".to_string()], 0.0).unwrap();

        assert_eq!(matrix.shape(), &[2, 2]);
        assert_eq!(matrix[[0, 0]], 3.0);
        assert_eq!(matrix[[0, 1]], 1.0);
        assert_eq!(matrix[[1, 1]], 0.0);
    }

    #[test]
    fn test_require_columns_lists_missing_in_order() {
        let df = df!["a" => [1.0f64]].unwrap();
        let columns = vec!["z".to_string(), "a".to_string(), "b".to_string()];
        match require_columns(&df, &columns) {
            Err(LearningError::MissingColumns(missing)) => assert_eq!(missing, vec!["z", "b"]),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
