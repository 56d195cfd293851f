//! Column-wise feature preprocessing.
//!
//! The [`Preprocessor`] turns a raw DataFrame into the dense feature matrix
//! the classifiers consume: numeric columns first (imputed and standardized),
//! then one-hot blocks for categorical and boolean columns.

mod categorical;
mod numeric;

pub use categorical::OneHotTransform;
pub use numeric::NumericTransform;

use crate::error::{LearningError, Result};
use crate::features::{FeatureColumns, column_as_strings};
use dataqc_processing::{column_as_f64, is_numeric_dtype};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Fitted preprocessing for every feature column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    pub numeric: Vec<NumericTransform>,
    pub categorical: Vec<OneHotTransform>,
}

impl Preprocessor {
    /// Fit on the rows of `df` listed in `rows`.
    pub fn fit(df: &DataFrame, columns: &FeatureColumns, rows: &[usize]) -> Result<Self> {
        let mut numeric = Vec::with_capacity(columns.numeric.len());
        for name in &columns.numeric {
            let values = column_as_f64(df, name)?;
            let subset: Vec<Option<f64>> = rows.iter().map(|&r| values[r]).collect();
            numeric.push(NumericTransform::fit(name.as_str(), &subset));
        }

        let mut categorical = Vec::with_capacity(columns.categorical.len());
        for name in &columns.categorical {
            let values = column_as_strings(df, name)?;
            let subset: Vec<Option<String>> = rows.iter().map(|&r| values[r].clone()).collect();
            categorical.push(OneHotTransform::fit(name.as_str(), &subset));
        }

        Ok(Self {
            numeric,
            categorical,
        })
    }

    /// Raw input columns in fitted order.
    pub fn feature_names(&self) -> Vec<String> {
        self.numeric
            .iter()
            .map(|t| t.column.clone())
            .chain(self.categorical.iter().map(|t| t.column.clone()))
            .collect()
    }

    /// Width of the transformed matrix.
    pub fn output_width(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(OneHotTransform::width).sum::<usize>()
    }

    /// Transform every row of `df`.
    ///
    /// Fails with [`LearningError::ColumnMismatch`] when a fitted column is
    /// absent or a numeric column holds non-numeric data.
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let missing: Vec<String> = self
            .feature_names()
            .into_iter()
            .filter(|name| df.column(name).is_err())
            .collect();
        if !missing.is_empty() {
            return Err(LearningError::ColumnMismatch(format!(
                "columns are missing: {}",
                missing.join(", ")
            )));
        }

        let mut matrix = Array2::<f64>::zeros((df.height(), self.output_width()));

        for (j, transform) in self.numeric.iter().enumerate() {
            let col = df.column(&transform.column)?;
            if !is_numeric_dtype(col.dtype()) && col.null_count() < col.len() {
                return Err(LearningError::ColumnMismatch(format!(
                    "feature '{}' expects numeric data, found {}",
                    transform.column,
                    col.dtype()
                )));
            }
            let values = column_as_f64(df, &transform.column)?;
            for (i, value) in values.into_iter().enumerate() {
                matrix[[i, j]] = transform.transform(value);
            }
        }

        let mut offset = self.numeric.len();
        for transform in &self.categorical {
            let values = column_as_strings(df, &transform.column)?;
            for (i, value) in values.iter().enumerate() {
                if let Some(k) = transform.encode(value.as_deref()) {
                    matrix[[i, offset + k]] = 1.0;
                }
            }
            offset += transform.width();
        }

        Ok(matrix)
    }
}
