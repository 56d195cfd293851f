//! Most-frequent imputation followed by one-hot encoding.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fitted transform for one categorical or boolean column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotTransform {
    pub column: String,
    /// Replacement for null cells, `None` when the column had no values.
    pub fill: Option<String>,
    /// Sorted categories seen during fit, one output column each.
    pub categories: Vec<String>,
}

impl OneHotTransform {
    /// Fit on the training values of `column`.
    ///
    /// The fill value is the most frequent category; ties go to the smallest.
    pub fn fit(column: impl Into<String>, values: &[Option<String>]) -> Self {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for value in values.iter().flatten() {
            *counts.entry(value.as_str()).or_insert(0) += 1;
        }

        let mut fill: Option<(&str, usize)> = None;
        for (&category, &count) in &counts {
            if fill.is_none_or(|(_, best)| count > best) {
                fill = Some((category, count));
            }
        }

        Self {
            column: column.into(),
            fill: fill.map(|(category, _)| category.to_string()),
            categories: counts.keys().map(|c| c.to_string()).collect(),
        }
    }

    /// Number of output columns.
    pub fn width(&self) -> usize {
        self.categories.len()
    }

    /// Output column set to 1.0 for `value`, `None` for unseen categories.
    pub fn encode(&self, value: Option<&str>) -> Option<usize> {
        let value = value.or(self.fill.as_deref())?;
        self.categories
            .binary_search_by(|category| category.as_str().cmp(value))
            .ok()
    }
}
