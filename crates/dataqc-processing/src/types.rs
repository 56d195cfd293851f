//! Types produced by the profiler.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Data-quality summary of a dataset.
///
/// Computed fresh for every analysis and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdaSummary {
    /// `(rows, columns)`
    pub shape: (usize, usize),

    /// Null count per column.
    pub missing: BTreeMap<String, usize>,

    /// Rows identical to an earlier row.
    pub duplicates: usize,

    /// IQR outlier count per numeric column.
    pub outliers: BTreeMap<String, usize>,

    /// First five rows as `column -> value` records.
    pub head: Vec<serde_json::Map<String, serde_json::Value>>,
}

impl EdaSummary {
    /// Total number of missing cells across all columns.
    pub fn total_missing(&self) -> usize {
        self.missing.values().sum()
    }
}
