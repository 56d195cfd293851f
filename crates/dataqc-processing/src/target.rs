//! Target column discovery.
//!
//! Decides whether a dataset carries a supervised target. The rule is a
//! heuristic: a conventional column name wins, otherwise the first binary
//! column is taken as a classification target.

use crate::error::Result;
use polars::prelude::*;
use tracing::debug;

/// Conventional target column names, in priority order. Matching is exact
/// and case-sensitive.
pub const TARGET_CANDIDATES: [&str; 7] = [
    "target",
    "label",
    "clicked",
    "click",
    "purchase",
    "purchased",
    "y",
];

/// Find the supervised target column of `df`, if any.
///
/// 1. The first name of [`TARGET_CANDIDATES`] present as a column.
/// 2. Otherwise the first column, in column order, whose non-null values
///    take exactly two distinct values.
/// 3. Otherwise `None`: the dataset is treated as unsupervised.
pub fn discover_target(df: &DataFrame) -> Result<Option<String>> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    if let Some(candidate) = TARGET_CANDIDATES
        .iter()
        .find(|candidate| names.iter().any(|name| name == *candidate))
    {
        debug!("Target '{}' matched by name", candidate);
        return Ok(Some(candidate.to_string()));
    }

    for col in df.get_columns() {
        let non_null = col.as_materialized_series().drop_nulls();
        if non_null.n_unique()? == 2 {
            debug!("Target '{}' inferred as binary column", col.name());
            return Ok(Some(col.name().to_string()));
        }
    }

    debug!("No target column found, dataset is unsupervised");
    Ok(None)
}
