//! Median imputation followed by standardization.

use serde::{Deserialize, Serialize};

/// Fitted transform for one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericTransform {
    pub column: String,
    /// Replacement for null and NaN cells. 0.0 when the column had no values.
    pub median: f64,
    pub mean: f64,
    /// Population standard deviation, 1.0 for constant columns.
    pub scale: f64,
}

impl NumericTransform {
    /// Fit on the training values of `column`.
    ///
    /// Statistics come from finite cells only, so a stray `inf` does not turn
    /// the mean and scale into NaN. Infinite cells still transform to `±inf`.
    pub fn fit(column: impl Into<String>, values: &[Option<f64>]) -> Self {
        let mut present: Vec<f64> = values
            .iter()
            .flatten()
            .copied()
            .filter(|v| v.is_finite())
            .collect();
        present.sort_by(|a, b| a.total_cmp(b));

        let median = median_of_sorted(&present).unwrap_or(0.0);

        let imputed: Vec<f64> = values
            .iter()
            .map(|v| impute(*v, median))
            .filter(|v| v.is_finite())
            .collect();
        let (mean, std) = mean_and_std(&imputed);

        Self {
            column: column.into(),
            median,
            mean,
            scale: if std.is_finite() && std > f64::EPSILON { std } else { 1.0 },
        }
    }

    /// Transform one cell.
    #[inline]
    pub fn transform(&self, value: Option<f64>) -> f64 {
        (impute(value, self.median) - self.mean) / self.scale
    }
}

#[inline]
fn impute(value: Option<f64>, median: f64) -> f64 {
    value.filter(|v| !v.is_nan()).unwrap_or(median)
}

fn median_of_sorted(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some(sorted[n / 2 - 1] / 2.0 + sorted[n / 2] / 2.0),
    }
}

/// Mean and population standard deviation of finite values.
///
/// Values are divided by their largest magnitude first so sums and squares
/// cannot overflow near `f64::MAX`.
fn mean_and_std(values: &[f64]) -> (f64, f64) {
    let magnitude = values.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    if values.is_empty() || magnitude == 0.0 {
        return (0.0, 0.0);
    }

    let n = values.len() as f64;
    let mean = values.iter().map(|v| v / magnitude).sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|v| (v / magnitude - mean).powi(2))
        .sum::<f64>()
        / n;

    (mean * magnitude, variance.sqrt() * magnitude)
}
