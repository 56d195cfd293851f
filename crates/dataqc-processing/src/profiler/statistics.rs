//! Quantile and IQR helpers for outlier counting.

/// Multiplier applied to the IQR to obtain the outlier fences.
pub const IQR_FENCE: f64 = 1.5;

/// Quantile of already sorted values using linear interpolation between the
/// two closest ranks. Returns `None` for an empty slice.
pub fn quantile_linear(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Inclusive `(lower, upper)` fences `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]`.
pub fn iqr_bounds(values: &[f64]) -> Option<(f64, f64)> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let q1 = quantile_linear(&sorted, 0.25)?;
    let q3 = quantile_linear(&sorted, 0.75)?;
    let iqr = q3 - q1;

    Some((q1 - IQR_FENCE * iqr, q3 + IQR_FENCE * iqr))
}

/// Number of non-null values strictly outside the IQR fences.
pub fn count_outliers(values: &[Option<f64>]) -> usize {
    let present: Vec<f64> = values.iter().flatten().copied().collect();

    let Some((lower, upper)) = iqr_bounds(&present) else {
        return 0;
    };

    present
        .iter()
        .filter(|&&v| v < lower || v > upper)
        .count()
}
