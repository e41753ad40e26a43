//! Goodness-of-fit statistics.

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Residual sum of squares `Σ (observed - predicted)²`.
pub fn residual_sum_of_squares(observed: &[f64], predicted: &[f64]) -> f64 {
    observed
        .iter()
        .zip(predicted)
        .map(|(o, p)| (o - p) * (o - p))
        .sum()
}

/// Total sum of squares `Σ (observed - mean)²`.
pub fn total_sum_of_squares(observed: &[f64]) -> f64 {
    let Some(m) = mean(observed) else {
        return 0.0;
    };
    observed.iter().map(|o| (o - m) * (o - m)).sum()
}

/// Coefficient of determination `1 - rss / tss`.
///
/// Not clamped: a model worse than the mean gives a negative value. Callers
/// must reject `tss == 0`, for which the ratio is undefined.
pub fn r_squared(rss: f64, tss: f64) -> f64 {
    1.0 - rss / tss
}
