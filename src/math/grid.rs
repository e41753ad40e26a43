//! Evaluation grids.
//!
//! The model curve is drawn on a fine contrast grid (linear, like the study's
//! plotting grid); plots with a log-scaled axis sample it log-spaced instead.

use crate::error::AppError;

/// Generate `steps` linearly spaced points between `min` and `max` (inclusive).
pub fn lin_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    if !(min.is_finite() && max.is_finite() && max > min) {
        return Err(AppError::new(
            2,
            format!("Invalid grid range: min={min}, max={max} (must be finite and max>min)."),
        ));
    }
    if steps < 2 {
        return Err(AppError::new(2, "Grid steps must be >= 2."));
    }

    let step = (max - min) / (steps as f64 - 1.0);
    let mut out: Vec<f64> = (0..steps).map(|i| min + step * i as f64).collect();
    // Pin the endpoint so it is exactly `max`.
    out[steps - 1] = max;
    Ok(out)
}

/// Generate `steps` log-spaced points between `min` and `max` (inclusive).
pub fn log_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > 0.0 && max > min) {
        return Err(AppError::new(
            2,
            format!("Invalid log grid range: min={min}, max={max} (must be finite, >0, and max>min)."),
        ));
    }
    if steps < 2 {
        return Err(AppError::new(2, "Grid steps must be >= 2."));
    }

    let ln_min = min.ln();
    let ln_max = max.ln();
    let step = (ln_max - ln_min) / (steps as f64 - 1.0);

    let mut out = Vec::with_capacity(steps);
    for i in 0..steps {
        out.push((ln_min + step * i as f64).exp());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_space_includes_endpoints() {
        let v = log_space(0.1, 10.0, 5).unwrap();
        assert!((v[0] - 0.1).abs() < 1e-12);
        assert!((v[v.len() - 1] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn lin_space_matches_study_plot_grid() {
        let v = lin_space(0.05, 0.8, 100).unwrap();
        assert_eq!(v.len(), 100);
        assert_eq!(v[0], 0.05);
        assert_eq!(v[99], 0.8);
        assert!(v.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn degenerate_ranges_are_rejected() {
        assert!(lin_space(1.0, 1.0, 10).is_err());
        assert!(log_space(0.0, 1.0, 10).is_err());
        assert!(lin_space(0.0, 1.0, 1).is_err());
    }
}
