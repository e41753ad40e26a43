//! Reporting utilities: residuals and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::SubjectFit;
use crate::error::AppError;
use crate::fit::evaluate_curve;

/// Observed vs fitted response at one contrast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidualRow {
    pub contrast: f64,
    pub observed: f64,
    pub fitted: f64,
    pub residual: f64,
}

/// Fitted values and residuals at the measured contrasts.
pub fn compute_residuals(fit: &SubjectFit, contrasts: &[f64]) -> Result<Vec<ResidualRow>, AppError> {
    let fitted = evaluate_curve(&fit.result.params, contrasts);
    if fitted.iter().any(|v| !v.is_finite()) {
        return Err(AppError::new(4, "Non-finite model prediction during residual computation."));
    }
    Ok(contrasts
        .iter()
        .zip(&fit.record.responses)
        .zip(fitted)
        .map(|((&contrast, &observed), fitted)| ResidualRow {
            contrast,
            observed,
            fitted,
            residual: observed - fitted,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitQuality, FitResult, ModelParameters, SubjectRecord};

    #[test]
    fn residuals_are_observed_minus_fitted() {
        let fit = SubjectFit {
            record: SubjectRecord {
                subject: "S001".to_string(),
                baseline: 0.0,
                responses: vec![1.0, 2.5],
            },
            result: FitResult {
                // Flat model at 2.0.
                params: ModelParameters {
                    semisaturation: 0.2,
                    max_amplitude: 0.0,
                    saturation_exponent: 1.0,
                    baseline: 2.0,
                },
                quality: FitQuality {
                    rss: 1.25,
                    tss: 1.125,
                    r_squared: -0.111,
                    n: 2,
                    iterations: 0,
                },
            },
        };
        let rows = compute_residuals(&fit, &[0.1, 0.4]).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].residual, -1.0);
        assert_eq!(rows[1].residual, 0.5);
    }
}
