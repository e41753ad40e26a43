//! Contrast response function fitting.
//!
//! Fits the Naka-Rushton model (see [`crate::models::naka_rushton`]) to one
//! subject's response amplitudes by bounded nonlinear least squares and
//! reports the coefficient of determination.
//!
//! Convergence is local, so the initial guess is part of the contract:
//! semisaturation 0.3, max amplitude = largest response, exponent 1.0,
//! baseline = the externally estimated baseline.

use tracing::debug;

use crate::domain::{
    FitQuality, FitResult, FitSettings, ModelParameters, NAKA_RUSHTON_PARAMS, ParamBounds,
    SolverOptions,
};
use crate::error::FitError;
use crate::fit::solver::minimize;
use crate::math::{r_squared, residual_sum_of_squares, total_sum_of_squares};
use crate::models::{NakaRushton, response};

/// One sample per free parameter; anything less is underdetermined.
pub const MIN_SAMPLES: usize = NAKA_RUSHTON_PARAMS;

/// Lower limit applied to semisaturation and exponent so that `c50^(2n)`
/// never reaches `0^0` or a zero denominator.
pub const POSITIVE_FLOOR: f64 = 1e-6;

/// Default starting point for a subject.
pub fn initial_guess(responses: &[f64], baseline: f64, settings: &FitSettings) -> ModelParameters {
    let max_amplitude = responses.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    ModelParameters {
        semisaturation: settings.initial_semisaturation,
        max_amplitude: if max_amplitude.is_finite() { max_amplitude } else { 0.0 },
        saturation_exponent: settings.initial_saturation_exponent,
        baseline,
    }
}

/// Fit with the default iteration budget.
pub fn fit(
    contrasts: &[f64],
    responses: &[f64],
    initial: &ModelParameters,
    bounds: &ParamBounds,
) -> Result<FitResult, FitError> {
    fit_with_options(contrasts, responses, initial, bounds, &SolverOptions::default())
}

pub fn fit_with_options(
    contrasts: &[f64],
    responses: &[f64],
    initial: &ModelParameters,
    bounds: &ParamBounds,
    opts: &SolverOptions,
) -> Result<FitResult, FitError> {
    validate_samples(contrasts, responses)?;
    bounds.validate()?;

    let initial = initial.to_array();
    if initial.iter().any(|v| !v.is_finite()) {
        return Err(FitError::invalid(format!("initial guess is not finite: {initial:?}")));
    }

    let tss = total_sum_of_squares(responses);
    if tss == 0.0 {
        return Err(FitError::invalid(
            "responses have zero variance; R² is undefined",
        ));
    }

    let mut lower = bounds.lower();
    lower[0] = lower[0].max(POSITIVE_FLOOR);
    lower[2] = lower[2].max(POSITIVE_FLOOR);
    let upper = bounds.upper();
    if lower[0] > upper[0] || lower[2] > upper[2] {
        return Err(FitError::invalid(
            "semisaturation and saturation_exponent need a positive upper bound",
        ));
    }

    let outcome = minimize(&NakaRushton, contrasts, responses, &initial, &lower, &upper, opts)?;
    let params = ModelParameters::from_slice(&outcome.params);

    let predicted = evaluate_curve(&params, contrasts);
    if predicted.iter().any(|v| !v.is_finite()) {
        return Err(FitError::FitDivergence {
            iterations: outcome.iterations,
        });
    }
    let rss = residual_sum_of_squares(responses, &predicted);
    let quality = FitQuality {
        rss,
        tss,
        r_squared: r_squared(rss, tss),
        n: responses.len(),
        iterations: outcome.iterations,
    };
    debug!(?params, r_squared = quality.r_squared, stop = ?outcome.stop, "contrast response fitted");

    Ok(FitResult { params, quality })
}

/// Model predictions at arbitrary contrasts.
pub fn evaluate_curve(params: &ModelParameters, contrasts: &[f64]) -> Vec<f64> {
    contrasts.iter().map(|&c| response(params, c)).collect()
}

fn validate_samples(contrasts: &[f64], responses: &[f64]) -> Result<(), FitError> {
    if contrasts.len() != responses.len() {
        return Err(FitError::invalid(format!(
            "{} contrast levels but {} responses",
            contrasts.len(),
            responses.len()
        )));
    }
    if contrasts.len() < MIN_SAMPLES {
        return Err(FitError::invalid(format!(
            "{} samples supplied, at least {MIN_SAMPLES} are needed",
            contrasts.len()
        )));
    }
    if let Some(c) = contrasts.iter().find(|c| !(c.is_finite() && **c > 0.0)) {
        return Err(FitError::invalid(format!("contrast levels must be positive, got {c}")));
    }
    if let Some(r) = responses.iter().find(|r| !r.is_finite()) {
        return Err(FitError::invalid(format!("response amplitudes must be finite, got {r}")));
    }
    Ok(())
}
