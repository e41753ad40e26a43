//! Gaussian peak fit for a power spectrum (gamma band peak frequency).
//!
//! The starting point comes from the spectrum's moments, treating the
//! positive part of the power as a weight distribution over frequency.

use tracing::debug;

use crate::domain::{PeakFit, SolverOptions};
use crate::error::FitError;
use crate::fit::crf::POSITIVE_FLOOR;
use crate::fit::solver::minimize;
use crate::models::Gaussian;

/// Fit `a * exp(-(f - f0)^2 / (2 sigma^2))` to `(freqs, power)`.
///
/// `f0` is kept inside the sampled frequency range and `a` non-negative.
pub fn fit_peak(freqs: &[f64], power: &[f64], opts: &SolverOptions) -> Result<PeakFit, FitError> {
    if freqs.len() != power.len() {
        return Err(FitError::invalid(format!(
            "{} frequencies but {} power values",
            freqs.len(),
            power.len()
        )));
    }
    if freqs.len() < 3 {
        return Err(FitError::invalid("a Gaussian peak needs at least 3 spectrum points"));
    }
    if freqs.iter().chain(power).any(|v| !v.is_finite()) {
        return Err(FitError::invalid("spectrum contains non-finite values"));
    }

    let initial = moment_guess(freqs, power)?;
    let f_min = freqs.iter().copied().fold(f64::INFINITY, f64::min);
    let f_max = freqs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let lower = [0.0, f_min, POSITIVE_FLOOR];
    let upper = [f64::INFINITY, f_max, f64::INFINITY];

    let out = minimize(&Gaussian, freqs, power, &initial, &lower, &upper, opts)?;
    debug!(center = out.params[1], iterations = out.iterations, "gaussian peak fitted");

    Ok(PeakFit {
        amplitude: out.params[0],
        center: out.params[1],
        sigma: out.params[2],
        rss: out.sse,
        iterations: out.iterations,
    })
}

/// `[max(power), weighted mean, weighted std]` with weights `max(power, 0)`.
pub fn moment_guess(freqs: &[f64], power: &[f64]) -> Result<[f64; 3], FitError> {
    let weights: Vec<f64> = power.iter().map(|p| p.max(0.0)).collect();
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(FitError::invalid("spectrum has no positive power"));
    }

    let center = freqs.iter().zip(&weights).map(|(f, w)| f * w).sum::<f64>() / total;
    let variance = freqs
        .iter()
        .zip(&weights)
        .map(|(f, w)| w * (f - center) * (f - center))
        .sum::<f64>()
        / total;
    let amplitude = power.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Ok([amplitude, center, variance.sqrt().max(POSITIVE_FLOOR)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ParametricModel;

    fn gamma_freqs() -> Vec<f64> {
        (12..=38).map(|i| 5.0 + 2.5 * i as f64).collect()
    }

    fn peak_opts() -> SolverOptions {
        SolverOptions {
            max_iterations: 2000,
            ..SolverOptions::default()
        }
    }

    #[test]
    fn recovers_noiseless_peak() {
        let f = gamma_freqs();
        let p: Vec<f64> = f.iter().map(|&x| Gaussian.eval(&[0.8, 47.0, 6.0], x)).collect();
        let fit = fit_peak(&f, &p, &peak_opts()).unwrap();
        assert!((fit.center - 47.0).abs() < 1e-6);
        assert!((fit.amplitude - 0.8).abs() < 1e-6);
        assert!((fit.sigma - 6.0).abs() < 1e-6);
    }

    #[test]
    fn moment_guess_ignores_negative_power() {
        let f = [40.0, 45.0, 50.0];
        let g = moment_guess(&f, &[-5.0, 1.0, 1.0]).unwrap();
        assert_eq!(g[0], 1.0);
        assert!((g[1] - 47.5).abs() < 1e-12);
        assert!((g[2] - 2.5).abs() < 1e-12);
    }

    #[test]
    fn non_positive_spectrum_is_invalid() {
        let f = gamma_freqs();
        let p = vec![-1.0; f.len()];
        assert!(matches!(fit_peak(&f, &p, &peak_opts()), Err(FitError::InvalidInput(_))));
    }
}
