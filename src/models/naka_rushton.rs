//! Naka-Rushton contrast response function.
//!
//! ```text
//! R(c) = Rmax * c^2 / (c50^(2n) + c^(2n)) + b
//! ```
//!
//! - `c50`: semisaturation contrast
//! - `Rmax`: maximum amplitude
//! - `n`: saturation exponent
//! - `b`: baseline
//!
//! The numerator keeps a fixed square while the denominator carries the
//! exponent, so for `n > 1` the curve rises to a peak and then decays
//! ("supersaturation"); for `0 < n <= 1` it is non-decreasing everywhere.

use crate::domain::{ModelParameters, NAKA_RUSHTON_PARAMS};
use crate::models::ParametricModel;

/// Evaluate the response at one contrast.
///
/// At zero contrast the response is exactly the baseline.
pub fn response(params: &ModelParameters, contrast: f64) -> f64 {
    response_raw(
        params.semisaturation,
        params.max_amplitude,
        params.saturation_exponent,
        params.baseline,
        contrast,
    )
}

fn response_raw(c50: f64, rmax: f64, n: f64, b: f64, c: f64) -> f64 {
    if c == 0.0 {
        return b;
    }
    let two_n = 2.0 * n;
    rmax * c * c / (c50.powf(two_n) + c.powf(two_n)) + b
}

/// Solver adapter; parameters in `ModelParameters::to_array` order.
#[derive(Debug, Clone, Copy, Default)]
pub struct NakaRushton;

impl ParametricModel for NakaRushton {
    fn param_count(&self) -> usize {
        NAKA_RUSHTON_PARAMS
    }

    fn eval(&self, p: &[f64], c: f64) -> f64 {
        response_raw(p[0], p[1], p[2], p[3], c)
    }

    fn gradient(&self, p: &[f64], c: f64, out: &mut [f64]) {
        let (c50, rmax, n) = (p[0], p[1], p[2]);
        out[3] = 1.0;
        if c == 0.0 {
            out[0] = 0.0;
            out[1] = 0.0;
            out[2] = 0.0;
            return;
        }

        let two_n = 2.0 * n;
        let k50 = c50.powf(two_n);
        let kc = c.powf(two_n);
        let denom = k50 + kc;
        let c2 = c * c;
        let scale = -rmax * c2 / (denom * denom);

        out[1] = c2 / denom;
        out[0] = if c50 > 0.0 {
            scale * two_n * c50.powf(two_n - 1.0)
        } else {
            0.0
        };
        // d/dn x^(2n) = 2 ln(x) x^(2n); the c50 term vanishes as c50 -> 0.
        let dk50 = if c50 > 0.0 { 2.0 * c50.ln() * k50 } else { 0.0 };
        out[2] = scale * (dk50 + 2.0 * c.ln() * kc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ModelParameters {
        ModelParameters {
            semisaturation: 0.2,
            max_amplitude: 1.5,
            saturation_exponent: 0.8,
            baseline: 0.07,
        }
    }

    #[test]
    fn zero_contrast_is_baseline() {
        let p = params();
        assert_eq!(response(&p, 0.0), p.baseline);

        // Even with a degenerate semisaturation.
        let degenerate = ModelParameters { semisaturation: 0.0, ..p };
        assert_eq!(response(&degenerate, 0.0), p.baseline);
    }

    #[test]
    fn half_maximum_at_semisaturation_when_exponent_is_one() {
        let p = ModelParameters {
            saturation_exponent: 1.0,
            baseline: 0.0,
            ..params()
        };
        let r = response(&p, p.semisaturation);
        assert!((r - p.max_amplitude / 2.0).abs() < 1e-12);
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let p = params().to_array();
        let model = NakaRushton;
        let mut g = [0.0; 4];
        for &c in &[0.05, 0.1, 0.2, 0.4, 0.8] {
            model.gradient(&p, c, &mut g);
            for j in 0..4 {
                let h = 1e-6 * p[j].abs().max(1e-3);
                let mut hi = p;
                let mut lo = p;
                hi[j] += h;
                lo[j] -= h;
                let fd = (model.eval(&hi, c) - model.eval(&lo, c)) / (2.0 * h);
                assert!(
                    (g[j] - fd).abs() < 1e-6 * fd.abs().max(1.0),
                    "param {j} at c={c}: analytic {} vs fd {fd}",
                    g[j]
                );
            }
        }
    }
}
