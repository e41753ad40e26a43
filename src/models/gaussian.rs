//! Gaussian peak `a * exp(-(x - x0)^2 / (2 sigma^2))`, parameters `[a, x0, sigma]`.

use crate::models::ParametricModel;

#[derive(Debug, Clone, Copy, Default)]
pub struct Gaussian;

impl ParametricModel for Gaussian {
    fn param_count(&self) -> usize {
        3
    }

    fn eval(&self, p: &[f64], x: f64) -> f64 {
        let (a, x0, sigma) = (p[0], p[1], p[2]);
        let d = x - x0;
        a * (-(d * d) / (2.0 * sigma * sigma)).exp()
    }

    fn gradient(&self, p: &[f64], x: f64, out: &mut [f64]) {
        let (a, x0, sigma) = (p[0], p[1], p[2]);
        let d = x - x0;
        let s2 = sigma * sigma;
        let e = (-(d * d) / (2.0 * s2)).exp();
        out[0] = e;
        out[1] = a * e * d / s2;
        out[2] = a * e * d * d / (s2 * sigma);
    }
}
