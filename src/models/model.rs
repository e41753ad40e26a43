//! The interface the nonlinear solver fits against.
//!
//! The solver relies on two primitive operations:
//! - evaluate the model at `x` for a parameter vector
//! - fill the gradient of that value with respect to each parameter (one Jacobian row)

/// A model `y = f(x; p)` with a fixed number of parameters.
pub trait ParametricModel: Sync {
    fn param_count(&self) -> usize;

    fn eval(&self, params: &[f64], x: f64) -> f64;

    /// Fill `out` with `∂f/∂p_j` at `x`.
    ///
    /// `out` has length `param_count()`.
    fn gradient(&self, params: &[f64], x: f64, out: &mut [f64]);
}
