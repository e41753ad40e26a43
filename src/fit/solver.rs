//! Bounded Levenberg–Marquardt least squares.
//!
//! Minimizes `Σ (y_i - f(x_i; p))²` subject to `lower <= p <= upper`.
//!
//! Each iteration:
//! - builds the Jacobian `J` and residuals `r` at the current point
//! - freezes parameters sitting on a bound whose gradient pushes outward
//! - solves `(JᵀJ + λ·diag(JᵀJ)) δ = Jᵀr` over the free parameters
//! - clamps `p + δ` back into the box
//!
//! A step is accepted only if it lowers the sum of squares; `λ` shrinks after
//! an accepted step and grows after a rejected one. Without the active-set
//! freeze the clamp keeps cutting the same outward component and the
//! iteration crawls along the bound.
//!
//! Every stopping rule is relative, so multiplying the data by a constant
//! (tesla instead of picotesla) changes nothing but the units of the result:
//! - the damped system is equilibrated by its diagonal before the SVD solve
//! - the gradient test uses the cosine between `r` and each column of `J`
//! - the exact-fit floor and the diagonal floor scale with the data
//! - the step test compares each parameter's change with its own magnitude

use nalgebra::{DMatrix, DVector};
use tracing::{debug, trace};

use crate::domain::SolverOptions;
use crate::error::FitError;
use crate::math::solve_least_squares;
use crate::models::ParametricModel;

const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-15;
const LAMBDA_MAX: f64 = 1e16;
/// Damping floor, relative to the largest free diagonal entry of `JᵀJ`.
const DIAG_FLOOR: f64 = 1e-12;
/// Sum of squares, relative to `‖y‖²`, below which the fit is exact.
const SSE_FLOOR: f64 = 1e-30;

/// Why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Relative reduction of the sum of squares fell below `ftol`.
    CostTolerance,
    /// Relative step length fell below `xtol`.
    StepTolerance,
    /// Largest cosine between the residuals and a free Jacobian column fell
    /// below `gtol` (or the fit is exact).
    Gradient,
    /// Damping grew without finding a descent step: a local minimum on the box.
    NoDescent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutcome {
    pub params: Vec<f64>,
    /// Final sum of squared residuals.
    pub sse: f64,
    pub iterations: usize,
    pub stop: StopReason,
}

/// Run the bounded Levenberg–Marquardt iteration from `initial`.
///
/// `initial` is clamped into `[lower, upper]` first. Exhausting
/// `opts.max_iterations` or leaving the finite domain is reported as
/// [`FitError::FitDivergence`].
pub fn minimize<M: ParametricModel>(
    model: &M,
    x: &[f64],
    y: &[f64],
    initial: &[f64],
    lower: &[f64],
    upper: &[f64],
    opts: &SolverOptions,
) -> Result<SolverOutcome, FitError> {
    let k = model.param_count();
    if initial.len() != k || lower.len() != k || upper.len() != k {
        return Err(FitError::invalid(format!(
            "expected {k} parameters, initial/lower/upper have {}/{}/{}",
            initial.len(),
            lower.len(),
            upper.len()
        )));
    }
    if x.len() != y.len() || x.is_empty() {
        return Err(FitError::invalid(format!(
            "x and y must be non-empty and equally long (got {} and {})",
            x.len(),
            y.len()
        )));
    }

    let clamp = |p: &mut [f64]| {
        for ((v, lo), hi) in p.iter_mut().zip(lower).zip(upper) {
            *v = v.max(*lo).min(*hi);
        }
    };

    let mut p = initial.to_vec();
    clamp(&mut p);
    let mut sse = sum_of_squares(model, x, y, &p);
    if !sse.is_finite() {
        return Err(FitError::invalid("initial guess gives a non-finite residual"));
    }

    let sse_floor = SSE_FLOOR * y.iter().map(|v| v * v).sum::<f64>();
    let n = x.len();
    let mut lambda = LAMBDA_INIT;
    let mut jac = DMatrix::<f64>::zeros(n, k);
    let mut row = vec![0.0; k];
    let mut resid = DVector::<f64>::zeros(n);

    for iter in 0..opts.max_iterations {
        for (i, (&xi, &yi)) in x.iter().zip(y).enumerate() {
            model.gradient(&p, xi, &mut row);
            for (j, v) in row.iter().enumerate() {
                jac[(i, j)] = *v;
            }
            resid[i] = yi - model.eval(&p, xi);
        }
        let jtj = jac.transpose() * &jac;
        let grad = jac.transpose() * &resid;
        if grad.iter().any(|g| !g.is_finite()) {
            debug!(iter, "non-finite gradient");
            return Err(FitError::FitDivergence { iterations: iter });
        }

        // A parameter on its bound is frozen when descent points out of the box.
        let active: Vec<bool> = (0..k)
            .map(|j| (p[j] <= lower[j] && grad[j] <= 0.0) || (p[j] >= upper[j] && grad[j] >= 0.0))
            .collect();
        if sse <= sse_floor || max_cosine(&jtj, &grad, &active, sse) <= opts.gtol {
            return Ok(finish(p, sse, iter, StopReason::Gradient));
        }
        let diag_floor = DIAG_FLOOR
            * (0..k)
                .filter(|&j| !active[j])
                .map(|j| jtj[(j, j)])
                .fold(0.0, f64::max)
                .max(f64::MIN_POSITIVE);

        loop {
            let mut a = jtj.clone();
            let mut g = grad.clone();
            for j in 0..k {
                if active[j] {
                    a.row_mut(j).fill(0.0);
                    a.column_mut(j).fill(0.0);
                    a[(j, j)] = 1.0;
                    g[j] = 0.0;
                } else {
                    a[(j, j)] += lambda * jtj[(j, j)].max(diag_floor);
                }
            }

            if let Some(delta) = solve_equilibrated(&a, &g) {
                let mut candidate: Vec<f64> = p
                    .iter()
                    .zip(delta.iter())
                    .zip(&active)
                    .map(|((v, d), &frozen)| if frozen { *v } else { v + d })
                    .collect();
                clamp(&mut candidate);
                let candidate_sse = sum_of_squares(model, x, y, &candidate);

                if candidate_sse.is_finite() && candidate_sse < sse {
                    let small_step = p
                        .iter()
                        .zip(&candidate)
                        .all(|(a, b)| (a - b).abs() <= opts.xtol * a.abs());
                    let reduction = (sse - candidate_sse) / sse;
                    trace!(iter, sse = candidate_sse, lambda, "step accepted");

                    p = candidate;
                    sse = candidate_sse;
                    lambda = (lambda / 10.0).max(LAMBDA_MIN);

                    if reduction <= opts.ftol {
                        return Ok(finish(p, sse, iter + 1, StopReason::CostTolerance));
                    }
                    if small_step {
                        return Ok(finish(p, sse, iter + 1, StopReason::StepTolerance));
                    }
                    break;
                }
            }

            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                return Ok(finish(p, sse, iter + 1, StopReason::NoDescent));
            }
        }
    }

    debug!(iterations = opts.max_iterations, sse, "iteration budget exhausted");
    Err(FitError::FitDivergence {
        iterations: opts.max_iterations,
    })
}

/// Largest `|Jⱼᵀr| / (‖Jⱼ‖·‖r‖)` over the free parameters.
fn max_cosine(jtj: &DMatrix<f64>, grad: &DVector<f64>, active: &[bool], sse: f64) -> f64 {
    let r_norm = sse.sqrt();
    if r_norm == 0.0 {
        return 0.0;
    }
    (0..grad.len())
        .filter(|&j| !active[j])
        .filter_map(|j| {
            let col_norm = jtj[(j, j)].sqrt();
            (col_norm > 0.0).then(|| grad[j].abs() / (col_norm * r_norm))
        })
        .fold(0.0, f64::max)
}

/// Solve `a δ = g` after scaling rows and columns by `1/sqrt(a_jj)`, so the
/// SVD truncation threshold does not depend on the units of the parameters.
fn solve_equilibrated(a: &DMatrix<f64>, g: &DVector<f64>) -> Option<DVector<f64>> {
    let scale = DVector::from_iterator(
        a.nrows(),
        a.diagonal().iter().map(|&d| if d > 0.0 { 1.0 / d.sqrt() } else { 1.0 }),
    );
    let scaled = DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[(i, j)] * scale[i] * scale[j]);
    let z = solve_least_squares(&scaled, &g.component_mul(&scale))?;
    Some(z.component_mul(&scale))
}

fn finish(params: Vec<f64>, sse: f64, iterations: usize, stop: StopReason) -> SolverOutcome {
    debug!(iterations, sse, ?stop, "solver stopped");
    SolverOutcome {
        params,
        sse,
        iterations,
        stop,
    }
}

fn sum_of_squares<M: ParametricModel>(model: &M, x: &[f64], y: &[f64], p: &[f64]) -> f64 {
    x.iter()
        .zip(y)
        .map(|(&xi, &yi)| {
            let r = yi - model.eval(p, xi);
            r * r
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gaussian, NakaRushton};

    const C: [f64; 5] = [0.05, 0.1, 0.2, 0.4, 0.8];

    #[test]
    fn recovers_exact_gaussian() {
        let truth = [0.8, 47.0, 6.0];
        let x: Vec<f64> = (12..=38).map(|i| 5.0 + 2.5 * i as f64).collect();
        let y: Vec<f64> = x.iter().map(|&xi| Gaussian.eval(&truth, xi)).collect();

        let out = minimize(
            &Gaussian,
            &x,
            &y,
            &[0.7, 45.0, 5.0],
            &[0.0, x[0], 1e-6],
            &[f64::INFINITY, x[x.len() - 1], f64::INFINITY],
            &SolverOptions::default(),
        )
        .unwrap();

        for (got, want) in out.params.iter().zip(truth) {
            assert!((got - want).abs() < 1e-6, "{got} vs {want}");
        }
    }

    #[test]
    fn frozen_bound_does_not_stall_progress() {
        // The best baseline is negative; it must settle on 0 and the
        // remaining parameters must still converge.
        let y = [-0.5, -0.2, 0.3, 0.8, 1.0];
        let out = minimize(
            &NakaRushton,
            &C,
            &y,
            &[0.3, 1.0, 1.0, 0.0],
            &[1e-6, 0.0, 1e-6, 0.0],
            &[50.0, f64::INFINITY, 5.0, f64::INFINITY],
            &SolverOptions::default(),
        )
        .unwrap();

        assert_eq!(out.params[3], 0.0);
        assert!(out.iterations < 200);
    }

    #[test]
    fn parameters_stay_inside_bounds() {
        let y = [2.1, 3.0, 5.5, 7.9, 8.4];
        let lower = [1e-6, 0.0, 1e-6, 0.0];
        let upper = [50.0, 7.5, 5.0, 1.0];
        let out = minimize(&NakaRushton, &C, &y, &[0.3, 8.4, 1.0, 1.5], &lower, &upper, &SolverOptions::default())
            .unwrap();
        for ((v, lo), hi) in out.params.iter().zip(lower).zip(upper) {
            assert!(*v >= lo && *v <= hi, "{v} outside [{lo}, {hi}]");
        }
    }

    #[test]
    fn exhausted_budget_is_divergence() {
        let y = [0.1, 0.3, 0.6, 0.9, 1.0];
        let opts = SolverOptions {
            max_iterations: 1,
            ..SolverOptions::default()
        };
        let err = minimize(
            &NakaRushton,
            &C,
            &y,
            &[0.3, 1.0, 1.0, 0.05],
            &[1e-6, 0.0, 1e-6, 0.0],
            &[50.0, f64::INFINITY, 5.0, f64::INFINITY],
            &opts,
        )
        .unwrap_err();
        assert_eq!(err, FitError::FitDivergence { iterations: 1 });
    }

    #[test]
    fn mismatched_lengths_are_invalid() {
        let err = minimize(
            &NakaRushton,
            &C,
            &[1.0, 2.0],
            &[0.3, 1.0, 1.0, 0.0],
            &[0.0; 4],
            &[1.0; 4],
            &SolverOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, FitError::InvalidInput(_)));
    }
}
