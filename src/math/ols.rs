//! Linear least squares solver.
//!
//! Each Levenberg–Marquardt iteration solves a small damped system of the form:
//!
//! ```text
//! (JᵀJ + λ·diag(JᵀJ)) δ = Jᵀr
//! ```
//!
//! Implementation choices:
//! - We use SVD so that near-singular systems (e.g. a parameter pinned at a
//!   bound, or a flat direction in the model) still yield a finite step.
//! - The parameter dimension is tiny (3–4 columns), so SVD cost is irrelevant.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-14, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn singular_square_system_gives_minimum_norm_step() {
        // Second column is zero: the solve must not blow up.
        let a = DMatrix::from_row_slice(2, 2, &[4.0, 0.0, 0.0, 0.0]);
        let g = DVector::from_row_slice(&[2.0, 0.0]);

        let step = solve_least_squares(&a, &g).unwrap();
        assert!((step[0] - 0.5).abs() < 1e-12);
        assert!(step[1].abs() < 1e-12);
    }
}
