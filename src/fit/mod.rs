//! Nonlinear fitting.
//!
//! - `solver`: bounded Levenberg–Marquardt over any `ParametricModel`
//! - `crf`: the Naka-Rushton contrast response fit
//! - `peak`: Gaussian peak fit for spectra
//! - `batch`: parallel per-subject fitting

pub mod batch;
pub mod crf;
pub mod peak;
pub mod solver;

pub use batch::*;
pub use crf::*;
pub use peak::*;
pub use solver::*;
