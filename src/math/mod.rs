//! Mathematical utilities: linear least squares, grids and fit statistics.

pub mod grid;
pub mod ols;
pub mod stats;

pub use grid::*;
pub use ols::*;
pub use stats::*;
