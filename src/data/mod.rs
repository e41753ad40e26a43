//! Synthetic data for demos and tests.

pub mod simulate;

pub use simulate::*;
