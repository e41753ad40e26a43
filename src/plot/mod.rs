//! Diagnostics: terminal ASCII plots and per-subject SVG figures.

pub mod ascii;
pub mod svg;

pub use ascii::*;
pub use svg::*;
