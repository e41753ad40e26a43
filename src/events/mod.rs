//! Stimulus event bookkeeping.

pub mod segment;

pub use segment::*;
