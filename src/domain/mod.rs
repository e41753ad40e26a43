//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - model parameters, bounds and solver options (`ModelParameters`, `ParamBounds`)
//! - per-subject records and fit outputs (`SubjectRecord`, `FitResult`, etc.)
//! - the explicit analysis configuration (`AnalysisConfig`)

pub mod config;
pub mod types;

pub use config::*;
pub use types::*;
