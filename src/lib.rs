//! `vss-crf` library crate.
//!
//! The binary (`crf`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the fitting code is reusable from other analysis front-ends
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod behavior;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod events;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod spectrum;
