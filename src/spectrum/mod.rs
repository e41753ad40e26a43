//! Spectral metrics computed from exported PSD tables.

pub mod appelbaum;

pub use appelbaum::*;
