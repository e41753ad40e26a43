//! Input/output helpers.
//!
//! - amplitude table ingest + row validation (`ingest`)
//! - results and amplitude table exports (`export`)
//! - curve JSON read/write (`curve`)
//! - behavior logs, break info and trial tables (`logs`)
//! - event tables, PSD matrices and spectra (`events`)

pub mod curve;
pub mod events;
pub mod export;
pub mod ingest;
pub mod logs;

pub use curve::*;
pub use events::*;
pub use export::*;
pub use ingest::*;
pub use logs::*;
