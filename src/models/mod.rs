//! Model implementations.
//!
//! Models are implemented as small, pure functions behind one trait so that the
//! solver code can stay generic.

pub mod gaussian;
pub mod model;
pub mod naka_rushton;

pub use gaussian::*;
pub use model::*;
pub use naka_rushton::*;
