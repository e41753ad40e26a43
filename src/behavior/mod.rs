//! Behavioral reaction-time bookkeeping.

pub mod blocks;
pub mod classify;
pub mod trials;

pub use blocks::*;
pub use classify::*;
pub use trials::*;
