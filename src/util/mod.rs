//! Utility modules shared across the scheduler core.

pub mod arena;
pub mod det_rng;

pub use arena::{Arena, ArenaIndex};
pub use det_rng::DetRng;
