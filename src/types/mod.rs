//! Core types for the scheduler.
//!
//! - [`id`]: Identifier types (`ThreadId`, `QueueId`, `Tick`)

pub mod id;

pub use id::{QueueId, ThreadId, Tick};
