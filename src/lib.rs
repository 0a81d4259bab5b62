//! Cooperative single-processor scheduling core with priority donation.
//!
//! This crate models the scheduling heart of a cooperative kernel: one
//! logical processor, threads that switch only at well-defined suspension
//! points, and synchronization primitives whose ownership chains the
//! scheduler reasons about. When a high-priority thread blocks on a lock
//! held by a low-priority thread, the holder inherits the waiter's
//! effective priority — transitively, through chains of locks — so priority
//! inversion cannot starve the waiter behind unrelated mid-priority work.
//!
//! # Architecture
//!
//! - [`runtime::Scheduler`] — the context object owning all scheduler
//!   state: thread states, wait queues, the ready queue, the running
//!   thread, the logical clock, and the RNG for lottery draws.
//! - [`runtime::wait_queue`] — wait queues with two selection policies:
//!   deterministic priority (FIFO among equals) and ticket-weighted
//!   lottery.
//! - [`runtime::Alarm`] — a deadline min-heap providing `wait_until`
//!   against the logical clock.
//! - [`sync::Lock`] / [`sync::Condition`] — the primitives that create and
//!   dissolve donation edges.
//!
//! Time is a logical tick counter and all state transitions are atomic
//! steps (`&mut Scheduler`); there is no wall clock and no parallelism —
//! the concurrency being modeled is the interleaving of cooperative
//! switches.
//!
//! # Example
//!
//! ```
//! use coopsched::config::SchedConfig;
//! use coopsched::runtime::Scheduler;
//! use coopsched::sync::Lock;
//!
//! let mut sched = Scheduler::new(SchedConfig::default());
//! let holder = sched.register_thread("holder");
//! let waiter = sched.register_thread("waiter");
//! sched.make_ready(holder);
//! sched.make_ready(waiter);
//! sched.dispatch();
//!
//! let lock = Lock::new(&mut sched);
//! lock.acquire(&mut sched); // holder takes the lock uncontended
//!
//! while sched.running() != Some(waiter) {
//!     sched.yield_now();
//! }
//! sched.set_priority(waiter, 5);
//! lock.acquire(&mut sched); // waiter blocks and donates
//!
//! assert_eq!(sched.effective_priority(holder), 5);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod runtime;
pub mod sync;
pub mod test_utils;
pub mod types;
pub mod util;

pub use config::{SchedConfig, PRIORITY_DEFAULT, PRIORITY_MAX, PRIORITY_MIN};
pub use runtime::{Alarm, Scheduler, SelectPolicy, ThreadStatus};
pub use sync::{Condition, Lock};
pub use types::{QueueId, ThreadId, Tick};
