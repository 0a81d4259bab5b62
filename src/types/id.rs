//! Identifier types for scheduler entities.
//!
//! These types provide type-safe identifiers for the core scheduler
//! entities: threads and wait queues. They wrap arena indices with type
//! safety, so a queue handle can never be used where a thread handle is
//! expected.

use crate::util::ArenaIndex;
use core::fmt;

/// A unique identifier for a schedulable thread.
///
/// The scheduler never inspects the thread itself; this handle names the
/// scheduling state attached to it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub(crate) ArenaIndex);

impl ThreadId {
    /// Creates a new thread ID from an arena index (internal use).
    #[must_use]
    pub(crate) const fn from_arena(index: ArenaIndex) -> Self {
        Self(index)
    }

    /// Returns the underlying arena index (internal use).
    #[must_use]
    pub(crate) const fn arena_index(self) -> ArenaIndex {
        self.0
    }

    /// Creates a thread ID for testing purposes.
    #[doc(hidden)]
    #[must_use]
    pub const fn new_for_test(index: u32, generation: u32) -> Self {
        Self(ArenaIndex::new(index, generation))
    }
}

impl fmt::Debug for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ThreadId({}:{})", self.0.index(), self.0.generation())
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0.index())
    }
}

/// A unique identifier for a wait queue.
///
/// One wait queue exists per guarded resource: one per lock, one per
/// condition variable, one for the ready queue.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueueId(pub(crate) ArenaIndex);

impl QueueId {
    /// Creates a new queue ID from an arena index (internal use).
    #[must_use]
    pub(crate) const fn from_arena(index: ArenaIndex) -> Self {
        Self(index)
    }

    /// Returns the underlying arena index (internal use).
    #[must_use]
    pub(crate) const fn arena_index(self) -> ArenaIndex {
        self.0
    }
}

impl fmt::Debug for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QueueId({}:{})", self.0.index(), self.0.generation())
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.0.index())
    }
}

/// A logical timestamp for the scheduler.
///
/// Time is a discrete, monotonically increasing tick counter. There is no
/// wall-clock mapping; the embedding layer advances the clock explicitly.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tick(u64);

impl Tick {
    /// The zero instant (epoch).
    pub const ZERO: Self = Self(0);

    /// The maximum representable instant.
    pub const MAX: Self = Self(u64::MAX);

    /// Creates a tick from a raw counter value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw counter value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Advances the tick by `delta`, saturating on overflow.
    #[must_use]
    pub const fn saturating_add(self, delta: u64) -> Self {
        Self(self.0.saturating_add(delta))
    }

    /// Returns the number of ticks between two instants.
    ///
    /// Returns 0 if `self` is before `earlier`.
    #[must_use]
    pub const fn ticks_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Debug for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tick({})", self.0)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}
