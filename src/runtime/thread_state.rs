//! Per-thread scheduling state.
//!
//! Each registered thread carries one [`ThreadState`]: its base and
//! effective priority, the queue it is blocked on (if any), and the queues
//! it currently owns. The state record is the node of the donation graph;
//! the propagation algorithm itself lives on the
//! [`Scheduler`](crate::runtime::Scheduler), which owns all the records.

use crate::config::{Priority, PRIORITY_DEFAULT};
use crate::types::QueueId;
use smallvec::SmallVec;

/// The run state of a thread as the scheduler sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadStatus {
    /// Currently executing on the (single) processor.
    Running,
    /// Waiting on the ready queue for the processor.
    Ready,
    /// Blocked on a wait queue other than the ready queue.
    Blocked(QueueId),
    /// Not runnable and not on any queue (never dispatched, sleeping on the
    /// alarm, or finished).
    Parked,
}

/// The scheduling state of one thread.
///
/// Effective priority is a cache of the donation fold; it is recomputed
/// whenever a donation edge appears, disappears, or changes weight.
#[derive(Debug)]
pub(crate) struct ThreadState {
    /// Diagnostic label carried into tracing output.
    pub(crate) name: String,
    /// Priority assigned by the caller, in `[PRIORITY_MIN, PRIORITY_MAX]`.
    pub(crate) base_priority: Priority,
    /// Base priority folded with all transitive donations.
    pub(crate) effective_priority: Priority,
    /// The queue this thread is currently blocked on, if any.
    pub(crate) waiting_for: Option<QueueId>,
    /// Queues this thread currently holds exclusive access to.
    pub(crate) owned_queues: SmallVec<[QueueId; 4]>,
    /// Stamp assigned when the thread joined its current queue; the FIFO
    /// tie-break among equal effective priorities.
    pub(crate) enqueue_seq: u64,
}

impl ThreadState {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            base_priority: PRIORITY_DEFAULT,
            effective_priority: PRIORITY_DEFAULT,
            waiting_for: None,
            owned_queues: SmallVec::new(),
            enqueue_seq: 0,
        }
    }

    /// Ticket count for lottery-mode queues.
    ///
    /// A priority-0 thread still holds one ticket, so the draw range is
    /// never empty and no waiter is unselectable.
    pub(crate) fn tickets(&self) -> Priority {
        self.effective_priority.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PRIORITY_DEFAULT;

    #[test]
    fn new_state_starts_at_default_priority() {
        let state = ThreadState::new("worker");
        assert_eq!(state.base_priority, PRIORITY_DEFAULT);
        assert_eq!(state.effective_priority, PRIORITY_DEFAULT);
        assert!(state.waiting_for.is_none());
        assert!(state.owned_queues.is_empty());
    }

    #[test]
    fn zero_priority_still_holds_a_ticket() {
        let mut state = ThreadState::new("idle");
        state.effective_priority = 0;
        assert_eq!(state.tickets(), 1);

        state.effective_priority = 5;
        assert_eq!(state.tickets(), 5);
    }
}
