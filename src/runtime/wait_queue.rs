//! Wait queues: ordered collections of threads waiting for a resource.
//!
//! A wait queue stores its waiters unordered; the selection order is derived
//! on demand from each waiter's current effective priority and enqueue
//! stamp. Deriving the order at selection time means a priority change never
//! has to fix up a stale index position.
//!
//! Two selection policies exist:
//! - [`SelectPolicy::Priority`]: deterministic — highest effective priority
//!   wins, oldest enqueue stamp breaks ties (round-robin among equals).
//! - [`SelectPolicy::Lottery`]: weighted random — each waiter holds tickets
//!   equal to its effective priority (minimum one) and a seeded draw picks
//!   the winner.

use crate::runtime::thread_state::ThreadState;
use crate::types::ThreadId;
use crate::util::{Arena, DetRng};

/// How a queue selects the next thread among its waiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectPolicy {
    /// Highest effective priority first; FIFO among equals.
    #[default]
    Priority,
    /// Ticket-weighted random draw; effective priorities aggregate by sum.
    Lottery,
}

/// A wait queue record.
///
/// `donates` is fixed at creation: a donating queue transfers its waiters'
/// priorities to its owner (a lock); a non-donating queue does not (the
/// ready queue, a condition's wait set).
#[derive(Debug)]
pub(crate) struct WaitQueue {
    /// Diagnostic label carried into tracing output.
    pub(crate) label: &'static str,
    /// Whether waiters donate priority to the owner.
    pub(crate) donates: bool,
    /// Selection policy, fixed at creation.
    pub(crate) policy: SelectPolicy,
    /// Current waiters, unordered.
    pub(crate) waiters: Vec<ThreadId>,
    /// The thread holding the guarded resource, if any.
    pub(crate) owner: Option<ThreadId>,
}

impl WaitQueue {
    pub(crate) fn new(label: &'static str, policy: SelectPolicy, donates: bool) -> Self {
        Self {
            label,
            donates,
            policy,
            waiters: Vec::new(),
            owner: None,
        }
    }
}

/// Selects the index of the next waiter to dequeue, without removing it.
///
/// Returns `None` when there are no waiters. Lottery selection consumes one
/// draw from `rng`; priority selection leaves it untouched.
pub(crate) fn select_waiter(
    waiters: &[ThreadId],
    threads: &Arena<ThreadState>,
    policy: SelectPolicy,
    rng: &mut DetRng,
) -> Option<usize> {
    if waiters.is_empty() {
        return None;
    }
    match policy {
        SelectPolicy::Priority => {
            let mut best = 0;
            let mut best_state = threads.get(waiters[0].arena_index());
            for (idx, &waiter) in waiters.iter().enumerate().skip(1) {
                let state = threads.get(waiter.arena_index());
                let higher = state.effective_priority > best_state.effective_priority;
                let older = state.effective_priority == best_state.effective_priority
                    && state.enqueue_seq < best_state.enqueue_seq;
                if higher || older {
                    best = idx;
                    best_state = state;
                }
            }
            Some(best)
        }
        SelectPolicy::Lottery => {
            let total: u64 = waiters
                .iter()
                .map(|&w| u64::from(threads.get(w.arena_index()).tickets()))
                .sum();
            let mut draw = rng.next_u64_below(total);
            for (idx, &waiter) in waiters.iter().enumerate() {
                let tickets = u64::from(threads.get(waiter.arena_index()).tickets());
                if draw < tickets {
                    return Some(idx);
                }
                draw -= tickets;
            }
            unreachable!("lottery draw exceeded total tickets");
        }
    }
}
