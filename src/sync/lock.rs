//! Mutual-exclusion lock with priority donation.
//!
//! A lock guards one resource with a donation-enabled wait queue: while the
//! lock is held, every blocked acquirer donates its effective priority to
//! the holder, so a high-priority thread stuck behind a low-priority holder
//! drags the holder up instead of waiting behind unrelated work (priority
//! inversion).
//!
//! Contract violations — releasing a lock you do not hold, re-acquiring a
//! lock you already hold — are caller bugs and panic.

use crate::runtime::{Scheduler, SelectPolicy};
use crate::types::{QueueId, ThreadId};

/// A mutual-exclusion lock.
///
/// The lock itself is a thin handle; all state lives in the scheduler's
/// wait-queue arena.
#[derive(Debug, Clone, Copy)]
pub struct Lock {
    queue: QueueId,
}

impl Lock {
    /// Creates a new, free lock with the deterministic priority policy.
    #[must_use]
    pub fn new(sched: &mut Scheduler) -> Self {
        Self::with_policy(sched, SelectPolicy::Priority)
    }

    /// Creates a new, free lock with an explicit selection policy.
    ///
    /// A lottery-policy lock hands off by weighted random draw and
    /// aggregates donated priority by ticket sum.
    #[must_use]
    pub fn with_policy(sched: &mut Scheduler, policy: SelectPolicy) -> Self {
        Self {
            queue: sched.new_queue("lock", policy, true),
        }
    }

    /// Returns the wait queue backing this lock.
    #[must_use]
    pub fn queue(&self) -> QueueId {
        self.queue
    }

    /// Returns the current holder, if any.
    #[must_use]
    pub fn holder(&self, sched: &Scheduler) -> Option<ThreadId> {
        sched.queue_owner(self.queue)
    }

    /// Returns true if `thread` currently holds this lock.
    #[must_use]
    pub fn is_held_by(&self, sched: &Scheduler, thread: ThreadId) -> bool {
        self.holder(sched) == Some(thread)
    }

    /// Acquires the lock for the running thread.
    ///
    /// The contention-free case grants the lock immediately and the caller
    /// keeps running. Under contention the caller blocks on the lock's
    /// queue and the processor is handed to the next ready thread; the
    /// blocked thread resumes only once a release dequeues it as the new
    /// holder.
    ///
    /// # Panics
    ///
    /// Panics if no thread is running, or on reentrant acquisition (the
    /// holder would wait for itself: deadlock by construction).
    pub fn acquire(&self, sched: &mut Scheduler) {
        let who = sched.running().expect("acquire requires a running thread");
        match self.holder(sched) {
            None => sched.acquire_directly(self.queue, who),
            Some(holder) => {
                assert!(
                    holder != who,
                    "{} reacquired a lock it already holds",
                    sched.thread_name(who)
                );
                tracing::trace!(thread = %who, holder = %holder, "lock contended");
                sched.block_current_on(self.queue);
            }
        }
    }

    /// Attempts to acquire the lock without blocking.
    ///
    /// Returns true on the contention-free fast path; returns false if the
    /// lock is held (by anyone, including the caller).
    ///
    /// # Panics
    ///
    /// Panics if no thread is running.
    pub fn try_acquire(&self, sched: &mut Scheduler) -> bool {
        let who = sched
            .running()
            .expect("try_acquire requires a running thread");
        if self.holder(sched).is_some() {
            return false;
        }
        sched.acquire_directly(self.queue, who);
        true
    }

    /// Releases the lock held by the running thread.
    ///
    /// The highest-priority waiter (per the lock's policy) becomes the new
    /// holder and is made runnable; with no waiters the lock becomes free.
    ///
    /// # Panics
    ///
    /// Panics if the running thread does not hold the lock.
    pub fn release(&self, sched: &mut Scheduler) {
        let who = sched.running().expect("release requires a running thread");
        assert!(
            self.is_held_by(sched, who),
            "{} released a lock it does not hold",
            sched.thread_name(who)
        );
        if let Some(next) = sched.dequeue(self.queue) {
            sched.make_ready(next);
        }
    }
}
