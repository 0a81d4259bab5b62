//! The scheduler context: threads, wait queues, clock, and donation.
//!
//! A [`Scheduler`] owns every piece of mutable scheduling state — the
//! thread-state arena, the wait-queue arena, the ready queue, the running
//! thread, the logical clock, the FIFO stamp counter, and the RNG for
//! lottery draws. Nothing is global, so independent schedulers can coexist
//! (and be tested) in isolation.
//!
//! The model is a single logical processor with cooperative switching:
//! exactly one thread runs at a time, and every operation here is one
//! atomic, non-preemptible step. That model is encoded directly in the
//! borrow checker — every operation takes `&mut self`, so no state can be
//! observed mid-update.
//!
//! # Donation
//!
//! A donating queue transfers its waiters' effective priorities to its
//! owner. Effective priority is recomputed from the point of change and
//! propagated one hop at a time up the `waiting_for → owner` chain,
//! stopping as soon as a hop's value settles. The walk panics if it runs
//! longer than the thread population: the chain relation is required to be
//! acyclic, so a longer walk proves a cycle (deadlock by construction).

pub mod alarm;
pub mod thread_state;
pub mod wait_queue;

pub use alarm::Alarm;
pub use thread_state::ThreadStatus;
pub use wait_queue::SelectPolicy;

use crate::config::{Priority, SchedConfig, PRIORITY_MAX, PRIORITY_MIN};
use crate::types::{QueueId, ThreadId, Tick};
use crate::util::{Arena, DetRng};

use thread_state::ThreadState;
use wait_queue::{select_waiter, WaitQueue};

/// The cooperative scheduler context.
///
/// See the [module documentation](self) for the model.
#[derive(Debug)]
pub struct Scheduler {
    threads: Arena<ThreadState>,
    queues: Arena<WaitQueue>,
    /// The CPU ready queue: non-donating, priority policy. The running
    /// thread owns it, the way a lock holder owns a lock's queue.
    ready: QueueId,
    running: Option<ThreadId>,
    clock: Tick,
    /// Monotonic stamp for FIFO tie-breaks; a counter rather than the tick
    /// value so two enqueues within one tick still have a total order.
    next_seq: u64,
    rng: DetRng,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedConfig::default())
    }
}

impl Scheduler {
    /// Creates a scheduler from the given configuration.
    ///
    /// # Panics
    ///
    /// Panics if the configuration fails validation.
    #[must_use]
    pub fn new(config: SchedConfig) -> Self {
        config.validate().expect("invalid scheduler configuration");
        let mut queues = Arena::with_capacity(config.queue_capacity);
        let ready = QueueId::from_arena(queues.insert(WaitQueue::new(
            "ready",
            SelectPolicy::Priority,
            false,
        )));
        Self {
            threads: Arena::with_capacity(config.thread_capacity),
            queues,
            ready,
            running: None,
            clock: Tick::ZERO,
            next_seq: 0,
            rng: DetRng::new(config.seed),
        }
    }

    // ------------------------------------------------------------------
    // Threads
    // ------------------------------------------------------------------

    /// Registers a new thread and creates its scheduling state.
    ///
    /// The thread starts parked with the default priority; it runs only
    /// after [`make_ready`](Self::make_ready) and a dispatch.
    pub fn register_thread(&mut self, name: &str) -> ThreadId {
        let id = ThreadId::from_arena(self.threads.insert(ThreadState::new(name)));
        tracing::debug!(thread = %id, name, "thread registered");
        id
    }

    /// Removes a thread's scheduling state.
    ///
    /// # Panics
    ///
    /// Panics if the thread is running, waiting on a queue, or still owns
    /// queues — finishing in any of those states is a caller bug.
    pub fn deregister_thread(&mut self, thread: ThreadId) {
        assert!(
            self.running != Some(thread),
            "cannot deregister the running thread {thread}"
        );
        let state = self.threads.get(thread.arena_index());
        assert!(
            state.waiting_for.is_none(),
            "cannot deregister {}: still on a wait queue",
            state.name
        );
        assert!(
            state.owned_queues.is_empty(),
            "cannot deregister {}: still owns {} queue(s)",
            state.name,
            state.owned_queues.len()
        );
        self.threads.remove(thread.arena_index());
    }

    /// Returns the number of registered threads.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Returns the diagnostic name of a thread.
    #[must_use]
    pub fn thread_name(&self, thread: ThreadId) -> &str {
        &self.threads.get(thread.arena_index()).name
    }

    /// Returns the currently running thread, if any.
    #[must_use]
    pub fn running(&self) -> Option<ThreadId> {
        self.running
    }

    /// Returns the run state of a thread.
    #[must_use]
    pub fn status(&self, thread: ThreadId) -> ThreadStatus {
        if self.running == Some(thread) {
            return ThreadStatus::Running;
        }
        match self.threads.get(thread.arena_index()).waiting_for {
            Some(q) if q == self.ready => ThreadStatus::Ready,
            Some(q) => ThreadStatus::Blocked(q),
            None => ThreadStatus::Parked,
        }
    }

    // ------------------------------------------------------------------
    // Priorities
    // ------------------------------------------------------------------

    /// Returns a thread's base priority.
    #[must_use]
    pub fn priority(&self, thread: ThreadId) -> Priority {
        self.threads.get(thread.arena_index()).base_priority
    }

    /// Returns a thread's effective priority (base folded with donations).
    #[must_use]
    pub fn effective_priority(&self, thread: ThreadId) -> Priority {
        self.threads.get(thread.arena_index()).effective_priority
    }

    /// Sets a thread's base priority and repropagates donations.
    ///
    /// # Panics
    ///
    /// Panics if `priority` lies outside `[PRIORITY_MIN, PRIORITY_MAX]`.
    pub fn set_priority(&mut self, thread: ThreadId, priority: Priority) {
        assert!(
            (PRIORITY_MIN..=PRIORITY_MAX).contains(&priority),
            "priority {priority} outside [{PRIORITY_MIN}, {PRIORITY_MAX}]"
        );
        let state = self.threads.get_mut(thread.arena_index());
        if state.base_priority == priority {
            return;
        }
        state.base_priority = priority;
        self.refresh_effective(thread);
    }

    /// Raises the running thread's base priority by one.
    ///
    /// Returns false if it is already at the maximum.
    pub fn increase_priority(&mut self) -> bool {
        let thread = self.running.expect("increase_priority requires a running thread");
        let priority = self.priority(thread);
        if priority == PRIORITY_MAX {
            return false;
        }
        self.set_priority(thread, priority + 1);
        true
    }

    /// Lowers the running thread's base priority by one.
    ///
    /// Returns false if it is already at the minimum.
    pub fn decrease_priority(&mut self) -> bool {
        let thread = self.running.expect("decrease_priority requires a running thread");
        let priority = self.priority(thread);
        if priority == PRIORITY_MIN {
            return false;
        }
        self.set_priority(thread, priority - 1);
        true
    }

    // ------------------------------------------------------------------
    // Clock
    // ------------------------------------------------------------------

    /// Returns the current logical time.
    #[must_use]
    pub fn current_tick(&self) -> Tick {
        self.clock
    }

    /// Advances the logical clock and returns the new time.
    pub fn advance_clock(&mut self, ticks: u64) -> Tick {
        self.clock = self.clock.saturating_add(ticks);
        self.clock
    }

    // ------------------------------------------------------------------
    // Wait queue primitives
    // ------------------------------------------------------------------

    /// Creates a new wait queue.
    ///
    /// `donates` is fixed for the queue's lifetime: donating queues
    /// transfer waiter priorities to their owner.
    pub fn new_queue(&mut self, label: &'static str, policy: SelectPolicy, donates: bool) -> QueueId {
        QueueId::from_arena(self.queues.insert(WaitQueue::new(label, policy, donates)))
    }

    /// Returns the ready queue's id.
    #[must_use]
    pub fn ready_queue(&self) -> QueueId {
        self.ready
    }

    /// Returns the owner of a queue, if any.
    #[must_use]
    pub fn queue_owner(&self, queue: QueueId) -> Option<ThreadId> {
        self.queues.get(queue.arena_index()).owner
    }

    /// Returns the number of threads waiting on a queue.
    #[must_use]
    pub fn waiter_count(&self, queue: QueueId) -> usize {
        self.queues.get(queue.arena_index()).waiters.len()
    }

    /// Adds a thread to a queue's waiter set.
    ///
    /// If the queue donates and currently has an owner, the owner's
    /// effective priority is refreshed — a new waiter may now donate
    /// through it.
    ///
    /// # Panics
    ///
    /// Panics if the thread is already waiting on some queue, or owns this
    /// one.
    pub fn enqueue(&mut self, queue_id: QueueId, thread: ThreadId) {
        let seq = self.next_seq;
        self.next_seq += 1;

        let state = self.threads.get_mut(thread.arena_index());
        assert!(
            state.waiting_for.is_none(),
            "{} is already waiting on a queue",
            state.name
        );
        state.waiting_for = Some(queue_id);
        state.enqueue_seq = seq;

        let queue = self.queues.get_mut(queue_id.arena_index());
        assert!(
            queue.owner != Some(thread),
            "{thread} cannot wait on the {} queue it owns",
            queue.label
        );
        queue.waiters.push(thread);
        tracing::trace!(thread = %thread, queue = queue.label, seq, "enqueued");

        if queue.donates {
            if let Some(owner) = queue.owner {
                self.refresh_effective(owner);
            }
        }
    }

    /// Removes and returns the best waiter, transferring queue ownership
    /// to it.
    ///
    /// The previous owner (if any) first loses the queue and its
    /// donations. Returns `None` when no thread is waiting, leaving the
    /// queue unowned.
    pub fn dequeue(&mut self, queue_id: QueueId) -> Option<ThreadId> {
        self.clear_owner(queue_id);

        let winner_idx = {
            let Self {
                queues,
                threads,
                rng,
                ..
            } = self;
            let queue = queues.get(queue_id.arena_index());
            select_waiter(&queue.waiters, threads, queue.policy, rng)
        };
        let idx = winner_idx?;

        let queue = self.queues.get_mut(queue_id.arena_index());
        let winner = queue.waiters.swap_remove(idx);
        queue.owner = Some(winner);
        tracing::trace!(thread = %winner, queue = queue.label, "dequeued as owner");

        let state = self.threads.get_mut(winner.arena_index());
        debug_assert_eq!(state.waiting_for, Some(queue_id));
        state.waiting_for = None;
        assert!(
            !state.owned_queues.contains(&queue_id),
            "{} already owns the queue it was dequeued from",
            state.name
        );
        state.owned_queues.push(queue_id);
        self.refresh_effective(winner);
        Some(winner)
    }

    /// Removes and returns the best waiter without transferring ownership.
    ///
    /// Used where selection is not a resource hand-off: waking a condition
    /// waiter, draining a wait set. The queue's owner (if donating) loses
    /// the departing waiter's donation.
    pub fn take_next(&mut self, queue_id: QueueId) -> Option<ThreadId> {
        let taken_idx = {
            let Self {
                queues,
                threads,
                rng,
                ..
            } = self;
            let queue = queues.get(queue_id.arena_index());
            select_waiter(&queue.waiters, threads, queue.policy, rng)
        };
        let idx = taken_idx?;

        let queue = self.queues.get_mut(queue_id.arena_index());
        let taken = queue.waiters.swap_remove(idx);
        let donates = queue.donates;
        let owner = queue.owner;

        let state = self.threads.get_mut(taken.arena_index());
        debug_assert_eq!(state.waiting_for, Some(queue_id));
        state.waiting_for = None;

        if donates {
            if let Some(owner) = owner {
                self.refresh_effective(owner);
            }
        }
        Some(taken)
    }

    /// Previews what [`dequeue`](Self::dequeue) would select, without
    /// modifying the queue.
    ///
    /// Lottery queues are previewed with a fork of the RNG, so the preview
    /// matches the next dequeue as long as no other draw happens in
    /// between.
    #[must_use]
    pub fn peek_next(&self, queue_id: QueueId) -> Option<ThreadId> {
        let queue = self.queues.get(queue_id.arena_index());
        let mut rng = self.rng.clone();
        select_waiter(&queue.waiters, &self.threads, queue.policy, &mut rng)
            .map(|idx| queue.waiters[idx])
    }

    /// Grants an uncontended queue to a thread directly.
    ///
    /// # Panics
    ///
    /// Panics if the queue has waiters or an owner — the direct path
    /// exists only for the contention-free case.
    pub fn acquire_directly(&mut self, queue_id: QueueId, thread: ThreadId) {
        let queue = self.queues.get_mut(queue_id.arena_index());
        assert!(
            queue.waiters.is_empty(),
            "direct acquisition of contended {} queue",
            queue.label
        );
        assert!(
            queue.owner.is_none(),
            "direct acquisition of owned {} queue",
            queue.label
        );
        queue.owner = Some(thread);

        let state = self.threads.get_mut(thread.arena_index());
        assert!(
            !state.owned_queues.contains(&queue_id),
            "{} already owns this queue",
            state.name
        );
        state.owned_queues.push(queue_id);
        self.refresh_effective(thread);
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Marks a parked thread runnable by placing it on the ready queue.
    ///
    /// # Panics
    ///
    /// Panics if the thread is running or already on a queue.
    pub fn make_ready(&mut self, thread: ThreadId) {
        assert!(
            self.running != Some(thread),
            "the running thread {thread} is already scheduled"
        );
        self.enqueue(self.ready, thread);
    }

    /// If the processor is idle, picks the next thread off the ready queue
    /// and runs it.
    ///
    /// Returns the running thread (possibly unchanged), or `None` if the
    /// ready queue is empty and nothing runs.
    pub fn dispatch(&mut self) -> Option<ThreadId> {
        if self.running.is_some() {
            return self.running;
        }
        let next = self.dequeue(self.ready)?;
        self.running = Some(next);
        tracing::trace!(thread = %next, "dispatched");
        Some(next)
    }

    /// Yields the processor: the running thread re-enters the ready queue
    /// and the best ready thread (possibly the same one) is dispatched.
    ///
    /// # Panics
    ///
    /// Panics if no thread is running.
    pub fn yield_now(&mut self) -> Option<ThreadId> {
        let current = self.running.take().expect("yield_now requires a running thread");
        self.clear_owner(self.ready);
        self.enqueue(self.ready, current);
        self.dispatch()
    }

    /// Blocks the running thread on a wait queue and dispatches the next
    /// ready thread.
    ///
    /// # Panics
    ///
    /// Panics if no thread is running.
    pub fn block_current_on(&mut self, queue_id: QueueId) -> Option<ThreadId> {
        let current = self
            .running
            .take()
            .expect("block_current_on requires a running thread");
        self.clear_owner(self.ready);
        self.enqueue(queue_id, current);
        tracing::trace!(thread = %current, "blocked");
        self.dispatch()
    }

    /// Suspends the running thread without placing it on any queue, and
    /// dispatches the next ready thread.
    ///
    /// The caller keeps the thread's handle and is responsible for a later
    /// [`make_ready`](Self::make_ready) (the alarm does exactly this).
    ///
    /// # Panics
    ///
    /// Panics if no thread is running.
    pub fn suspend_current(&mut self) -> Option<ThreadId> {
        let current = self
            .running
            .take()
            .expect("suspend_current requires a running thread");
        self.clear_owner(self.ready);
        tracing::trace!(thread = %current, "suspended");
        self.dispatch()
    }

    // ------------------------------------------------------------------
    // Donation propagation
    // ------------------------------------------------------------------

    /// Releases a queue's ownership, removing the owner's donation source.
    fn clear_owner(&mut self, queue_id: QueueId) {
        let queue = self.queues.get_mut(queue_id.arena_index());
        let Some(prev) = queue.owner.take() else {
            return;
        };
        let state = self.threads.get_mut(prev.arena_index());
        let pos = state
            .owned_queues
            .iter()
            .position(|&q| q == queue_id)
            .expect("owner record is missing a queue it owns");
        state.owned_queues.swap_remove(pos);
        self.refresh_effective(prev);
    }

    /// Recomputes effective priority from the point of change, walking one
    /// hop at a time up the `waiting_for → owner` chain until a hop's
    /// value settles.
    ///
    /// # Panics
    ///
    /// Panics if the walk exceeds the thread population: the donation
    /// relation must be acyclic, so a longer walk proves a cycle.
    fn refresh_effective(&mut self, start: ThreadId) {
        let mut current = start;
        let mut hops = 0usize;
        loop {
            hops += 1;
            assert!(
                hops <= self.threads.len(),
                "donation cycle detected while updating {current}"
            );

            let new_value = self.computed_priority(current);
            let state = self.threads.get_mut(current.arena_index());
            if state.effective_priority == new_value {
                break;
            }
            tracing::trace!(
                thread = %current,
                old = state.effective_priority,
                new = new_value,
                "effective priority updated"
            );
            state.effective_priority = new_value;

            let Some(queue_id) = state.waiting_for else {
                break;
            };
            let queue = self.queues.get(queue_id.arena_index());
            if !queue.donates {
                break;
            }
            let Some(owner) = queue.owner else {
                break;
            };
            assert!(
                owner != current,
                "{current} owns the queue it is waiting on"
            );
            current = owner;
        }
    }

    /// Folds a thread's base priority with its owned queues' waiters:
    /// max for priority queues, saturating ticket sum for lottery queues.
    fn computed_priority(&self, thread: ThreadId) -> Priority {
        let state = self.threads.get(thread.arena_index());
        let mut value = state.base_priority;
        for &queue_id in &state.owned_queues {
            let queue = self.queues.get(queue_id.arena_index());
            if !queue.donates {
                continue;
            }
            match queue.policy {
                SelectPolicy::Priority => {
                    for &waiter in &queue.waiters {
                        value = value.max(self.threads.get(waiter.arena_index()).effective_priority);
                    }
                }
                SelectPolicy::Lottery => {
                    for &waiter in &queue.waiters {
                        value =
                            value.saturating_add(self.threads.get(waiter.arena_index()).tickets());
                    }
                }
            }
        }
        value
    }
}
