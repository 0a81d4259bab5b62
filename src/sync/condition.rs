//! Condition variable bound to a lock.
//!
//! A condition variable parks threads that are waiting for an event, not
//! for a resource held by a specific thread — so its wait queue does not
//! donate priority (there is no single owner to donate to).
//!
//! Every operation requires the caller to hold the bound lock. A woken
//! thread does not run user code until it holds the lock again: waking
//! moves it from the condition's queue onto the lock's queue, where it
//! contends like any other acquirer and donates to the current holder.

use crate::runtime::{Scheduler, SelectPolicy};
use crate::sync::Lock;
use crate::types::QueueId;

/// A condition variable bound to exactly one [`Lock`].
#[derive(Debug, Clone, Copy)]
pub struct Condition {
    lock: Lock,
    queue: QueueId,
}

impl Condition {
    /// Creates a condition variable bound to `lock`.
    #[must_use]
    pub fn new(sched: &mut Scheduler, lock: Lock) -> Self {
        Self {
            lock,
            queue: sched.new_queue("condition", SelectPolicy::Priority, false),
        }
    }

    /// Returns the bound lock.
    #[must_use]
    pub fn lock(&self) -> Lock {
        self.lock
    }

    /// Returns the number of threads currently waiting on this condition.
    #[must_use]
    pub fn waiter_count(&self, sched: &Scheduler) -> usize {
        sched.waiter_count(self.queue)
    }

    /// Atomically releases the bound lock and parks the running thread on
    /// this condition.
    ///
    /// On wake-up the thread re-acquires the bound lock (possibly blocking
    /// behind other acquirers) before it runs again.
    ///
    /// # Panics
    ///
    /// Panics if the running thread does not hold the bound lock.
    pub fn sleep(&self, sched: &mut Scheduler) {
        let who = sched.running().expect("sleep requires a running thread");
        assert!(
            self.lock.is_held_by(sched, who),
            "{} slept on a condition without holding its lock",
            sched.thread_name(who)
        );
        self.lock.release(sched);
        tracing::trace!(thread = %who, "condition sleep");
        sched.block_current_on(self.queue);
    }

    /// Wakes at most one waiter.
    ///
    /// The woken thread is moved onto the bound lock's queue; it becomes
    /// runnable once a release hands it the lock.
    ///
    /// # Panics
    ///
    /// Panics if the running thread does not hold the bound lock.
    pub fn wake(&self, sched: &mut Scheduler) {
        self.assert_caller_holds_lock(sched);
        if let Some(woken) = sched.take_next(self.queue) {
            tracing::trace!(thread = %woken, "condition wake");
            sched.enqueue(self.lock.queue(), woken);
        }
    }

    /// Wakes every current waiter.
    ///
    /// Each woken thread independently contends for the bound lock.
    ///
    /// # Panics
    ///
    /// Panics if the running thread does not hold the bound lock.
    pub fn wake_all(&self, sched: &mut Scheduler) {
        self.assert_caller_holds_lock(sched);
        while let Some(woken) = sched.take_next(self.queue) {
            tracing::trace!(thread = %woken, "condition wake");
            sched.enqueue(self.lock.queue(), woken);
        }
    }

    fn assert_caller_holds_lock(&self, sched: &Scheduler) {
        let who = sched.running().expect("waking requires a running thread");
        assert!(
            self.lock.is_held_by(sched, who),
            "{} signalled a condition without holding its lock",
            sched.thread_name(who)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedConfig;
    use crate::runtime::ThreadStatus;
    use crate::test_utils::init_test_logging;
    use crate::types::ThreadId;

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    fn running_scheduler(names: &[&str]) -> (Scheduler, Vec<ThreadId>) {
        let mut s = Scheduler::new(SchedConfig::new(23));
        let ids: Vec<_> = names.iter().map(|n| s.register_thread(n)).collect();
        for &t in &ids {
            s.make_ready(t);
        }
        s.dispatch();
        (s, ids)
    }

    fn run_until(s: &mut Scheduler, thread: ThreadId) {
        while s.running() != Some(thread) {
            s.yield_now();
        }
    }

    #[test]
    fn woken_thread_waits_for_the_lock_before_running() {
        init_test("woken_thread_waits_for_the_lock_before_running");
        let (mut s, ids) = running_scheduler(&["x", "y"]);
        let (x, y) = (ids[0], ids[1]);
        let lock = Lock::new(&mut s);
        let cond = Condition::new(&mut s, lock);

        run_until(&mut s, x);
        lock.acquire(&mut s);
        cond.sleep(&mut s);
        crate::assert_with_log!(
            cond.waiter_count(&s) == 1,
            "x parked on the condition",
            1usize,
            cond.waiter_count(&s)
        );

        crate::test_section!("y signals while holding the lock");
        run_until(&mut s, y);
        lock.acquire(&mut s);
        cond.wake(&mut s);
        crate::assert_with_log!(
            s.status(x) == ThreadStatus::Blocked(lock.queue()),
            "x now contends for the lock, still suspended",
            ThreadStatus::Blocked(lock.queue()),
            s.status(x)
        );

        crate::test_section!("release hands the lock to x");
        lock.release(&mut s);
        crate::assert_with_log!(
            lock.is_held_by(&s, x),
            "x re-acquired on release",
            true,
            lock.is_held_by(&s, x)
        );
        crate::assert_with_log!(
            s.status(x) == ThreadStatus::Ready,
            "x is runnable only now",
            ThreadStatus::Ready,
            s.status(x)
        );
        crate::test_complete!("woken_thread_waits_for_the_lock_before_running");
    }

    #[test]
    fn wake_on_empty_condition_is_a_no_op() {
        init_test("wake_on_empty_condition_is_a_no_op");
        let (mut s, ids) = running_scheduler(&["x"]);
        let lock = Lock::new(&mut s);
        let cond = Condition::new(&mut s, lock);

        run_until(&mut s, ids[0]);
        lock.acquire(&mut s);
        cond.wake(&mut s);
        cond.wake_all(&mut s);
        crate::assert_with_log!(
            lock.is_held_by(&s, ids[0]),
            "caller unaffected",
            true,
            lock.is_held_by(&s, ids[0])
        );
        let bound = cond.lock().queue() == lock.queue();
        crate::assert_with_log!(bound, "condition stays bound to its lock", true, bound);
        crate::test_complete!("wake_on_empty_condition_is_a_no_op");
    }

    #[test]
    fn wake_all_moves_every_waiter_to_the_lock() {
        init_test("wake_all_moves_every_waiter_to_the_lock");
        let (mut s, ids) = running_scheduler(&["w1", "w2", "w3", "signaller"]);
        let signaller = ids[3];
        let lock = Lock::new(&mut s);
        let cond = Condition::new(&mut s, lock);

        for &w in &ids[..3] {
            run_until(&mut s, w);
            lock.acquire(&mut s);
            cond.sleep(&mut s);
        }
        assert_eq!(cond.waiter_count(&s), 3);

        run_until(&mut s, signaller);
        lock.acquire(&mut s);
        cond.wake_all(&mut s);
        crate::assert_with_log!(
            cond.waiter_count(&s) == 0,
            "condition drained",
            0usize,
            cond.waiter_count(&s)
        );

        // Each release hands the lock to exactly one former waiter.
        let mut resumed = Vec::new();
        lock.release(&mut s);
        while let Some(holder) = lock.holder(&s) {
            resumed.push(holder);
            run_until(&mut s, holder);
            lock.release(&mut s);
        }
        crate::assert_with_log!(
            resumed.len() == 3,
            "all three re-acquired in turn",
            3usize,
            resumed.len()
        );
        crate::test_complete!("wake_all_moves_every_waiter_to_the_lock");
    }

    #[test]
    #[should_panic(expected = "without holding its lock")]
    fn sleep_without_lock_panics() {
        let (mut s, ids) = running_scheduler(&["x"]);
        let lock = Lock::new(&mut s);
        let cond = Condition::new(&mut s, lock);
        run_until(&mut s, ids[0]);
        cond.sleep(&mut s);
    }

    #[test]
    #[should_panic(expected = "without holding its lock")]
    fn wake_without_lock_panics() {
        let (mut s, ids) = running_scheduler(&["x"]);
        let lock = Lock::new(&mut s);
        let cond = Condition::new(&mut s, lock);
        run_until(&mut s, ids[0]);
        cond.wake(&mut s);
    }
}
