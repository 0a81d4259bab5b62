//! Alarm: a time-ordered sleep/wake queue.
//!
//! This module provides a small min-heap of `(wake_tick, thread)` pairs to
//! support deadline-driven wakeups. Sleeping threads are suspended off every
//! wait queue; the alarm holds their handles until the clock reaches the
//! deadline, then puts them back on the ready queue.

use crate::runtime::Scheduler;
use crate::types::{ThreadId, Tick};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Eq, PartialEq)]
struct AlarmEntry {
    wake_tick: Tick,
    thread: ThreadId,
    generation: u64,
}

impl Ord for AlarmEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (earliest deadline first).
        other
            .wake_tick
            .cmp(&self.wake_tick)
            .then_with(|| other.generation.cmp(&self.generation))
    }
}

impl PartialOrd for AlarmEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A min-heap of sleeping threads ordered by wake deadline.
#[derive(Debug, Default)]
pub struct Alarm {
    heap: BinaryHeap<AlarmEntry>,
    next_generation: u64,
}

impl Alarm {
    /// Creates a new empty alarm.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of sleeping threads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns true if no thread is sleeping.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Returns the earliest wake deadline, if any.
    #[must_use]
    pub fn peek_deadline(&self) -> Option<Tick> {
        self.heap.peek().map(|e| e.wake_tick)
    }

    /// Puts the running thread to sleep for at least `ticks`.
    ///
    /// The thread is made runnable on the first timer tick where the clock
    /// has reached `now + ticks`; it is not guaranteed to run immediately,
    /// only to become ready. A non-positive `ticks` is an immediate yield
    /// with no sleep.
    ///
    /// # Panics
    ///
    /// Panics if no thread is running.
    pub fn wait_until(&mut self, sched: &mut Scheduler, ticks: i64) {
        if ticks <= 0 {
            sched.yield_now();
            return;
        }
        #[allow(clippy::cast_sign_loss)]
        let wake_tick = sched.current_tick().saturating_add(ticks as u64);
        let thread = sched
            .running()
            .expect("wait_until requires a running thread");
        let generation = self.next_generation;
        self.next_generation += 1;
        self.heap.push(AlarmEntry {
            wake_tick,
            thread,
            generation,
        });
        tracing::trace!(thread = %thread, wake = %wake_tick, "sleeping");
        sched.suspend_current();
    }

    /// The periodic timer callback.
    ///
    /// Makes runnable every sleeper whose deadline has been reached, then
    /// yields the processor (the cooperative preemption point). Heap order
    /// guarantees the scan can stop at the first future deadline.
    pub fn on_timer_tick(&mut self, sched: &mut Scheduler) {
        let now = sched.current_tick();
        while let Some(entry) = self.heap.peek() {
            if entry.wake_tick > now {
                break;
            }
            let entry = self.heap.pop().expect("peeked entry exists");
            tracing::trace!(thread = %entry.thread, wake = %entry.wake_tick, "alarm wake");
            sched.make_ready(entry.thread);
        }
        if sched.running().is_some() {
            sched.yield_now();
        } else {
            sched.dispatch();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedConfig;
    use crate::runtime::ThreadStatus;
    use crate::test_utils::init_test_logging;

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    fn sched_with_idle() -> (Scheduler, crate::types::ThreadId) {
        let mut s = Scheduler::new(SchedConfig::new(7));
        // A second thread keeps the processor busy while sleepers wait.
        let idle = s.register_thread("idle");
        s.make_ready(idle);
        (s, idle)
    }

    #[test]
    fn sleeper_wakes_at_first_tick_past_deadline() {
        init_test("sleeper_wakes_at_first_tick_past_deadline");
        let (mut s, _idle) = sched_with_idle();
        let t = s.register_thread("sleeper");
        s.make_ready(t);
        s.dispatch();
        // Equal priorities: idle was made ready first and runs; rotate to t.
        while s.running() != Some(t) {
            s.yield_now();
        }

        let mut alarm = Alarm::new();
        alarm.wait_until(&mut s, 10);
        crate::assert_with_log!(
            s.status(t) == ThreadStatus::Parked,
            "sleeper left every queue",
            ThreadStatus::Parked,
            s.status(t)
        );

        crate::test_section!("before the deadline");
        s.advance_clock(9);
        alarm.on_timer_tick(&mut s);
        crate::assert_with_log!(
            s.status(t) == ThreadStatus::Parked,
            "not woken early",
            ThreadStatus::Parked,
            s.status(t)
        );

        crate::test_section!("at the deadline");
        s.advance_clock(1);
        alarm.on_timer_tick(&mut s);
        let woken = s.status(t) == ThreadStatus::Ready || s.status(t) == ThreadStatus::Running;
        crate::assert_with_log!(woken, "woken at the exact deadline", true, woken);
        crate::assert_with_log!(alarm.is_empty(), "heap drained", true, alarm.is_empty());
        crate::test_complete!("sleeper_wakes_at_first_tick_past_deadline");
    }

    #[test]
    fn non_positive_sleep_is_a_yield() {
        init_test("non_positive_sleep_is_a_yield");
        let mut s = Scheduler::new(SchedConfig::new(7));
        let a = s.register_thread("a");
        let b = s.register_thread("b");
        s.make_ready(a);
        s.make_ready(b);
        s.dispatch();

        let mut alarm = Alarm::new();
        alarm.wait_until(&mut s, 0);
        crate::assert_with_log!(alarm.is_empty(), "nothing queued", true, alarm.is_empty());
        crate::assert_with_log!(
            s.running() == Some(b),
            "processor handed over",
            Some(b),
            s.running()
        );

        alarm.wait_until(&mut s, -5);
        crate::assert_with_log!(
            s.running() == Some(a),
            "negative sleep also yields",
            Some(a),
            s.running()
        );
        crate::test_complete!("non_positive_sleep_is_a_yield");
    }

    #[test]
    fn wakes_all_due_sleepers_in_one_tick() {
        init_test("wakes_all_due_sleepers_in_one_tick");
        let (mut s, idle) = sched_with_idle();
        let t1 = s.register_thread("t1");
        let t2 = s.register_thread("t2");
        let t3 = s.register_thread("t3");
        let mut alarm = Alarm::new();

        for (t, ticks) in [(t1, 5i64), (t2, 8), (t3, 50)] {
            s.make_ready(t);
            s.dispatch();
            while s.running() != Some(t) {
                s.yield_now();
            }
            alarm.wait_until(&mut s, ticks);
        }
        assert_eq!(s.running(), Some(idle));
        assert_eq!(alarm.len(), 3);
        assert_eq!(alarm.peek_deadline(), Some(crate::types::Tick::new(5)));

        s.advance_clock(10);
        alarm.on_timer_tick(&mut s);
        crate::assert_with_log!(alarm.len() == 1, "two of three woke", 1usize, alarm.len());
        let t3_parked = s.status(t3) == ThreadStatus::Parked;
        crate::assert_with_log!(t3_parked, "far deadline still sleeps", true, t3_parked);
        crate::test_complete!("wakes_all_due_sleepers_in_one_tick");
    }

    #[test]
    fn tick_dispatches_when_processor_is_idle() {
        init_test("tick_dispatches_when_processor_is_idle");
        let mut s = Scheduler::new(SchedConfig::new(7));
        let t = s.register_thread("solo");
        s.make_ready(t);
        s.dispatch();

        let mut alarm = Alarm::new();
        alarm.wait_until(&mut s, 3);
        crate::assert_with_log!(
            s.running().is_none(),
            "processor idles while the only thread sleeps",
            None::<crate::types::ThreadId>,
            s.running()
        );

        s.advance_clock(3);
        alarm.on_timer_tick(&mut s);
        crate::assert_with_log!(
            s.running() == Some(t),
            "tick wakes and redispatches",
            Some(t),
            s.running()
        );
        crate::test_complete!("tick_dispatches_when_processor_is_idle");
    }
}
