// Copyright 2026 The Syncore Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Deadline Alarm
//!
//! This module provides the deadline-ordered sleep/wake service. A thread
//! calls [`Alarm::wait_until`] to suspend itself for a minimum number of
//! ticks; the periodic tick sweep ([`Alarm::on_tick`]) marks every thread
//! whose deadline has elapsed runnable again.
//!
//! # Design
//!
//! - **Min-heap by deadline**: waiters are stored in a binary heap ordered
//!   ascending by `(deadline, seq)`, so the sweep drains elapsed waiters in
//!   deadline order and equal deadlines wake FIFO
//! - **Uninterruptible insert+suspend**: `wait_until` holds the queue
//!   spinlock from reading the clock through the commit of its suspension,
//!   via [`Scheduler::suspend_current_with`]; the sweep can never observe a
//!   waiter that is not yet formally suspended, so no wakeup is lost
//! - **Non-blocking sweep**: the sweep runs in the tick-callback context
//!   and takes only the queue spinlock; it yields the interrupted thread's
//!   remaining turn before touching the queue
//!
//! There is no cancellation: a thread that calls `wait_until` stays queued
//! until the first sweep at or past its deadline.

use core::cmp::Ordering as CmpOrdering;
use core::sync::atomic::{AtomicU64, Ordering};
use std::collections::BinaryHeap;
use std::sync::Arc;

use log::{debug, trace};
use spin::Mutex as SpinMutex;

use crate::sched::Scheduler;
use crate::thread::ThreadId;
use crate::timer::{Clock, TickHandler};

/// ============================================================================
/// Waiter
/// ============================================================================

/// One suspended thread waiting for a deadline
///
/// Never mutated after creation; lives only from enqueue to wake.
#[derive(Debug)]
struct Waiter {
    /// Earliest tick at which the thread may be woken
    deadline: u64,

    /// Insertion sequence, FIFO tie-break for equal deadlines
    seq: u64,

    /// The suspended thread
    tid: ThreadId,
}

impl PartialEq for Waiter {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for Waiter {}

impl PartialOrd for Waiter {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Waiter {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Reverse for min-heap behavior
        match other.deadline.cmp(&self.deadline) {
            CmpOrdering::Equal => other.seq.cmp(&self.seq),
            ord => ord,
        }
    }
}

/// ============================================================================
/// Alarm
/// ============================================================================

/// Deadline-ordered sleep/wake service
///
/// Owns its wait queue exclusively; the queue is protected by a spinlock
/// because the sweep runs in the tick-callback context, which must not
/// block.
pub struct Alarm {
    sched: Arc<Scheduler>,
    clock: Arc<Clock>,

    /// Waiters, min-heap by `(deadline, seq)`
    queue: SpinMutex<BinaryHeap<Waiter>>,

    /// Next insertion sequence number
    seq: AtomicU64,
}

impl Alarm {
    /// Create an alarm over the given scheduler and clock
    pub fn new(sched: Arc<Scheduler>, clock: Arc<Clock>) -> Self {
        Self {
            sched,
            clock,
            queue: SpinMutex::new(BinaryHeap::new()),
            seq: AtomicU64::new(0),
        }
    }

    /// Suspend the calling thread for at least `min_ticks` ticks
    ///
    /// The thread becomes runnable at the first sweep whose tick is at or
    /// past `now + min_ticks`; never earlier. `min_ticks == 0` still
    /// suspends until the next sweep — there is no synchronous self-wake.
    ///
    /// Reading the clock, inserting the waiter, and suspending execute as
    /// one critical section relative to the sweep: the queue guard is held
    /// until the suspension is committed.
    pub fn wait_until(&self, min_ticks: u64) {
        let tid = self.sched.current_id();

        let mut queue = self.queue.lock();
        let deadline = self.clock.now().saturating_add(min_ticks);
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        queue.push(Waiter { deadline, seq, tid });

        debug!("alarm: tid={tid} sleeping until tick {deadline}");
        self.sched.suspend_current_with(queue);
    }

    /// Periodic tick sweep
    ///
    /// Invoked by the timer once per period, in the context of whichever
    /// thread the tick interrupted. First yields that thread's remaining
    /// turn, then wakes every waiter whose deadline has elapsed. A loop,
    /// not a single check: several waiters can share or straddle one tick.
    pub fn on_tick(&self) {
        self.sched.yield_now();

        let now = self.clock.now();
        let mut queue = self.queue.lock();
        while queue.peek().map_or(false, |w| w.deadline <= now) {
            if let Some(waiter) = queue.pop() {
                trace!(
                    "alarm: tick {now} waking tid={} (deadline {})",
                    waiter.tid,
                    waiter.deadline
                );
                self.sched.mark_runnable(waiter.tid);
            }
        }
    }

    /// Number of threads currently queued
    pub fn pending_waiters(&self) -> usize {
        self.queue.lock().len()
    }
}

impl TickHandler for Alarm {
    fn on_tick(&self) {
        Alarm::on_tick(self);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thread::ThreadState;
    use crate::timer::PeriodicTimer;
    use std::sync::Mutex as StdMutex;

    fn fixture() -> (Arc<Scheduler>, Arc<Clock>, Arc<Alarm>) {
        let sched = Scheduler::new();
        let clock = Arc::new(Clock::new());
        let alarm = Arc::new(Alarm::new(Arc::clone(&sched), Arc::clone(&clock)));
        (sched, clock, alarm)
    }

    fn sleeper(
        sched: &Arc<Scheduler>,
        alarm: &Arc<Alarm>,
        log: &Arc<StdMutex<Vec<&'static str>>>,
        name: &'static str,
        ticks: u64,
    ) -> ThreadId {
        let alarm = Arc::clone(alarm);
        let log = Arc::clone(log);
        sched.spawn(name, move || {
            alarm.wait_until(ticks);
            log.lock().unwrap().push(name);
        })
    }

    #[test]
    fn wakes_in_deadline_order() {
        // At tick 0, A waits 100 and B waits 50; sweeps fire at ticks 60
        // and 120. B wakes at 60, A only at 120.
        let (sched, clock, alarm) = fixture();
        let log = Arc::new(StdMutex::new(Vec::new()));

        let a = sleeper(&sched, &alarm, &log, "a", 100);
        let b = sleeper(&sched, &alarm, &log, "b", 50);
        sched.yield_now();
        assert_eq!(alarm.pending_waiters(), 2);

        clock.advance(60);
        alarm.on_tick();
        sched.yield_now();
        assert_eq!(*log.lock().unwrap(), vec!["b"]);
        assert_eq!(sched.thread_state(a), Some(ThreadState::Suspended));

        clock.advance(60);
        alarm.on_tick();
        sched.yield_now();
        assert_eq!(*log.lock().unwrap(), vec!["b", "a"]);
        sched.join(a);
        sched.join(b);
    }

    #[test]
    fn never_wakes_before_deadline() {
        let (sched, clock, alarm) = fixture();
        let log = Arc::new(StdMutex::new(Vec::new()));

        let w = sleeper(&sched, &alarm, &log, "w", 100);
        sched.yield_now();

        clock.advance(99);
        alarm.on_tick();
        sched.yield_now();
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(sched.thread_state(w), Some(ThreadState::Suspended));
        assert_eq!(alarm.pending_waiters(), 1);

        clock.advance(1);
        alarm.on_tick();
        sched.join(w);
        assert_eq!(*log.lock().unwrap(), vec!["w"]);
    }

    #[test]
    fn single_sweep_drains_all_elapsed_waiters() {
        let (sched, clock, alarm) = fixture();
        let log = Arc::new(StdMutex::new(Vec::new()));

        sleeper(&sched, &alarm, &log, "x", 50);
        sleeper(&sched, &alarm, &log, "y", 50);
        let z = sleeper(&sched, &alarm, &log, "z", 120);
        sched.yield_now();

        clock.advance(60);
        alarm.on_tick();
        sched.yield_now();

        // Both tick-50 waiters wake in one sweep, FIFO within the tie.
        assert_eq!(*log.lock().unwrap(), vec!["x", "y"]);
        assert_eq!(alarm.pending_waiters(), 1);
        assert_eq!(sched.thread_state(z), Some(ThreadState::Suspended));

        clock.advance(60);
        alarm.on_tick();
        sched.join(z);
        assert_eq!(*log.lock().unwrap(), vec!["x", "y", "z"]);
    }

    #[test]
    fn sweep_on_empty_queue_is_a_no_op() {
        let (_sched, clock, alarm) = fixture();
        clock.advance(200);
        alarm.on_tick();
        assert_eq!(alarm.pending_waiters(), 0);
    }

    #[test]
    fn zero_tick_wait_still_suspends_until_next_sweep() {
        let (sched, _clock, alarm) = fixture();
        let log = Arc::new(StdMutex::new(Vec::new()));

        let w = sleeper(&sched, &alarm, &log, "w", 0);
        sched.yield_now();

        // No sweep has run yet: the thread must still be asleep.
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(sched.thread_state(w), Some(ThreadState::Suspended));

        alarm.on_tick();
        sched.join(w);
        assert_eq!(*log.lock().unwrap(), vec!["w"]);
    }

    #[test]
    fn wakes_via_registered_periodic_timer() {
        let (sched, clock, alarm) = fixture();
        let timer = PeriodicTimer::new(Arc::clone(&clock), 50);
        timer.set_handler(Arc::clone(&alarm) as Arc<dyn TickHandler>);

        let log = Arc::new(StdMutex::new(Vec::new()));
        let w = sleeper(&sched, &alarm, &log, "w", 75);
        sched.yield_now();

        timer.fire(); // tick 50: 75 not yet elapsed
        sched.yield_now();
        assert!(log.lock().unwrap().is_empty());

        timer.fire(); // tick 100: 75 elapsed
        sched.join(w);
        assert_eq!(*log.lock().unwrap(), vec!["w"]);
    }

    #[test]
    fn waiter_heap_orders_by_deadline_then_seq() {
        let mut heap = BinaryHeap::new();
        heap.push(Waiter { deadline: 30, seq: 2, tid: 3 });
        heap.push(Waiter { deadline: 10, seq: 1, tid: 2 });
        heap.push(Waiter { deadline: 10, seq: 0, tid: 1 });

        let order: Vec<ThreadId> = std::iter::from_fn(|| heap.pop().map(|w| w.tid)).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }
}
