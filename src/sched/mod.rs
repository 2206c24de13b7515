// Copyright 2026 The Syncore Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Cooperative Thread Scheduler
//!
//! This module implements a cooperative, single-CPU thread scheduler.
//! Cooperative threads are hosted on OS threads, but at most one of them
//! executes at any instant; control transfers only at explicit suspension
//! points (`yield_now`, `suspend_current`, thread exit). Everything that
//! happens between two suspension points is atomic with respect to every
//! other cooperative thread.
//!
//! # Design
//!
//! - **FIFO round-robin**: a single ready queue, no priorities
//! - **Single current thread**: dispatch moves the head of the ready queue
//!   into the `current` slot and blocks everyone else
//! - **Suspend/wake**: `suspend_current` takes a thread off the CPU without
//!   queuing it; `mark_runnable` is the only way back to the ready queue
//!   and is idempotent
//! - **Atomic critical sections**: `suspend_current_with` releases a
//!   caller-supplied guard only after the suspension has been committed,
//!   so insert-then-suspend protocols cannot lose a wakeup
//!
//! # Usage
//!
//! ```text
//! let sched = Scheduler::new();            // caller becomes thread "main"
//! let tid = sched.spawn("worker", move || { ... });
//! sched.yield_now();                       // let the worker run
//! sched.join(tid);
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex};

use log::trace;

use crate::thread::{current_tid, set_current_tid, ThreadId, ThreadRecord, ThreadState, TidAllocator};

/// ============================================================================
/// Scheduler State
/// ============================================================================

struct SchedState {
    /// The single currently executing thread
    current: Option<ThreadId>,

    /// FIFO ready queue
    ready: VecDeque<ThreadId>,

    /// Per-thread records, keyed by TID
    records: BTreeMap<ThreadId, ThreadRecord>,
}

impl SchedState {
    fn record(&self, tid: ThreadId) -> &ThreadRecord {
        self.records
            .get(&tid)
            .unwrap_or_else(|| panic!("scheduler: unknown thread {tid}"))
    }

    fn record_mut(&mut self, tid: ThreadId) -> &mut ThreadRecord {
        self.records
            .get_mut(&tid)
            .unwrap_or_else(|| panic!("scheduler: unknown thread {tid}"))
    }

    /// Move the head of the ready queue into the current slot.
    ///
    /// Leaves `current` empty when nothing is ready; callers that cannot
    /// tolerate an idle system must check first.
    fn dispatch_next(&mut self) {
        self.current = self.ready.pop_front();
    }
}

/// ============================================================================
/// Scheduler
/// ============================================================================

/// Cooperative thread scheduler
///
/// All state is per-instance; independent schedulers never interfere, so
/// concurrently running tests each get their own.
pub struct Scheduler {
    state: Mutex<SchedState>,
    cv: Condvar,
    tids: TidAllocator,
}

impl Scheduler {
    /// Create a scheduler and adopt the calling OS thread as cooperative
    /// thread "main", running and current.
    pub fn new() -> Arc<Self> {
        let sched = Arc::new(Self {
            state: Mutex::new(SchedState {
                current: None,
                ready: VecDeque::new(),
                records: BTreeMap::new(),
            }),
            cv: Condvar::new(),
            tids: TidAllocator::new(),
        });

        let tid = sched.tids.alloc();
        {
            let mut state = sched.state.lock().expect("scheduler state poisoned");
            state
                .records
                .insert(tid, ThreadRecord::new("main", ThreadState::Running));
            state.current = Some(tid);
        }
        set_current_tid(tid);

        trace!("scheduler: adopted main thread tid={tid}");
        sched
    }

    /// Spawn a cooperative thread
    ///
    /// The thread is placed at the tail of the ready queue and starts
    /// executing `entry` when first dispatched. Returns its TID.
    pub fn spawn<F>(self: &Arc<Self>, name: &str, entry: F) -> ThreadId
    where
        F: FnOnce() + Send + 'static,
    {
        let tid = self.tids.alloc();
        {
            let mut state = self.state.lock().expect("scheduler state poisoned");
            state
                .records
                .insert(tid, ThreadRecord::new(name, ThreadState::Ready));
            state.ready.push_back(tid);
        }

        trace!("scheduler: spawned tid={tid} name={name}");

        let sched = Arc::clone(self);
        std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                set_current_tid(tid);
                sched.wait_for_dispatch(tid);
                entry();
                sched.exit_current();
            })
            .expect("scheduler: failed to spawn host thread");

        tid
    }

    /// Yield the remainder of the current thread's turn
    ///
    /// The caller moves to the tail of the ready queue and the head is
    /// dispatched. If nothing else is ready the caller just keeps running.
    pub fn yield_now(&self) {
        let me = current_tid();
        let mut state = self.state.lock().expect("scheduler state poisoned");
        assert_eq!(
            state.current,
            Some(me),
            "yield: caller is not the running thread"
        );

        if state.ready.is_empty() {
            return;
        }

        state.record_mut(me).state = ThreadState::Ready;
        state.ready.push_back(me);
        state.dispatch_next();
        trace!("scheduler: tid={me} yielded to {:?}", state.current);
        self.cv.notify_all();

        state = self.block_until_dispatched(state, me);
        state.record_mut(me).state = ThreadState::Running;
    }

    /// Suspend the calling thread until something marks it runnable
    pub fn suspend_current(&self) {
        self.suspend_current_with(());
    }

    /// Suspend the calling thread, releasing `guard` atomically
    ///
    /// `guard` (typically a spinlock guard over some wait structure) is
    /// dropped only after the caller's suspension is committed in scheduler
    /// state. Anyone who subsequently takes the same guard and calls
    /// [`Scheduler::mark_runnable`] therefore observes the thread as
    /// suspended; the wakeup cannot be lost to an insert/suspend race.
    ///
    /// Panics if no other thread is runnable; a system that suspends its
    /// last runnable thread is deadlocked, which is a contract violation
    /// rather than a recoverable condition.
    pub fn suspend_current_with<G>(&self, guard: G) {
        let me = current_tid();
        let mut state = self.state.lock().expect("scheduler state poisoned");
        assert_eq!(
            state.current,
            Some(me),
            "suspend: caller is not the running thread"
        );

        state.record_mut(me).state = ThreadState::Suspended;
        assert!(
            !state.ready.is_empty(),
            "suspend: no runnable thread left, system is deadlocked"
        );
        state.dispatch_next();
        trace!("scheduler: tid={me} suspended, dispatched {:?}", state.current);

        // Suspension is committed; the caller's critical section may end.
        drop(guard);
        self.cv.notify_all();

        state = self.block_until_dispatched(state, me);
        state.record_mut(me).state = ThreadState::Running;
    }

    /// Mark a suspended thread runnable
    ///
    /// Idempotent: threads that are already ready, running, or finished are
    /// left alone. Never blocks beyond a brief internal lock, so it is safe
    /// to call from the periodic tick sweep.
    pub fn mark_runnable(&self, tid: ThreadId) {
        let mut state = self.state.lock().expect("scheduler state poisoned");
        if state.record(tid).state != ThreadState::Suspended {
            return;
        }

        state.record_mut(tid).state = ThreadState::Ready;
        if state.current.is_none() {
            // Idle system: dispatch directly.
            state.current = Some(tid);
        } else {
            state.ready.push_back(tid);
        }
        trace!("scheduler: tid={tid} marked runnable");
        self.cv.notify_all();
    }

    /// Current scheduling state of a thread
    pub fn thread_state(&self, tid: ThreadId) -> Option<ThreadState> {
        let state = self.state.lock().expect("scheduler state poisoned");
        state.records.get(&tid).map(|r| r.state)
    }

    /// TID of the calling cooperative thread
    pub fn current_id(&self) -> ThreadId {
        current_tid()
    }

    /// Wait cooperatively for a thread to finish
    ///
    /// Repeatedly yields until `tid` reaches `Finished`. Panics if the
    /// target can no longer run (deadlock) or is unknown.
    pub fn join(&self, tid: ThreadId) {
        let me = current_tid();
        loop {
            {
                let state = self.state.lock().expect("scheduler state poisoned");
                assert_eq!(
                    state.current,
                    Some(me),
                    "join: caller is not the running thread"
                );
                match state.record(tid).state {
                    ThreadState::Finished => return,
                    ThreadState::Suspended if state.ready.is_empty() => {
                        panic!("join: thread {tid} is suspended and nothing can wake it")
                    }
                    _ => {}
                }
            }
            self.yield_now();
        }
    }

    /// Terminate the calling thread and dispatch the next one
    fn exit_current(&self) {
        let me = current_tid();
        let mut state = self.state.lock().expect("scheduler state poisoned");
        assert_eq!(
            state.current,
            Some(me),
            "exit: caller is not the running thread"
        );

        state.record_mut(me).state = ThreadState::Finished;
        state.dispatch_next();
        trace!("scheduler: tid={me} finished, dispatched {:?}", state.current);
        self.cv.notify_all();
    }

    /// Block a freshly spawned thread until it is dispatched for the first
    /// time
    fn wait_for_dispatch(&self, tid: ThreadId) {
        let state = self.state.lock().expect("scheduler state poisoned");
        let mut state = self.block_until_dispatched(state, tid);
        state.record_mut(tid).state = ThreadState::Running;
    }

    /// Park the host OS thread until this cooperative thread is current
    fn block_until_dispatched<'a>(
        &'a self,
        mut state: std::sync::MutexGuard<'a, SchedState>,
        tid: ThreadId,
    ) -> std::sync::MutexGuard<'a, SchedState> {
        while state.current != Some(tid) {
            state = self.cv.wait(state).expect("scheduler state poisoned");
        }
        state
    }
}

// ============================================================================
// Tests
// ============================================================================
