// Copyright 2026 The Syncore Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Monitor Lock and Condition Variable
//!
//! This module provides the blocking mutual-exclusion lock and condition
//! variable used by higher-level primitives, with standard monitor
//! semantics: at most one owner, waiting on a condition releases the lock
//! atomically with suspension and reacquires it on wake.
//!
//! # Design
//!
//! - **Ownership tracking**: the lock knows which thread owns it and panics
//!   on release-by-non-owner or recursive acquire
//! - **Direct handoff**: release transfers ownership to the FIFO head
//!   waiter before marking it runnable, so a woken acquirer never races a
//!   barging thread for the lock
//! - **Mesa condition variables**: `signal_one`/`signal_all` only mark
//!   waiters runnable; a woken thread reacquires the lock and must re-check
//!   its predicate in a loop

use std::collections::VecDeque;
use std::sync::Arc;

use log::trace;
use spin::Mutex as SpinMutex;

use crate::sched::Scheduler;
use crate::thread::ThreadId;

/// ============================================================================
/// Lock
/// ============================================================================

/// Magic number for lock validation
const LOCK_MAGIC: u32 = 0x4C4F434B; // "LOCK" in hex

struct LockState {
    /// Current owner, `None` when free
    owner: Option<ThreadId>,

    /// FIFO queue of contending threads
    waiters: VecDeque<ThreadId>,
}

/// Blocking mutual-exclusion lock
pub struct Lock {
    sched: Arc<Scheduler>,
    inner: SpinMutex<LockState>,
    magic: u32,
}

impl Lock {
    /// Create a new, unowned lock
    pub fn new(sched: Arc<Scheduler>) -> Self {
        Self {
            sched,
            inner: SpinMutex::new(LockState {
                owner: None,
                waiters: VecDeque::new(),
            }),
            magic: LOCK_MAGIC,
        }
    }

    /// Acquire the lock, suspending until it is available
    pub fn acquire(&self) {
        self.validate();
        let me = self.sched.current_id();

        let mut state = self.inner.lock();
        match state.owner {
            None => {
                state.owner = Some(me);
                trace!("lock: tid={me} acquired uncontended");
            }
            Some(owner) => {
                assert_ne!(owner, me, "lock: recursive acquire by tid={me}");
                state.waiters.push_back(me);
                trace!("lock: tid={me} contending against tid={owner}");
                // Release ships ownership to us before the wake, so after
                // resuming the lock is already ours.
                self.sched.suspend_current_with(state);
                debug_assert_eq!(self.inner.lock().owner, Some(me));
            }
        }
    }

    /// Release the lock
    ///
    /// Ownership passes directly to the longest-waiting contender, if any.
    /// Panics if the caller does not own the lock.
    pub fn release(&self) {
        self.validate();
        let me = self.sched.current_id();

        let mut state = self.inner.lock();
        assert_eq!(
            state.owner,
            Some(me),
            "lock: released by tid={me}, which does not own it"
        );

        match state.waiters.pop_front() {
            Some(next) => {
                state.owner = Some(next);
                drop(state);
                trace!("lock: tid={me} handed off to tid={next}");
                self.sched.mark_runnable(next);
            }
            None => {
                state.owner = None;
                trace!("lock: tid={me} released, now free");
            }
        }
    }

    /// Whether the calling thread owns the lock
    pub fn held_by_current(&self) -> bool {
        self.inner.lock().owner == Some(self.sched.current_id())
    }

    fn validate(&self) {
        debug_assert_eq!(self.magic, LOCK_MAGIC, "invalid lock magic");
    }
}

/// ============================================================================
/// Condition Variable
/// ============================================================================

/// Condition variable over a [`Lock`]
///
/// All operations require the associated lock to be held by the caller.
pub struct Condvar {
    sched: Arc<Scheduler>,

    /// FIFO queue of waiting threads
    waiters: SpinMutex<VecDeque<ThreadId>>,
}

impl Condvar {
    pub fn new(sched: Arc<Scheduler>) -> Self {
        Self {
            sched,
            waiters: SpinMutex::new(VecDeque::new()),
        }
    }

    /// Release `lock`, suspend until signaled, then reacquire `lock`
    ///
    /// The release and suspension are atomic with respect to signalers: a
    /// signal issued after the lock is released always finds this thread in
    /// the wait set.
    pub fn wait(&self, lock: &Lock) {
        let me = self.sched.current_id();
        assert!(
            lock.held_by_current(),
            "condvar: wait by tid={me} without holding the lock"
        );

        let mut queue = self.waiters.lock();
        queue.push_back(me);
        lock.release();
        trace!("condvar: tid={me} waiting");
        self.sched.suspend_current_with(queue);

        lock.acquire();
    }

    /// Wake the longest-waiting thread, if any
    pub fn signal_one(&self, lock: &Lock) {
        assert!(
            lock.held_by_current(),
            "condvar: signal without holding the lock"
        );

        let woken = self.waiters.lock().pop_front();
        if let Some(tid) = woken {
            trace!("condvar: signaled tid={tid}");
            self.sched.mark_runnable(tid);
        }
    }

    /// Wake every waiting thread
    pub fn signal_all(&self, lock: &Lock) {
        assert!(
            lock.held_by_current(),
            "condvar: signal without holding the lock"
        );

        let woken: VecDeque<ThreadId> = std::mem::take(&mut *self.waiters.lock());
        for tid in woken {
            trace!("condvar: broadcast woke tid={tid}");
            self.sched.mark_runnable(tid);
        }
    }

    /// Number of threads currently waiting
    pub fn waiter_count(&self) -> usize {
        self.waiters.lock().len()
    }
}

// ============================================================================
// Tests
// ============================================================================
