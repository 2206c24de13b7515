// Copyright 2026 The Syncore Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Thread Bookkeeping
//!
//! This module provides thread identity and state tracking for the
//! cooperative scheduler. Every cooperative thread has a unique thread ID
//! (TID) and a record holding its name and scheduling state.
//!
//! # Thread States
//!
//! ```text
//! Ready -> Running -> Suspended -> Ready -> Running -> Finished
//! ```
//!
//! A thread moves `Running -> Suspended` only by suspending itself, and
//! `Suspended -> Ready` only when something marks it runnable. `Finished`
//! is terminal.

use core::cell::Cell;
use core::sync::atomic::{AtomicU64, Ordering};

/// ============================================================================
/// Thread ID
/// ============================================================================

/// Thread ID type
pub type ThreadId = u64;

/// Invalid thread ID
pub const TID_INVALID: ThreadId = 0;

/// Thread ID allocator
///
/// Hands out unique TIDs starting from 1. Each scheduler instance owns one,
/// so TIDs are unique per scheduler, not per process.
pub(crate) struct TidAllocator {
    next: AtomicU64,
}

impl TidAllocator {
    pub(crate) const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next thread ID
    pub(crate) fn alloc(&self) -> ThreadId {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// ============================================================================
/// Thread State
/// ============================================================================

/// Scheduling state of a cooperative thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    /// On the ready queue (or dispatched but not yet resumed)
    Ready,

    /// The single currently executing thread
    Running,

    /// Off the ready queue, waiting to be marked runnable
    Suspended,

    /// Exited; terminal state
    Finished,
}

/// Per-thread record kept by the scheduler
#[derive(Debug)]
pub(crate) struct ThreadRecord {
    /// Thread name (for diagnostics)
    pub(crate) name: String,

    /// Current scheduling state
    pub(crate) state: ThreadState,
}

impl ThreadRecord {
    pub(crate) fn new(name: &str, state: ThreadState) -> Self {
        Self {
            name: name.to_string(),
            state,
        }
    }
}

/// ============================================================================
/// Current Thread
/// ============================================================================

std::thread_local! {
    /// TID of the cooperative thread hosted on this OS thread
    static CURRENT_TID: Cell<ThreadId> = const { Cell::new(TID_INVALID) };
}

/// Get the TID of the calling cooperative thread
///
/// Returns [`TID_INVALID`] if the calling OS thread is not hosting a
/// cooperative thread.
pub fn current_tid() -> ThreadId {
    CURRENT_TID.with(|t| t.get())
}

/// Bind the calling OS thread to a cooperative TID
pub(crate) fn set_current_tid(tid: ThreadId) {
    CURRENT_TID.with(|t| t.set(tid));
}

// ============================================================================
// Tests
// ============================================================================
