// Copyright 2026 The Syncore Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Syncore — cooperative kernel-thread scheduling core
//!
//! This crate implements two low-level synchronization primitives for a
//! cooperative, non-preemptive thread scheduler, plus the minimal scheduler
//! and tick machinery they run on:
//!
//! - [`sync::Alarm`]: a deadline-ordered sleep/wake service. A thread
//!   suspends itself for a minimum number of abstract ticks and is resumed
//!   by the periodic tick sweep.
//! - [`sync::Rendezvous`]: a single-slot synchronous channel. A word handed
//!   off by a speaker is received by exactly one listener before either
//!   side proceeds.
//!
//! Cooperative threads are hosted on OS threads, but at most one runs at a
//! time and control transfers only at explicit suspension points, so the
//! interleaving model matches a single-CPU kernel: the tick callback is
//! interrupt-like, and structures it touches are guarded by spinlocks
//! rather than blocking locks.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use syncore::{Alarm, Clock, Scheduler};
//!
//! let sched = Scheduler::new(); // caller becomes thread "main"
//! let clock = Arc::new(Clock::new());
//! let alarm = Arc::new(Alarm::new(Arc::clone(&sched), Arc::clone(&clock)));
//!
//! let sleeper = Arc::clone(&alarm);
//! let tid = sched.spawn("sleeper", move || sleeper.wait_until(100));
//! sched.yield_now();
//!
//! clock.advance(100);
//! alarm.on_tick(); // the sweep marks the sleeper runnable
//! sched.join(tid);
//! ```
//!
//! Misuse (releasing a lock one does not own, suspending the last runnable
//! thread) is a programming contract violation and panics; there are no
//! recoverable runtime errors. Diagnostics go through the `log` facade.

pub mod sched;
pub mod sync;
pub mod thread;
pub mod timer;

// Re-exports of the primary surface
pub use sched::Scheduler;
pub use sync::{Alarm, Condvar, Lock, Rendezvous};
pub use thread::{ThreadId, ThreadState};
pub use timer::{Clock, PeriodicTimer, TickHandler};
