// Copyright 2026 The Syncore Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Tick Source
//!
//! This module provides the abstract time base for the crate: a monotonic
//! tick counter and a periodic timer that advances it and invokes a
//! registered handler. Ticks are abstract units; nothing here touches wall
//! clock time.
//!
//! # Design
//!
//! - **Monotonic**: the counter only moves forward
//! - **Externally driven**: whoever owns the `PeriodicTimer` decides when a
//!   period elapses by calling `fire`, which keeps multi-thread scenarios
//!   fully deterministic
//! - **Interrupt-like delivery**: `fire` must be called from a running
//!   cooperative thread, so the handler interleaves with other threads only
//!   at scheduler suspension points

use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::trace;

use spin::Mutex as SpinMutex;

/// ============================================================================
/// Clock
/// ============================================================================

/// Monotonic tick counter
pub struct Clock {
    ticks: AtomicU64,
}

impl Clock {
    /// Create a clock at tick zero
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
        }
    }

    /// Current tick value
    pub fn now(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Advance the clock by `ticks`, returning the new value
    pub fn advance(&self, ticks: u64) -> u64 {
        let now = self.ticks.fetch_add(ticks, Ordering::AcqRel) + ticks;
        trace!("clock: advanced to {now}");
        now
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// ============================================================================
/// Periodic Timer
/// ============================================================================

/// Handler invoked once per timer period
pub trait TickHandler: Send + Sync {
    fn on_tick(&self);
}

/// Periodic timer
///
/// Binds a [`Clock`] to a [`TickHandler`]. Each call to [`PeriodicTimer::fire`]
/// models one timer interrupt: the clock advances by one interval and the
/// handler runs in the caller's context.
pub struct PeriodicTimer {
    clock: Arc<Clock>,

    /// Ticks per period
    interval: u64,

    /// Registered tick handler, if any
    handler: SpinMutex<Option<Arc<dyn TickHandler>>>,
}

impl PeriodicTimer {
    /// Create a timer over `clock` firing every `interval` ticks
    ///
    /// `interval` must be non-zero.
    pub fn new(clock: Arc<Clock>, interval: u64) -> Self {
        assert!(interval > 0, "timer: interval must be non-zero");
        Self {
            clock,
            interval,
            handler: SpinMutex::new(None),
        }
    }

    /// Register the handler to invoke on each period
    pub fn set_handler(&self, handler: Arc<dyn TickHandler>) {
        *self.handler.lock() = Some(handler);
    }

    /// Ticks per period
    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Deliver one timer period
    ///
    /// Advances the clock by the interval, then invokes the handler (if one
    /// is registered) in the calling thread's context.
    pub fn fire(&self) {
        let now = self.clock.advance(self.interval);
        trace!("timer: fired at tick {now}");

        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler.on_tick();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::AtomicUsize;

    struct CountingHandler {
        fired: AtomicUsize,
    }

    impl TickHandler for CountingHandler {
        fn on_tick(&self) {
            self.fired.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn clock_starts_at_zero_and_advances() {
        let clock = Clock::new();
        assert_eq!(clock.now(), 0);
        assert_eq!(clock.advance(50), 50);
        assert_eq!(clock.advance(10), 60);
        assert_eq!(clock.now(), 60);
    }

    #[test]
    fn fire_advances_one_interval_and_invokes_handler() {
        let clock = Arc::new(Clock::new());
        let timer = PeriodicTimer::new(Arc::clone(&clock), 500);
        let handler = Arc::new(CountingHandler {
            fired: AtomicUsize::new(0),
        });
        timer.set_handler(handler.clone());

        timer.fire();
        timer.fire();
        assert_eq!(clock.now(), 1000);
        assert_eq!(handler.fired.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn fire_without_handler_is_a_no_op_besides_time() {
        let clock = Arc::new(Clock::new());
        let timer = PeriodicTimer::new(Arc::clone(&clock), 100);
        timer.fire();
        assert_eq!(clock.now(), 100);
    }

    #[test]
    #[should_panic(expected = "interval must be non-zero")]
    fn zero_interval_is_rejected() {
        let _ = PeriodicTimer::new(Arc::new(Clock::new()), 0);
    }
}
