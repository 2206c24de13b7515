// Copyright 2026 The Syncore Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Synchronization Primitives
//!
//! This module provides the synchronization primitives built on the
//! cooperative scheduler.
//!
//! # Primitives
//!
//! - **Alarm**: deadline-ordered sleep/wake service driven by the periodic
//!   tick sweep
//! - **Lock / Condvar**: blocking mutual-exclusion lock and condition
//!   variable with monitor semantics
//! - **Rendezvous**: single-slot synchronous channel pairing speakers and
//!   listeners one-to-one
//!
//! # Design
//!
//! The alarm's wait queue is guarded by a spinlock because the tick sweep
//! runs in an interrupt-like context that must not block; everything else
//! uses the blocking lock plus condition variables.

pub mod alarm;
pub mod lock;
pub mod rendezvous;

// Re-exports
pub use alarm::Alarm;
pub use lock::{Condvar, Lock};
pub use rendezvous::Rendezvous;
