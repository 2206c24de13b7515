// Copyright 2026 The Syncore Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Rendezvous Channel
//!
//! This module provides a single-slot synchronous channel that pairs
//! speaking and listening threads one-to-one: a word handed to
//! [`Rendezvous::speak`] is received by exactly one [`Rendezvous::listen`]
//! call, and the speaker does not return until its word has been consumed.
//!
//! # Design
//!
//! - **Single slot**: at most one unconsumed word exists at any instant;
//!   additional speakers queue on the speaker condition until the slot
//!   frees
//! - **Full handshake**: after publishing, a speaker waits until the
//!   channel's exchange generation moves past the one it published under,
//!   which happens exactly when some listener consumes its word
//! - **Signal one listener, wake all speakers**: consuming a word must give
//!   both classes of blocked speaker (the handshake owner and the
//!   slot-waiters) a chance to re-check their predicates, so the listener
//!   broadcasts; publishing concerns exactly one listener, so the speaker
//!   signals one
//! - **Instance state**: slot, flag, lock, and both condition variables are
//!   fields of the channel; independent channels never interfere
//!
//! Both blocking waits are predicate re-check loops, so the primitive is
//! correct under any condition-variable wake order.

use std::sync::Arc;

use log::{debug, trace};
use spin::Mutex as SpinMutex;

use crate::sched::Scheduler;
use crate::sync::lock::{Condvar, Lock};

/// ============================================================================
/// Channel Slot
/// ============================================================================

/// The single word slot, touched only with the monitor lock held
struct Slot {
    /// Most recently published, unconsumed word (valid when `pending`)
    word: u32,

    /// Whether an unconsumed word is present
    pending: bool,

    /// Completed exchange count; a speaker's handshake predicate
    exchanges: u64,
}

/// ============================================================================
/// Rendezvous Channel
/// ============================================================================

/// Single-slot synchronous rendezvous channel
pub struct Rendezvous {
    lock: Lock,
    speakers: Condvar,
    listeners: Condvar,
    slot: SpinMutex<Slot>,
}

impl Rendezvous {
    /// Create a new channel on the given scheduler
    pub fn new(sched: Arc<Scheduler>) -> Self {
        Self {
            lock: Lock::new(Arc::clone(&sched)),
            speakers: Condvar::new(Arc::clone(&sched)),
            listeners: Condvar::new(Arc::clone(&sched)),
            slot: SpinMutex::new(Slot {
                word: 0,
                pending: false,
                exchanges: 0,
            }),
        }
    }

    /// Hand `word` to exactly one listener, returning once it is consumed
    ///
    /// Blocks while another speaker's word is still pending, then publishes
    /// and blocks again until a listener has captured this word.
    pub fn speak(&self, word: u32) {
        self.lock.acquire();

        while self.slot.lock().pending {
            self.speakers.wait(&self.lock);
        }

        let generation = {
            let mut slot = self.slot.lock();
            slot.word = word;
            slot.pending = true;
            slot.exchanges
        };
        debug!("rendezvous: published word={word} generation={generation}");
        self.listeners.signal_one(&self.lock);

        // Handshake: wait until some listener bumps the generation by
        // consuming this word. A broadcast also wakes speakers that are
        // still queued for the slot; their outer loop re-checks `pending`.
        while self.slot.lock().exchanges == generation {
            self.speakers.wait(&self.lock);
        }
        trace!("rendezvous: word={word} consumed");

        self.lock.release();
    }

    /// Receive the word from exactly one speaker
    ///
    /// Blocks until a word is pending, consumes it, and completes the
    /// publishing speaker's handshake.
    pub fn listen(&self) -> u32 {
        self.lock.acquire();

        while !self.slot.lock().pending {
            self.listeners.wait(&self.lock);
        }

        let word = {
            let mut slot = self.slot.lock();
            slot.pending = false;
            slot.exchanges += 1;
            slot.word
        };
        debug!("rendezvous: consumed word={word}");

        // Wake every blocked speaker: the handshake owner returns, the
        // slot-waiters race for the now-free slot.
        self.speakers.signal_all(&self.lock);

        self.lock.release();
        word
    }
}

// ============================================================================
// Tests
// ============================================================================
