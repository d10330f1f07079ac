// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Per-core circular signal queues.
//
// A signal is the lightweight record a sender leaves for the destination
// core before ringing its doorbell. Each core owns one fixed-depth circular
// queue; senders advance its tail, the owning core's service thread advances
// its head, and both run under the region gate. One slot is sacrificed so
// that full and empty are distinguishable from the indices alone.

use crate::coherent::Coherent;
use crate::config::SIGNAL_QUEUE_SLOTS;
use crate::endpoint::Endpoint;
use crate::error::Error;

/// Why a core was notified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// A buffer was queued on one of the destination core's endpoints.
    BufferQueued,
    /// A pool buffer was returned to the free list.
    BufferFreed,
}

const KIND_QUEUED: u32 = 0;
const KIND_FREED: u32 = 1;

/// One cross-core notification record, as stored in the shared region.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct Signal {
    kind: u32,
    target: Endpoint,
}

impl Signal {
    pub fn queued(target: Endpoint) -> Self {
        Self {
            kind: KIND_QUEUED,
            target,
        }
    }

    pub fn freed(target: Endpoint) -> Self {
        Self {
            kind: KIND_FREED,
            target,
        }
    }

    /// Decoded kind, or `None` for a value no build ever wrote.
    pub fn kind(&self) -> Option<SignalKind> {
        match self.kind {
            KIND_QUEUED => Some(SignalKind::BufferQueued),
            KIND_FREED => Some(SignalKind::BufferFreed),
            _ => None,
        }
    }

    pub fn target(&self) -> Endpoint {
        self.target
    }
}

/// Fixed circular queue of signals destined for one core.
#[repr(C)]
pub struct SignalQueue {
    head: Coherent<u32>,
    tail: Coherent<u32>,
    slots: [Coherent<Signal>; SIGNAL_QUEUE_SLOTS],
}

impl SignalQueue {
    /// Reset to empty. Part of one-time region initialization.
    pub fn reset(&self) {
        self.head.store(0);
        self.tail.store(0);
    }

    pub fn is_empty(&self) -> bool {
        self.head.load() == self.tail.load()
    }

    pub fn is_full(&self) -> bool {
        Self::advance(self.tail.load()) == self.head.load()
    }

    /// Append a signal at the tail.
    ///
    /// On a full queue the caller must undo whatever buffer movement the
    /// signal was announcing; delivery is all-or-nothing.
    pub fn post(&self, sig: Signal) -> Result<(), Error> {
        let tail = self.tail.load();
        let next = Self::advance(tail);
        if next == self.head.load() {
            return Err(Error::SignalQueueFull);
        }
        self.slots[tail as usize].store(sig);
        self.tail.store(next);
        Ok(())
    }

    /// Pop the head, or `None` when empty.
    pub fn take(&self) -> Option<Signal> {
        let head = self.head.load();
        if head == self.tail.load() {
            return None;
        }
        let sig = self.slots[head as usize].load();
        self.head.store(Self::advance(head));
        Some(sig)
    }

    fn advance(idx: u32) -> u32 {
        (idx + 1) % SIGNAL_QUEUE_SLOTS as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    fn fresh() -> SignalQueue {
        let q: SignalQueue = unsafe { mem::zeroed() };
        q.reset();
        q
    }

    fn ep(port: u32) -> Endpoint {
        Endpoint::new(1, 0, port)
    }

    #[test]
    fn fifo_order() {
        let q = fresh();
        q.post(Signal::queued(ep(1))).unwrap();
        q.post(Signal::freed(ep(2))).unwrap();

        let first = q.take().unwrap();
        assert_eq!(first.kind(), Some(SignalKind::BufferQueued));
        assert_eq!(first.target(), ep(1));

        let second = q.take().unwrap();
        assert_eq!(second.kind(), Some(SignalKind::BufferFreed));
        assert!(q.take().is_none());
    }

    #[test]
    fn one_slot_is_sacrificed() {
        let q = fresh();
        for i in 0..SIGNAL_QUEUE_SLOTS as u32 - 1 {
            q.post(Signal::queued(ep(i + 1))).unwrap();
        }
        assert!(q.is_full());
        assert!(matches!(
            q.post(Signal::queued(ep(99))),
            Err(Error::SignalQueueFull)
        ));

        // Draining one makes room for exactly one.
        q.take().unwrap();
        q.post(Signal::queued(ep(100))).unwrap();
        assert!(q.is_full());
    }

    #[test]
    fn wraps_around() {
        let q = fresh();
        for round in 0..3 {
            for i in 0..SIGNAL_QUEUE_SLOTS as u32 - 1 {
                q.post(Signal::queued(ep(round * 100 + i + 1))).unwrap();
            }
            for i in 0..SIGNAL_QUEUE_SLOTS as u32 - 1 {
                assert_eq!(q.take().unwrap().target(), ep(round * 100 + i + 1));
            }
            assert!(q.is_empty());
        }
    }
}
