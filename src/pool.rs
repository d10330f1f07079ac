// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// The fixed pool of message slots and the index-linked lists over it.
//
// The pool is an arena: slots never move, links are slot indices, NIL marks
// the end of a list. The free list and every endpoint receive list share
// the same SlotList shape, so a buffer moves between lists by index alone.
// Nothing here allocates; the pool is statically partitioned across the
// free list, the endpoint lists, and caller-held slots at all times.
//
// Every mutation runs with the region gate held.

use std::cell::UnsafeCell;
use std::ptr;

use crate::coherent::{flush, invalidate, Coherent};
use crate::config::{BUFFER_COUNT, BUFFER_SIZE};
use crate::endpoint::Endpoint;

/// End-of-list marker.
pub const NIL: u32 = u32::MAX;

/// One fixed-size message buffer in the shared pool.
#[repr(C)]
pub struct MsgSlot {
    next: Coherent<u32>,
    source: Coherent<Endpoint>,
    data_len: Coherent<u32>,
    payload: UnsafeCell<[u8; BUFFER_SIZE]>,
}

// The payload is only touched by whoever owns the slot: the sender between
// dequeue and queue, the receiver between dequeue and free.
unsafe impl Send for MsgSlot {}
unsafe impl Sync for MsgSlot {}

impl MsgSlot {
    pub fn source(&self) -> Endpoint {
        self.source.load()
    }

    pub fn set_source(&self, ep: Endpoint) {
        self.source.store(ep);
    }

    /// Stored message length, clamped to the slot capacity.
    pub fn data_len(&self) -> usize {
        (self.data_len.load() as usize).min(BUFFER_SIZE)
    }

    pub fn set_data_len(&self, len: usize) {
        self.data_len.store(len as u32);
    }

    /// Copy `src` into the payload, record its length, and publish both.
    pub fn write_payload(&self, src: &[u8]) {
        debug_assert!(src.len() <= BUFFER_SIZE);
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), self.payload.get() as *mut u8, src.len());
        }
        flush(self.payload.get() as *const u8, src.len());
        self.set_data_len(src.len());
    }

    /// Copy the payload out, truncated to the destination capacity.
    /// Returns the number of bytes copied.
    pub fn read_payload(&self, dst: &mut [u8]) -> usize {
        let len = self.data_len().min(dst.len());
        invalidate(self.payload.get() as *const u8, len);
        unsafe {
            ptr::copy_nonoverlapping(self.payload.get() as *const u8, dst.as_mut_ptr(), len);
        }
        len
    }

    /// Invalidate the first `len` payload bytes ahead of in-place reads.
    pub fn invalidate_payload(&self, len: usize) {
        invalidate(self.payload.get() as *const u8, len.min(BUFFER_SIZE));
    }

    /// Publish the first `len` payload bytes written in place.
    pub fn flush_payload(&self, len: usize) {
        flush(self.payload.get() as *const u8, len.min(BUFFER_SIZE));
    }

    /// Raw payload base. Callers must own the slot exclusively.
    pub(crate) fn payload_ptr(&self) -> *mut u8 {
        self.payload.get() as *mut u8
    }
}

/// FIFO of slot indices: the free list and each endpoint's receive queue.
#[repr(C)]
pub struct SlotList {
    head: Coherent<u32>,
    tail: Coherent<u32>,
}

impl SlotList {
    /// Reset to empty. Part of one-time region initialization.
    pub fn reset(&self) {
        self.head.store(NIL);
        self.tail.store(NIL);
    }

    pub fn is_empty(&self) -> bool {
        self.head.load() == NIL
    }

    /// Append `idx` at the tail. The new slot's link is always cleared.
    pub fn push(&self, slots: &[MsgSlot], idx: u32) {
        slots[idx as usize].next.store(NIL);
        let tail = self.tail.load();
        if tail == NIL {
            self.head.store(idx);
        } else {
            slots[tail as usize].next.store(idx);
        }
        self.tail.store(idx);
    }

    /// Pop the head, or `None` when empty. Popping the last slot clears the
    /// tail as well.
    pub fn pop(&self, slots: &[MsgSlot]) -> Option<u32> {
        let head = self.head.load();
        if head == NIL {
            return None;
        }
        let next = slots[head as usize].next.load();
        self.head.store(next);
        if next == NIL {
            self.tail.store(NIL);
        }
        Some(head)
    }

    /// Read-only walk counting the queued slots.
    ///
    /// The walk is bounded by the pool size so a corrupted region yields a
    /// wrong count rather than a hang.
    pub fn len(&self, slots: &[MsgSlot]) -> usize {
        let mut n = 0;
        let mut cur = self.head.load();
        while cur != NIL && n < BUFFER_COUNT {
            n += 1;
            cur = slots[cur as usize].next.load();
        }
        n
    }

    /// Move every queued slot onto `dst`, preserving order.
    /// Returns the number of slots moved.
    pub fn drain_into(&self, slots: &[MsgSlot], dst: &SlotList) -> usize {
        let mut n = 0;
        while let Some(idx) = self.pop(slots) {
            dst.push(slots, idx);
            n += 1;
        }
        n
    }
}
