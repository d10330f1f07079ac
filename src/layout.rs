// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// The root shared structure.
//
// Every participant maps this #[repr(C)] image at its own address, so the
// layout is an ABI: no padding anywhere, fixed field order, index links
// instead of pointers. The static asserts below pin the no-padding property
// against the geometry constants.

use std::mem;
use std::ptr;

use crate::coherent::Coherent;
use crate::config::{
    BUFFER_COUNT, BUFFER_SIZE, CORE_COUNT, ENDPOINT_MAX, INIT_SENTINEL, SIGNAL_QUEUE_SLOTS,
    VERSION_MAJOR_LEN, VERSION_STRING,
};
use crate::pool::{MsgSlot, SlotList};
use crate::registry::EndpointTable;
use crate::signal::SignalQueue;

/// The canonical shared-memory structure visible to every core.
///
/// Owns all messaging state: the init/version sentinels, the free list, one
/// signal queue per core, the endpoint table, and the backing slot array.
#[repr(C)]
pub struct SharedRegion {
    init_sentinel: Coherent<[u8; 8]>,
    version: Coherent<[u8; 8]>,
    free_list: SlotList,
    signal_queues: [SignalQueue; CORE_COUNT],
    endpoints: EndpointTable,
    slots: [MsgSlot; BUFFER_COUNT],
}

// ---------------------------------------------------------------------------
// ABI pins: any padding or field growth breaks byte-identity between
// participants and must show up as a compile failure, not a runtime mystery.
// ---------------------------------------------------------------------------

const SIGNAL_BYTES: usize = 16;
const QUEUE_BYTES: usize = 8 + SIGNAL_BYTES * SIGNAL_QUEUE_SLOTS;
const SLOT_BYTES: usize = 20 + BUFFER_SIZE;
const ENDPOINT_ROW_BYTES: usize = 20;

const _: () = assert!(mem::size_of::<crate::signal::Signal>() == SIGNAL_BYTES);
const _: () = assert!(mem::size_of::<SignalQueue>() == QUEUE_BYTES);
const _: () = assert!(mem::size_of::<MsgSlot>() == SLOT_BYTES);
const _: () = assert!(
    mem::size_of::<SharedRegion>()
        == 16 + 8
            + CORE_COUNT * QUEUE_BYTES
            + ENDPOINT_MAX * ENDPOINT_ROW_BYTES
            + BUFFER_COUNT * SLOT_BYTES
);
const _: () = assert!(mem::align_of::<SharedRegion>() == 4);

impl SharedRegion {
    /// Bytes a mapping must provide.
    pub const BYTES: usize = mem::size_of::<SharedRegion>();

    /// Cast a mapped segment.
    ///
    /// # Safety
    /// `base` must point to a live mapping of at least [`Self::BYTES`]
    /// bytes, 4-byte aligned, that outlives the returned reference.
    pub unsafe fn from_ptr<'a>(base: *const u8) -> &'a SharedRegion {
        &*(base as *const SharedRegion)
    }

    /// Whether some participant already ran the one-time initialization.
    pub fn is_initialized(&self) -> bool {
        self.init_sentinel.load() == INIT_SENTINEL
    }

    /// Region version as written by the initializing participant.
    pub fn version(&self) -> [u8; 8] {
        self.version.load()
    }

    /// Whether this build can join the region: the version major prefix
    /// must match; minor and patch differences are tolerated.
    pub fn version_compatible(&self) -> bool {
        self.version.load()[..VERSION_MAJOR_LEN] == VERSION_STRING[..VERSION_MAJOR_LEN]
    }

    /// One-time initialization, run under the gate by whichever participant
    /// attaches first: wipe the image, thread every slot onto the free
    /// list, empty the queues and the table, then publish the sentinels.
    pub fn init(&self) {
        // A fresh mapping is zero-filled, but the window may hold a stale
        // image from a previous run; wipe it before rebuilding.
        unsafe {
            ptr::write_bytes(self as *const SharedRegion as *mut u8, 0, Self::BYTES);
        }

        self.free_list.reset();
        for idx in 0..BUFFER_COUNT as u32 {
            self.free_list.push(&self.slots, idx);
        }
        for queue in &self.signal_queues {
            queue.reset();
        }
        self.endpoints.reset();

        self.version.store(VERSION_STRING);
        self.init_sentinel.store(INIT_SENTINEL);
    }

    pub fn free_list(&self) -> &SlotList {
        &self.free_list
    }

    pub fn slots(&self) -> &[MsgSlot] {
        &self.slots
    }

    pub fn slot(&self, idx: u32) -> &MsgSlot {
        &self.slots[idx as usize]
    }

    /// The signal queue owned by `core`.
    pub fn queue(&self, core: usize) -> &SignalQueue {
        &self.signal_queues[core]
    }

    pub fn endpoints(&self) -> &EndpointTable {
        &self.endpoints
    }

    /// `|free| + Σ|endpoint lists|` — the number of slots not currently
    /// held by a caller. Read-only; used by `info` and the tests.
    pub fn pooled_count(&self) -> usize {
        let mut n = self.free_list.len(&self.slots);
        for row in self.endpoints.iter() {
            if !row.is_free() {
                n += row.list().len(&self.slots);
            }
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::Endpoint;

    fn fresh() -> Box<SharedRegion> {
        let region: Box<SharedRegion> = unsafe { Box::new(mem::zeroed()) };
        region.init();
        region
    }

    #[test]
    fn init_publishes_sentinels() {
        let region: Box<SharedRegion> = unsafe { Box::new(mem::zeroed()) };
        assert!(!region.is_initialized());
        region.init();
        assert!(region.is_initialized());
        assert!(region.version_compatible());
        assert_eq!(region.version(), VERSION_STRING);
    }

    #[test]
    fn init_fills_the_free_list() {
        let region = fresh();
        assert_eq!(region.free_list().len(region.slots()), BUFFER_COUNT);
        assert_eq!(region.pooled_count(), BUFFER_COUNT);
    }

    #[test]
    fn conservation_across_list_moves() {
        let region = fresh();
        let ep = Endpoint::new(0, 0, 5);
        let row = region.endpoints().register(ep).unwrap();

        let idx = region.free_list().pop(region.slots()).unwrap();
        row.list().push(region.slots(), idx);
        assert_eq!(region.pooled_count(), BUFFER_COUNT);

        let back = row.list().pop(region.slots()).unwrap();
        assert_eq!(back, idx);
        region.free_list().push(region.slots(), back);
        assert_eq!(region.free_list().len(region.slots()), BUFFER_COUNT);
    }

    #[test]
    fn reinit_resets_a_dirtied_region() {
        let region = fresh();
        region.endpoints().register(Endpoint::new(0, 0, 9)).unwrap();
        region.free_list().pop(region.slots()).unwrap();

        region.init();
        assert_eq!(region.pooled_count(), BUFFER_COUNT);
        assert!(region.endpoints().find(Endpoint::new(0, 0, 9)).is_none());
    }
}
