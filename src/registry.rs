// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// The endpoint table: a fixed array mapping (core, node, port) triplets to
// receive lists. A reserved port marks a free row. Registration is a linear
// scan — the table is small and every access already holds the region gate.

use crate::coherent::Coherent;
use crate::config::{ENDPOINT_MAX, RESERVED_PORT};
use crate::endpoint::Endpoint;
use crate::error::Error;
use crate::pool::SlotList;

/// One endpoint-table row: the triplet plus its receive list.
#[repr(C)]
pub struct EndpointSlot {
    endpoint: Coherent<Endpoint>,
    list: SlotList,
}

impl EndpointSlot {
    pub fn endpoint(&self) -> Endpoint {
        self.endpoint.load()
    }

    pub fn list(&self) -> &SlotList {
        &self.list
    }

    pub fn is_free(&self) -> bool {
        self.endpoint.load().port == RESERVED_PORT
    }

    /// Mark the row free. The receive list must already be drained.
    pub fn clear(&self) {
        self.endpoint.store(Endpoint::new(0, 0, RESERVED_PORT));
    }
}

/// The fixed endpoint table inside the shared region.
#[repr(C)]
pub struct EndpointTable {
    slots: [EndpointSlot; ENDPOINT_MAX],
}

impl EndpointTable {
    /// Mark every row free. Part of one-time region initialization.
    pub fn reset(&self) {
        for slot in &self.slots {
            slot.clear();
            slot.list.reset();
        }
    }

    /// Register a triplet in the first free row.
    pub fn register(&self, ep: Endpoint) -> Result<&EndpointSlot, Error> {
        if !ep.is_valid() {
            return Err(Error::InvalidArgument("reserved port or bad core"));
        }
        if self.find(ep).is_some() {
            return Err(Error::EndpointAlreadyExists);
        }
        for slot in &self.slots {
            if slot.is_free() {
                slot.list.reset();
                slot.endpoint.store(ep);
                return Ok(slot);
            }
        }
        Err(Error::NoMemory)
    }

    /// Linear scan for a registered triplet.
    pub fn find(&self, ep: Endpoint) -> Option<&EndpointSlot> {
        self.slots
            .iter()
            .find(|slot| !slot.is_free() && slot.endpoint.load() == ep)
    }

    /// All rows, free and occupied. Callers filter with `is_free`.
    pub fn iter(&self) -> impl Iterator<Item = &EndpointSlot> {
        self.slots.iter()
    }
}
