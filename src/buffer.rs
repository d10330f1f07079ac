// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Zero-copy buffer handles.
//
// A handle owns one pool slot. While it is alive no other participant may
// touch the slot's payload, so the payload can be exposed as a plain slice.
// Dropping a handle that was never sent or freed hands the slot back to the
// pool instead of leaking it.

use std::fmt;
use std::sync::Arc;

use crate::config::BUFFER_SIZE;
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::region::RegionInner;

/// A pool slot claimed for sending.
///
/// Fill the payload, then pass the handle to `Region::send_nocopy`. Dropping
/// it unsent returns the slot to the free pool.
pub struct TxBuffer {
    inner: Arc<RegionInner>,
    idx: u32,
    len: usize,
    armed: bool,
}

impl TxBuffer {
    pub(crate) fn claim(inner: Arc<RegionInner>, idx: u32, len: usize) -> Self {
        Self {
            inner,
            idx,
            len,
            armed: true,
        }
    }

    /// Bytes the slot can carry.
    pub fn capacity(&self) -> usize {
        BUFFER_SIZE
    }

    /// Payload length set so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The whole payload window, writable. Fill it, then record the message
    /// length with [`Self::set_len`].
    pub fn payload_mut(&mut self) -> &mut [u8] {
        let ptr = self.inner.shared().slot(self.idx).payload_ptr();
        // The slot is exclusively ours while the handle is armed.
        unsafe { std::slice::from_raw_parts_mut(ptr, BUFFER_SIZE) }
    }

    /// Record how many payload bytes are meaningful.
    pub fn set_len(&mut self, len: usize) -> Result<()> {
        if len > BUFFER_SIZE {
            return Err(Error::InvalidArgument("length exceeds buffer capacity"));
        }
        self.len = len;
        Ok(())
    }

    /// Copy `data` into the payload and set the length in one step.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > BUFFER_SIZE {
            return Err(Error::InvalidArgument(
                "message longer than buffer capacity",
            ));
        }
        self.payload_mut()[..data.len()].copy_from_slice(data);
        self.len = data.len();
        Ok(())
    }

    /// Disarm the handle and surrender the slot to the caller.
    pub(crate) fn take_slot(mut self) -> (Arc<RegionInner>, u32, usize) {
        self.armed = false;
        (Arc::clone(&self.inner), self.idx, self.len)
    }
}

impl Drop for TxBuffer {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.inner.release_slot(self.idx);
        }
    }
}

impl fmt::Debug for TxBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxBuffer")
            .field("idx", &self.idx)
            .field("len", &self.len)
            .finish()
    }
}

/// A received message still living in its pool slot.
///
/// Read the payload in place, then return the slot with [`Self::free`].
/// Dropping the handle frees the slot as well, ignoring any failure to
/// signal the other cores.
pub struct RxBuffer {
    inner: Arc<RegionInner>,
    idx: u32,
    source: Endpoint,
    len: usize,
    armed: bool,
}

impl RxBuffer {
    pub(crate) fn claim(inner: Arc<RegionInner>, idx: u32, source: Endpoint, len: usize) -> Self {
        Self {
            inner,
            idx,
            source,
            len,
            armed: true,
        }
    }

    /// Who sent the message.
    pub fn source(&self) -> Endpoint {
        self.source
    }

    /// Meaningful payload bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The message, in place.
    pub fn payload(&self) -> &[u8] {
        let ptr = self.inner.shared().slot(self.idx).payload_ptr();
        unsafe { std::slice::from_raw_parts(ptr as *const u8, self.len) }
    }

    /// Return the slot to the free pool, waking any sender starved for one.
    pub fn free(mut self) -> Result<()> {
        self.armed = false;
        self.inner.release_slot(self.idx)
    }
}

impl Drop for RxBuffer {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.inner.release_slot(self.idx);
        }
    }
}

impl fmt::Debug for RxBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RxBuffer")
            .field("idx", &self.idx)
            .field("source", &self.source)
            .field("len", &self.len)
            .finish()
    }
}
