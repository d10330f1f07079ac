// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Cross-platform shared memory segment.
// Delegates to platform::PlatformShm (POSIX or Windows).

use std::io;

use crate::platform::PlatformShm;

pub use crate::platform::ShmOpenMode;

/// A named shared memory segment mapped into this process.
///
/// The mapping carries a trailing cross-process reference counter past the
/// user-visible bytes; the last handle to drop removes the backing object.
pub struct ShmSegment {
    inner: PlatformShm,
}

impl ShmSegment {
    /// Map a named segment of `size` user-visible bytes.
    pub fn open(name: &str, size: usize, mode: ShmOpenMode) -> io::Result<Self> {
        Ok(Self {
            inner: PlatformShm::acquire(name, size, mode)?,
        })
    }

    /// Start of the user-visible bytes.
    pub fn as_ptr(&self) -> *const u8 {
        self.inner.as_ptr()
    }

    /// Start of the user-visible bytes, writable.
    pub fn as_mut_ptr(&self) -> *mut u8 {
        self.inner.as_mut_ptr()
    }

    /// User-visible size.
    pub fn len(&self) -> usize {
        self.inner.user_size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this handle created the object (and owned any one-time
    /// initialization of its contents).
    pub fn created(&self) -> bool {
        self.inner.prev_ref_count() == 0
    }

    /// Number of handles mapping the segment, across all processes.
    pub fn ref_count(&self) -> i32 {
        self.inner.ref_count()
    }

    /// Remove the backing object now; the mapping stays usable until drop.
    pub fn unlink(&self) {
        self.inner.unlink();
    }

    /// Remove a named segment without opening it.
    pub fn unlink_by_name(name: &str) {
        PlatformShm::unlink_by_name(name);
    }

    /// Remove the backing storage for `name`.
    pub fn clear_storage(name: &str) {
        PlatformShm::unlink_by_name(name);
    }
}
