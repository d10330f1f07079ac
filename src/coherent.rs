// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Coherent access to fields of the shared region.
//
// On the original hardware every read of peer-writable state is preceded by
// a cache-line invalidate and every write is followed by a flush. Hosted
// targets are cache-coherent, so only the ordering half of that contract
// remains: an acquire fence before each load, a release fence after each
// store, and volatile access so the compiler can neither cache nor elide
// the operation. The bracketing points stay visible in the code either way.

use std::cell::UnsafeCell;
use std::mem;
use std::ptr;
use std::sync::atomic::{fence, Ordering};

/// Discard the local view of `len` bytes at `ptr` before reading them.
#[inline]
pub fn invalidate(_ptr: *const u8, _len: usize) {
    fence(Ordering::Acquire);
}

/// Publish `len` bytes at `ptr` so peers observe the preceding writes.
#[inline]
pub fn flush(_ptr: *const u8, _len: usize) {
    fence(Ordering::Release);
}

/// A field of the shared region that peers may read or write.
///
/// `load` and `store` perform the invalidate/flush bracketing; nothing else
/// in the crate touches a shared scalar directly. The accessor guarantees
/// coherency only — mutual exclusion comes from the region gate held around
/// every multi-step mutation.
#[repr(transparent)]
pub struct Coherent<T: Copy> {
    cell: UnsafeCell<T>,
}

unsafe impl<T: Copy + Send> Send for Coherent<T> {}
unsafe impl<T: Copy + Send> Sync for Coherent<T> {}

impl<T: Copy> Coherent<T> {
    pub fn load(&self) -> T {
        invalidate(self.cell.get() as *const u8, mem::size_of::<T>());
        unsafe { ptr::read_volatile(self.cell.get()) }
    }

    pub fn store(&self, value: T) {
        unsafe { ptr::write_volatile(self.cell.get(), value) };
        flush(self.cell.get() as *const u8, mem::size_of::<T>());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_scalar() {
        let c: Coherent<u32> = unsafe { mem::zeroed() };
        assert_eq!(c.load(), 0);
        c.store(0xdead_beef);
        assert_eq!(c.load(), 0xdead_beef);
    }

    #[test]
    fn is_layout_transparent() {
        assert_eq!(mem::size_of::<Coherent<u32>>(), mem::size_of::<u32>());
        assert_eq!(mem::align_of::<Coherent<u32>>(), mem::align_of::<u32>());
    }
}
