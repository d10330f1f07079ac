// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Cross-platform named inter-process mutex.
// Delegates to platform::PlatformMutex (POSIX or Windows).

use std::io;

use crate::platform::PlatformMutex;

/// A named mutex shared between processes.
///
/// On POSIX this is a `pthread_mutex_t` in shared memory, created
/// `PTHREAD_PROCESS_SHARED` and robust where the platform supports it, so a
/// participant dying mid-hold leaves a recoverable lock. On Windows it is a
/// kernel named mutex.
pub struct ShmMutex {
    inner: PlatformMutex,
}

impl ShmMutex {
    /// Open or create the mutex named `name`.
    pub fn open(name: &str) -> io::Result<Self> {
        Ok(Self {
            inner: PlatformMutex::open(name)?,
        })
    }

    /// Blocking lock. A dead former holder is recovered from transparently.
    pub fn lock(&self) -> io::Result<()> {
        self.inner.lock()
    }

    /// Lock with a millisecond timeout. `Ok(false)` means the timeout hit.
    pub fn lock_timeout(&self, timeout_ms: u64) -> io::Result<bool> {
        self.inner.lock_timeout(timeout_ms)
    }

    /// Non-blocking lock attempt. `Ok(false)` means the mutex is contended.
    pub fn try_lock(&self) -> io::Result<bool> {
        self.inner.try_lock()
    }

    pub fn unlock(&self) -> io::Result<()> {
        self.inner.unlock()
    }

    /// Remove the backing storage for a named mutex.
    pub fn clear_storage(name: &str) {
        PlatformMutex::clear_storage(name);
    }

    /// Raw pointer to the platform object. On POSIX this is the
    /// `pthread_mutex_t` a condition variable waits against.
    #[cfg(unix)]
    pub(crate) fn native_mutex_ptr(&self) -> *mut u8 {
        self.inner.native_ptr()
    }
}
