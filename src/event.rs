// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Cross-process wake event.
//
// A shared epoch counter paired with a condition variable. Waiters snapshot
// the epoch while they can still observe the state they are about to wait
// on, then sleep until some process moves the epoch past the snapshot. A
// bump between snapshot and sleep is caught by the locked re-check, so the
// wake cannot be lost; it can only arrive early.

use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use crate::{ShmCondvar, ShmMutex, ShmOpenMode, ShmSegment};

pub struct WakeEvent {
    seq: ShmSegment,
    cond: ShmCondvar,
    lock: ShmMutex,
}

impl WakeEvent {
    /// Open a named wake event. The epoch counter, condition variable, and
    /// lock all derive their storage names from `name`.
    pub fn open(name: &str) -> io::Result<Self> {
        let seq = ShmSegment::open(
            &format!("{name}_seq"),
            std::mem::size_of::<AtomicU32>(),
            ShmOpenMode::CreateOrOpen,
        )?;
        let cond = ShmCondvar::open(&format!("{name}_cond"))?;
        let lock = ShmMutex::open(&format!("{name}_lock"))?;
        Ok(Self { seq, cond, lock })
    }

    fn cell(&self) -> &AtomicU32 {
        // The segment is zero-filled on creation, so the epoch starts at 0.
        unsafe { &*(self.seq.as_ptr() as *const AtomicU32) }
    }

    /// Current epoch. Snapshot this before releasing whatever lock guards
    /// the state you are waiting on.
    pub fn epoch(&self) -> u32 {
        self.cell().load(Ordering::SeqCst)
    }

    /// Sleep until the epoch moves past `seen`. `None` waits forever;
    /// `Ok(false)` means the timeout hit first.
    pub fn wait_past(&self, seen: u32, timeout_ms: Option<u64>) -> io::Result<bool> {
        let deadline = timeout_ms.map(|ms| Instant::now() + Duration::from_millis(ms));
        self.lock.lock()?;
        while self.epoch() == seen {
            let left = match deadline {
                None => None,
                Some(d) => {
                    let left = d.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        self.lock.unlock()?;
                        return Ok(false);
                    }
                    Some(left.as_millis().max(1) as u64)
                }
            };
            if !self.cond.wait(&self.lock, left)? {
                self.lock.unlock()?;
                return Ok(false);
            }
        }
        self.lock.unlock()?;
        Ok(true)
    }

    /// Bump the epoch and wake every waiter.
    pub fn signal_all(&self) -> io::Result<()> {
        self.cell().fetch_add(1, Ordering::SeqCst);
        // Barrier: a waiter between its epoch re-check and cond_wait holds
        // the lock, so acquiring it here orders the bump before its sleep.
        self.lock.lock()?;
        self.lock.unlock()?;
        self.cond.broadcast()
    }

    /// Remove the backing storage for a named wake event.
    pub fn clear_storage(name: &str) {
        ShmSegment::clear_storage(&format!("{name}_seq"));
        ShmCondvar::clear_storage(&format!("{name}_cond"));
        ShmMutex::clear_storage(&format!("{name}_lock"));
    }
}
