// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Per-core doorbell.
//
// A level-triggered pending flag in shared memory plus a condition variable.
// Any core rings the bell; the owning core's service thread sleeps on it and
// acknowledges the flag once it has actually drained the signal queue. The
// flag stays raised until acknowledged, so a ring is never lost to a service
// thread that was busy or masked when it arrived.
//
// The mask is process-local: it only gags the owning core's own service
// thread while that same process holds the region gate. Remote ringers are
// unaffected and the pending level survives masking.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{Duration, Instant};

use crate::{ShmCondvar, ShmMutex, ShmOpenMode, ShmSegment};

pub struct Doorbell {
    flag: ShmSegment,
    cond: ShmCondvar,
    lock: ShmMutex,
    masked: AtomicBool,
    quit: AtomicBool,
}

impl Doorbell {
    /// Open a named doorbell. The pending flag, condition variable, and
    /// lock all derive their storage names from `name`.
    pub fn open(name: &str) -> io::Result<Self> {
        let flag = ShmSegment::open(
            &format!("{name}_flag"),
            std::mem::size_of::<AtomicU32>(),
            ShmOpenMode::CreateOrOpen,
        )?;
        let cond = ShmCondvar::open(&format!("{name}_cond"))?;
        let lock = ShmMutex::open(&format!("{name}_lock"))?;
        Ok(Self {
            flag,
            cond,
            lock,
            masked: AtomicBool::new(false),
            quit: AtomicBool::new(false),
        })
    }

    fn cell(&self) -> &AtomicU32 {
        unsafe { &*(self.flag.as_ptr() as *const AtomicU32) }
    }

    /// Raise the pending level and wake the owning core's service thread.
    pub fn ring(&self) -> io::Result<()> {
        self.cell().store(1, Ordering::SeqCst);
        self.lock.lock()?;
        self.lock.unlock()?;
        self.cond.broadcast()
    }

    /// Whether the bell is currently raised.
    pub fn is_pending(&self) -> bool {
        self.cell().load(Ordering::SeqCst) != 0
    }

    /// Lower the pending level. Returns whether it was raised. Call this
    /// before draining, so a ring landing mid-drain re-raises the level and
    /// forces another pass.
    pub fn acknowledge(&self) -> bool {
        self.cell().swap(0, Ordering::SeqCst) != 0
    }

    /// Gag this process's service thread. Rings still raise the level.
    pub fn disable(&self) {
        self.masked.store(true, Ordering::SeqCst);
    }

    /// Undo [`Self::disable`]. A level raised while masked is redelivered
    /// to the service thread now.
    pub fn enable(&self) -> io::Result<()> {
        self.masked.store(false, Ordering::SeqCst);
        if self.is_pending() {
            self.lock.lock()?;
            self.lock.unlock()?;
            self.cond.broadcast()?;
        }
        Ok(())
    }

    /// Whether a service pass should run now: raised, unmasked, not quit.
    pub fn deliverable(&self) -> bool {
        self.is_pending()
            && !self.masked.load(Ordering::SeqCst)
            && !self.quit.load(Ordering::Relaxed)
    }

    /// Sleep until the bell is deliverable or quit is signalled. `None`
    /// waits forever; `Ok(false)` means the timeout hit first.
    pub fn wait_pending(&self, timeout_ms: Option<u64>) -> io::Result<bool> {
        let deadline = timeout_ms.map(|ms| Instant::now() + Duration::from_millis(ms));
        self.lock.lock()?;
        while !self.quit.load(Ordering::Relaxed)
            && !(self.is_pending() && !self.masked.load(Ordering::SeqCst))
        {
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

    pub fn quitting(&self) -> bool {
        self.quit.load(Ordering::Relaxed)
    }

    /// Tell the service thread to exit and wake it.
    pub fn quit_waiting(&self) -> io::Result<()> {
        self.quit.store(true, Ordering::Release);
        self.lock.lock()?;
        self.lock.unlock()?;
        self.cond.broadcast()
    }

    /// Remove the backing storage for a named doorbell.
    pub fn clear_storage(name: &str) {
        ShmSegment::clear_storage(&format!("{name}_flag"));
        ShmCondvar::clear_storage(&format!("{name}_cond"));
        ShmMutex::clear_storage(&format!("{name}_lock"));
    }
}
