// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// The region handle: attach, endpoints, send/receive, teardown.
//
// All bookkeeping mutation happens under the region gate, held across whole
// multi-step operations so partial state is never visible. Wakeups
// (doorbells, wake events) are posted after the gate is released; they are
// hints only, and every waiter re-verifies its condition under the gate
// after waking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::buffer::{RxBuffer, TxBuffer};
use crate::config::{
    BUFFER_COUNT, BUFFER_SIZE, CORE_COUNT, GATE_RETRY_DELAY_US, RESERVED_PORT, SAFETY_NET_MS,
    VERSION_STRING,
};
use crate::endpoint::Endpoint;
use crate::error::{Error, Result, SendNocopyError};
use crate::layout::SharedRegion;
use crate::signal::{Signal, SignalKind};
use crate::timeout::{Deadline, Timeout};
use crate::{Doorbell, ShmMutex, ShmOpenMode, ShmSegment, WakeEvent};

/// Version and pool statistics, as captured in one gate hold.
#[derive(Debug, Clone)]
pub struct Info {
    pub version: String,
    pub free_buffers: usize,
    pub buffer_count: usize,
    pub buffer_size: usize,
}

fn version_text(raw: &[u8; 8]) -> String {
    String::from_utf8_lossy(raw).trim_end_matches('\0').to_string()
}

/// `BufferFreed` carries no meaningful target; receivers only count it as a
/// pool-level wake.
fn freed_signal() -> Signal {
    Signal::freed(Endpoint::new(0, 0, RESERVED_PORT))
}

// ---------------------------------------------------------------------------
// RegionInner: everything shared between the handle, outstanding buffer
// handles, and the service thread.
// ---------------------------------------------------------------------------

pub(crate) struct RegionInner {
    name: String,
    core: usize,
    node: u32,
    shm: ShmSegment,
    gate: ShmMutex,
    doorbells: Vec<Doorbell>,
    queued_events: Vec<WakeEvent>,
    freed_events: Vec<WakeEvent>,
    service: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

/// Gate guard. Entering masks this core's own doorbell so our service
/// thread does not spin on try-lock against our own hold; leaving unmasks
/// it, which redelivers any ring that landed meanwhile.
struct RegionAccess<'a> {
    inner: &'a RegionInner,
}

impl<'a> RegionAccess<'a> {
    fn enter(inner: &'a RegionInner) -> Result<Self> {
        inner.doorbells[inner.core].disable();
        if let Err(e) = inner.gate.lock() {
            let _ = inner.doorbells[inner.core].enable();
            return Err(Error::Semaphore(e));
        }
        Ok(Self { inner })
    }

    fn shared(&self) -> &SharedRegion {
        self.inner.shared()
    }
}

impl Drop for RegionAccess<'_> {
    fn drop(&mut self) {
        let _ = self.inner.gate.unlock();
        let _ = self.inner.doorbells[self.inner.core].enable();
    }
}

impl RegionInner {
    pub(crate) fn shared(&self) -> &SharedRegion {
        unsafe { SharedRegion::from_ptr(self.shm.as_ptr()) }
    }

    fn ring_doorbell(&self, core: usize) {
        if let Err(e) = self.doorbells[core].ring() {
            warn!(core, error = %e, "doorbell ring failed");
        }
    }

    /// Wake local free-buffer waiters.
    fn notify_freed_local(&self) {
        if let Err(e) = self.freed_events[self.core].signal_all() {
            warn!(core = self.core, error = %e, "freed event signal failed");
        }
    }

    /// Wake free-buffer waiters everywhere: locals directly, remote cores
    /// through their doorbells (their service threads relay the wake).
    fn notify_freed(&self) {
        self.notify_freed_local();
        for core in 0..CORE_COUNT {
            if core != self.core {
                self.ring_doorbell(core);
            }
        }
    }

    /// Return a slot to the free pool and wake anyone starved for one.
    /// Used by `recv`, buffer-handle drops, and `RxBuffer::free`.
    pub(crate) fn release_slot(&self, idx: u32) -> Result<()> {
        {
            let access = RegionAccess::enter(self)?;
            let shared = access.shared();
            shared.free_list().push(shared.slots(), idx);
            for core in 0..CORE_COUNT {
                if core != self.core {
                    // Queue-full only costs the remote core its early wake;
                    // its safety net re-checks the pool.
                    let _ = shared.queue(core).post(freed_signal());
                }
            }
        }
        self.notify_freed();
        Ok(())
    }

    /// Pop a free slot, blocking per `timeout`.
    ///
    /// The freed-event epoch is snapshotted while the gate is still held, so
    /// a release happening after our empty check either moved the epoch
    /// already or will wake us; an empty pool can never put us to sleep past
    /// a wake we should have seen.
    pub(crate) fn acquire_free_slot(&self, timeout: Timeout) -> Result<u32> {
        let deadline = Deadline::start(timeout);
        loop {
            let seen = {
                let access = RegionAccess::enter(self)?;
                let shared = access.shared();
                if let Some(idx) = shared.free_list().pop(shared.slots()) {
                    return Ok(idx);
                }
                self.freed_events[self.core].epoch()
            };
            let Some(chunk) = deadline.next_chunk() else {
                return Err(match timeout {
                    Timeout::DontWait => Error::NoMemory,
                    _ => Error::Timeout,
                });
            };
            self.freed_events[self.core].wait_past(seen, Some(chunk))?;
        }
    }

    /// Pop the head of `endpoint`'s receive list, blocking per `timeout`.
    /// The endpoint is re-resolved on every pass so a concurrent destroy
    /// surfaces as `EndpointNotFound` instead of an endless wait.
    pub(crate) fn acquire_queued_slot(&self, endpoint: Endpoint, timeout: Timeout) -> Result<u32> {
        let deadline = Deadline::start(timeout);
        loop {
            let seen = {
                let access = RegionAccess::enter(self)?;
                let shared = access.shared();
                let row = shared
                    .endpoints()
                    .find(endpoint)
                    .ok_or(Error::EndpointNotFound)?;
                if let Some(idx) = row.list().pop(shared.slots()) {
                    return Ok(idx);
                }
                self.queued_events[self.core].epoch()
            };
            let Some(chunk) = deadline.next_chunk() else {
                return Err(Error::Timeout);
            };
            self.queued_events[self.core].wait_past(seen, Some(chunk))?;
        }
    }

    /// Steps shared by both send flavors, gate held: resolve the
    /// destination, post its signal, append the slot to its list. Failures
    /// leave the slot untouched for the caller to roll back.
    fn commit_message(&self, shared: &SharedRegion, idx: u32, dest: Endpoint) -> Result<()> {
        let row = shared
            .endpoints()
            .find(dest)
            .ok_or(Error::EndpointNotFound)?;
        shared.queue(dest.core as usize).post(Signal::queued(dest))?;
        row.list().push(shared.slots(), idx);
        Ok(())
    }

    fn send(
        &self,
        source: Endpoint,
        dest: Endpoint,
        payload: &[u8],
        timeout: Timeout,
    ) -> Result<()> {
        let idx = self.acquire_free_slot(timeout)?;
        let result = {
            let access = RegionAccess::enter(self)?;
            let shared = access.shared();
            let result = if payload.len() > BUFFER_SIZE {
                Err(Error::InvalidArgument(
                    "message longer than buffer capacity",
                ))
            } else {
                let slot = shared.slot(idx);
                slot.set_source(source);
                slot.write_payload(payload);
                self.commit_message(shared, idx, dest)
            };
            if result.is_err() {
                // All-or-nothing: the allocated slot rolls back before the
                // gate is released.
                shared.free_list().push(shared.slots(), idx);
            }
            result
        };
        match result {
            Ok(()) => {
                self.ring_doorbell(dest.core as usize);
                Ok(())
            }
            Err(e) => {
                self.notify_freed_local();
                Err(e)
            }
        }
    }

    /// Queue an already-filled slot. No rollback here: on failure the slot
    /// stays with the caller, who gets the buffer handle back.
    fn send_prefilled(&self, idx: u32, source: Endpoint, dest: Endpoint, len: usize) -> Result<()> {
        debug_assert!(len <= BUFFER_SIZE);
        let access = RegionAccess::enter(self)?;
        let shared = access.shared();
        let slot = shared.slot(idx);
        slot.set_source(source);
        slot.set_data_len(len);
        slot.flush_payload(len);
        self.commit_message(shared, idx, dest)?;
        drop(access);
        self.ring_doorbell(dest.core as usize);
        Ok(())
    }

    fn recv(&self, endpoint: Endpoint, buf: &mut [u8], timeout: Timeout) -> Result<(Endpoint, usize)> {
        let idx = self.acquire_queued_slot(endpoint, timeout)?;
        // Dequeued: the slot is exclusively ours until released.
        let slot = self.shared().slot(idx);
        let source = slot.source();
        let n = slot.read_payload(buf);
        self.release_slot(idx)?;
        Ok((source, n))
    }

    fn msgs_available(&self, endpoint: Endpoint) -> Result<usize> {
        let access = RegionAccess::enter(self)?;
        let shared = access.shared();
        let row = shared
            .endpoints()
            .find(endpoint)
            .ok_or(Error::EndpointNotFound)?;
        Ok(row.list().len(shared.slots()))
    }

    fn info(&self) -> Result<Info> {
        let access = RegionAccess::enter(self)?;
        let shared = access.shared();
        Ok(Info {
            version: version_text(&shared.version()),
            free_buffers: shared.free_list().len(shared.slots()),
            buffer_count: BUFFER_COUNT,
            buffer_size: BUFFER_SIZE,
        })
    }

    fn create_endpoint(&self, port: u32) -> Result<Endpoint> {
        let endpoint = Endpoint::new(self.core as u32, self.node, port);
        {
            let access = RegionAccess::enter(self)?;
            access.shared().endpoints().register(endpoint)?;
        }
        debug!(%endpoint, "endpoint created");
        Ok(endpoint)
    }

    fn destroy_endpoint(&self, endpoint: Endpoint) -> Result<()> {
        let freed = {
            let access = RegionAccess::enter(self)?;
            let shared = access.shared();
            let row = shared
                .endpoints()
                .find(endpoint)
                .ok_or(Error::EndpointNotFound)?;
            let n = row.list().drain_into(shared.slots(), shared.free_list());
            if n > 0 {
                for core in 0..CORE_COUNT {
                    if core != self.core {
                        let _ = shared.queue(core).post(freed_signal());
                    }
                }
            }
            row.clear();
            n > 0
        };
        if freed {
            self.notify_freed();
        }
        debug!(%endpoint, "endpoint destroyed");
        Ok(())
    }

    /// Remove this handle's endpoints, stop the service thread, detach.
    /// Idempotent; later calls are no-ops.
    fn shutdown(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        debug!(name = %self.name, core = self.core, node = self.node, "detaching from region");

        let freed = {
            let access = RegionAccess::enter(self)?;
            let shared = access.shared();
            let mut freed = false;
            for row in shared.endpoints().iter() {
                if row.is_free() {
                    continue;
                }
                let ep = row.endpoint();
                if ep.core as usize == self.core && ep.node == self.node {
                    if row.list().drain_into(shared.slots(), shared.free_list()) > 0 {
                        freed = true;
                    }
                    row.clear();
                }
            }
            if freed {
                for core in 0..CORE_COUNT {
                    if core != self.core {
                        let _ = shared.queue(core).post(freed_signal());
                    }
                }
            }
            freed
        };
        if freed {
            self.notify_freed();
        }

        if let Err(e) = self.doorbells[self.core].quit_waiting() {
            warn!(core = self.core, error = %e, "service stop signal failed");
        }
        if let Some(handle) = self.service.lock().unwrap().take() {
            let _ = handle.join();
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Doorbell service
    // -----------------------------------------------------------------------

    /// Drain every signal destined for this core. Gate held by the caller.
    fn drain_own_queue(&self) -> (bool, bool) {
        let shared = self.shared();
        let queue = shared.queue(self.core);
        let mut queued = false;
        let mut freed = false;
        while let Some(sig) = queue.take() {
            match sig.kind() {
                Some(SignalKind::BufferQueued) => {
                    trace!(core = self.core, target = %sig.target(), "message signal");
                    queued = true;
                }
                Some(SignalKind::BufferFreed) => {
                    trace!(core = self.core, "free signal");
                    freed = true;
                }
                None => {
                    warn!(core = self.core, "dropping signal of unknown kind");
                }
            }
        }
        (queued, freed)
    }

    /// One thread per attached handle. Sleeps on the core's doorbell; on a
    /// ring it takes the gate in try form only, acknowledges before
    /// draining, and broadcasts the relevant wake events after release. If
    /// the gate is contended the pending level stays raised and the thread
    /// backs off briefly; the level re-triggers it.
    fn service_loop(&self) {
        debug!(core = self.core, "doorbell service started");
        let bell = &self.doorbells[self.core];
        loop {
            if let Err(e) = bell.wait_pending(Some(SAFETY_NET_MS)) {
                warn!(core = self.core, error = %e, "doorbell wait failed");
                thread::sleep(Duration::from_millis(SAFETY_NET_MS));
            }
            if bell.quitting() {
                break;
            }
            if !bell.deliverable() {
                continue;
            }
            match self.gate.try_lock() {
                Ok(true) => {
                    // Acknowledge first: a ring landing mid-drain re-raises
                    // the level and forces another pass.
                    bell.acknowledge();
                    let (queued, freed) = self.drain_own_queue();
                    if let Err(e) = self.gate.unlock() {
                        warn!(core = self.core, error = %e, "gate unlock failed");
                    }
                    if queued {
                        if let Err(e) = self.queued_events[self.core].signal_all() {
                            warn!(core = self.core, error = %e, "queued event signal failed");
                        }
                    }
                    if freed {
                        self.notify_freed_local();
                    }
                }
                Ok(false) => {
                    // Gate contended; level stays raised.
                    thread::sleep(Duration::from_micros(GATE_RETRY_DELAY_US));
                }
                Err(e) => {
                    warn!(core = self.core, error = %e, "gate try-lock failed");
                    thread::sleep(Duration::from_millis(SAFETY_NET_MS));
                }
            }
        }
        debug!(core = self.core, "doorbell service stopped");
    }
}

// ---------------------------------------------------------------------------
// Region: the public handle
// ---------------------------------------------------------------------------

/// One core's attachment to a named shared region.
///
/// The first participant to attach initializes the region; later ones check
/// version compatibility and join. Each handle runs a doorbell service
/// thread until it is destroyed or dropped.
pub struct Region {
    inner: Arc<RegionInner>,
}

impl Region {
    /// Attach core `core` (identity `node`) to the region named `name`,
    /// creating and initializing it if it does not exist yet.
    pub fn initialize(name: &str, core: usize, node: u32) -> Result<Self> {
        if core >= CORE_COUNT {
            return Err(Error::InvalidArgument("core index out of range"));
        }

        let gate = ShmMutex::open(&format!("{name}_gate"))?;
        let shm = ShmSegment::open(name, SharedRegion::BYTES, ShmOpenMode::CreateOrOpen)?;
        let mut doorbells = Vec::with_capacity(CORE_COUNT);
        let mut queued_events = Vec::with_capacity(CORE_COUNT);
        let mut freed_events = Vec::with_capacity(CORE_COUNT);
        for c in 0..CORE_COUNT {
            doorbells.push(Doorbell::open(&format!("{name}_db{c}"))?);
            queued_events.push(WakeEvent::open(&format!("{name}_qev{c}"))?);
            freed_events.push(WakeEvent::open(&format!("{name}_fev{c}"))?);
        }

        let inner = Arc::new(RegionInner {
            name: name.to_string(),
            core,
            node,
            shm,
            gate,
            doorbells,
            queued_events,
            freed_events,
            service: Mutex::new(None),
            closed: AtomicBool::new(false),
        });

        {
            let access = RegionAccess::enter(&inner)?;
            let shared = access.shared();
            if shared.is_initialized() {
                if !shared.version_compatible() {
                    return Err(Error::VersionMismatch {
                        expected: version_text(&VERSION_STRING),
                        found: version_text(&shared.version()),
                    });
                }
                debug!(name, core, node, "attached to existing region");
            } else {
                shared.init();
                debug!(name, core, node, "region initialized");
            }
        }

        let svc = Arc::clone(&inner);
        let handle = thread::Builder::new()
            .name(format!("intercore-svc{core}"))
            .spawn(move || svc.service_loop())?;
        *inner.service.lock().unwrap() = Some(handle);

        Ok(Self { inner })
    }

    /// The region name this handle attached to.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn core(&self) -> usize {
        self.inner.core
    }

    pub fn node(&self) -> u32 {
        self.inner.node
    }

    /// Register the endpoint `(core, node, port)` for this handle's core
    /// and node.
    pub fn create_endpoint(&self, port: u32) -> Result<Endpoint> {
        self.inner.create_endpoint(port)
    }

    /// Remove `endpoint`, rolling any undelivered messages back to the free
    /// pool.
    pub fn destroy_endpoint(&self, endpoint: Endpoint) -> Result<()> {
        self.inner.destroy_endpoint(endpoint)
    }

    /// Copy `payload` to `dest`. Blocks per `timeout` when the pool is dry.
    ///
    /// Delivery is all-or-nothing: any failure past allocation rolls the
    /// buffer back and the destination never observes a partial message.
    pub fn send(
        &self,
        source: Endpoint,
        dest: Endpoint,
        payload: &[u8],
        timeout: Timeout,
    ) -> Result<()> {
        self.inner.send(source, dest, payload, timeout)
    }

    /// Receive into `buf`, blocking per `timeout`. Returns the source
    /// endpoint and the copied length; a message longer than `buf` is
    /// silently truncated to fit.
    pub fn recv(
        &self,
        endpoint: Endpoint,
        buf: &mut [u8],
        timeout: Timeout,
    ) -> Result<(Endpoint, usize)> {
        self.inner.recv(endpoint, buf, timeout)
    }

    /// Messages currently queued on `endpoint`.
    pub fn msgs_available(&self, endpoint: Endpoint) -> Result<usize> {
        self.inner.msgs_available(endpoint)
    }

    /// Version and pool statistics.
    pub fn info(&self) -> Result<Info> {
        self.inner.info()
    }

    /// Claim a free slot for zero-copy sending.
    pub fn alloc_buffer(&self, timeout: Timeout) -> Result<TxBuffer> {
        let idx = self.inner.acquire_free_slot(timeout)?;
        Ok(TxBuffer::claim(Arc::clone(&self.inner), idx, 0))
    }

    /// Queue a pre-filled buffer to `dest` without copying.
    ///
    /// On failure the buffer comes back inside the error, payload intact,
    /// so the caller can retry or drop it (dropping returns the slot to the
    /// pool).
    pub fn send_nocopy(
        &self,
        source: Endpoint,
        dest: Endpoint,
        buf: TxBuffer,
    ) -> std::result::Result<(), SendNocopyError> {
        let (owner, idx, len) = buf.take_slot();
        match self.inner.send_prefilled(idx, source, dest, len) {
            Ok(()) => Ok(()),
            Err(reason) => Err(SendNocopyError {
                buffer: TxBuffer::claim(owner, idx, len),
                reason,
            }),
        }
    }

    /// Receive without copying: the returned guard exposes the payload in
    /// its pool slot until freed or dropped.
    pub fn recv_nocopy(&self, endpoint: Endpoint, timeout: Timeout) -> Result<RxBuffer> {
        let idx = self.inner.acquire_queued_slot(endpoint, timeout)?;
        let slot = self.inner.shared().slot(idx);
        let source = slot.source();
        let len = slot.data_len();
        slot.invalidate_payload(len);
        Ok(RxBuffer::claim(Arc::clone(&self.inner), idx, source, len))
    }

    /// Detach explicitly: remove this handle's endpoints, stop the service
    /// thread, unmap. Dropping the handle does the same best-effort.
    pub fn destroy(self) -> Result<()> {
        self.inner.shutdown()
    }

    /// Remove every named object backing the region `name`: the window, the
    /// gate, and each core's doorbell and wake events.
    pub fn clear_storage(name: &str) {
        ShmSegment::clear_storage(name);
        ShmMutex::clear_storage(&format!("{name}_gate"));
        for c in 0..CORE_COUNT {
            Doorbell::clear_storage(&format!("{name}_db{c}"));
            WakeEvent::clear_storage(&format!("{name}_qev{c}"));
            WakeEvent::clear_storage(&format!("{name}_fev{c}"));
        }
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        let _ = self.inner.shutdown();
    }
}
