// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Signal queue saturation through the mapped region.
//
// These tests open the region's backing segment directly and stuff a core's
// queue under the gate without ringing its doorbell, so the owning service
// thread stays asleep and the queue stays full for as long as the test
// needs it to.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use intercore::config::{BUFFER_COUNT, SIGNAL_QUEUE_SLOTS};
use intercore::layout::SharedRegion;
use intercore::signal::Signal;
use intercore::{Doorbell, Endpoint, Error, Region, ShmMutex, ShmOpenMode, ShmSegment, Timeout};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn unique_name(prefix: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_sq_{n}")
}

/// Map the region's segment alongside the live handles.
fn map_shared(name: &str) -> (ShmSegment, ShmMutex) {
    let seg = ShmSegment::open(name, SharedRegion::BYTES, ShmOpenMode::CreateOrOpen)
        .expect("map region segment");
    let gate = ShmMutex::open(&format!("{name}_gate")).expect("open gate");
    (seg, gate)
}

/// Post fabricated message signals into `core`'s queue until it is full.
/// Runs under the gate and does not ring, so nothing drains them.
fn fill_queue(seg: &ShmSegment, gate: &ShmMutex, core: usize, target: Endpoint) -> usize {
    let shared = unsafe { SharedRegion::from_ptr(seg.as_ptr()) };
    gate.lock().expect("gate lock");
    let mut posted = 0;
    while shared.queue(core).post(Signal::queued(target)).is_ok() {
        posted += 1;
    }
    assert!(shared.queue(core).is_full());
    gate.unlock().expect("gate unlock");
    posted
}

#[test]
fn mapped_queue_capacity_is_slots_minus_one() {
    let name = unique_name("capacity");
    Region::clear_storage(&name);
    let _a = Region::initialize(&name, 0, 0).expect("attach core 0");

    // Core 1 has no participant, so nobody drains behind our back.
    let (seg, gate) = map_shared(&name);
    let posted = fill_queue(&seg, &gate, 1, Endpoint::new(1, 0, 1));
    assert_eq!(posted, SIGNAL_QUEUE_SLOTS - 1, "one slot is sacrificed");

    let shared = unsafe { SharedRegion::from_ptr(seg.as_ptr()) };
    gate.lock().expect("gate lock");
    let mut drained = 0;
    while shared.queue(1).take().is_some() {
        drained += 1;
    }
    assert!(shared.queue(1).is_empty());
    gate.unlock().expect("gate unlock");
    assert_eq!(drained, posted);
}

#[test]
fn send_fails_cleanly_when_destination_queue_is_full() {
    let name = unique_name("full");
    Region::clear_storage(&name);
    let a = Region::initialize(&name, 0, 0).expect("attach core 0");
    let b = Region::initialize(&name, 1, 0).expect("attach core 1");
    let ea = a.create_endpoint(1).expect("endpoint core 0");
    let eb = b.create_endpoint(1).expect("endpoint core 1");

    a.send(ea, eb, b"first", Timeout::Forever).expect("send");
    a.send(ea, eb, b"second", Timeout::Forever).expect("send");
    // Let core 1's service drain the two real signals; the messages stay
    // parked on the endpoint until somebody receives them.
    thread::sleep(Duration::from_millis(150));

    let (seg, gate) = map_shared(&name);
    fill_queue(&seg, &gate, 1, eb);

    // Queue-full is not a waitable condition: even a forever send reports
    // it at once, with the just-taken buffer rolled back.
    let start = Instant::now();
    let result = a.send(ea, eb, b"third", Timeout::Forever);
    assert!(matches!(result, Err(Error::SignalQueueFull)));
    assert!(start.elapsed().as_millis() < 500);
    assert_eq!(
        a.info().expect("info").free_buffers,
        BUFFER_COUNT - 2,
        "the failed send must not leak its buffer"
    );
    assert_eq!(b.msgs_available(eb).expect("available"), 2);

    // Ring the stuffed core awake; its service drains the queue and the
    // same send goes through.
    Doorbell::open(&format!("{name}_db1"))
        .expect("open doorbell")
        .ring()
        .expect("ring");
    thread::sleep(Duration::from_millis(200));
    a.send(ea, eb, b"third", Timeout::Forever).expect("retry send");

    let mut buf = [0u8; 16];
    for expected in [&b"first"[..], b"second", b"third"] {
        let (_, n) = b.recv(eb, &mut buf, Timeout::Forever).expect("recv");
        assert_eq!(&buf[..n], expected);
    }
    assert_eq!(a.info().expect("info").free_buffers, BUFFER_COUNT);
}

#[test]
fn recv_survives_a_full_freed_queue() {
    let name = unique_name("freed");
    Region::clear_storage(&name);
    let a = Region::initialize(&name, 0, 0).expect("attach core 0");
    let b = Region::initialize(&name, 1, 0).expect("attach core 1");
    let ea = a.create_endpoint(1).expect("endpoint core 0");
    let eb = b.create_endpoint(1).expect("endpoint core 1");

    a.send(ea, eb, b"payload", Timeout::Forever).expect("send");
    thread::sleep(Duration::from_millis(150));

    // Saturate the sender core's queue so the receive below cannot post
    // its buffer-freed notice.
    let (seg, gate) = map_shared(&name);
    fill_queue(&seg, &gate, 0, ea);

    // The free notice is best-effort; dropping it must not fail the recv
    // or lose the slot.
    let mut buf = [0u8; 16];
    let (source, n) = b.recv(eb, &mut buf, Timeout::Forever).expect("recv");
    assert_eq!(source, ea);
    assert_eq!(&buf[..n], b"payload");
    assert_eq!(b.info().expect("info").free_buffers, BUFFER_COUNT);

    // The pool itself is shared state, so the sender sees the slot back
    // without ever having heard the notice.
    a.send(ea, eb, b"again", Timeout::DontWait).expect("send after drop");
    let (_, n) = b.recv(eb, &mut buf, Timeout::Forever).expect("recv again");
    assert_eq!(&buf[..n], b"again");
}
