// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Zero-copy path tests: buffer handles, in-place payloads, failure
// hand-back, and slot conservation on drop.

use std::sync::atomic::{AtomicUsize, Ordering};

use intercore::config::{BUFFER_COUNT, BUFFER_SIZE};
use intercore::{Endpoint, Error, Region, Timeout};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn unique_name(prefix: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_nc_{n}")
}

fn two_cores(prefix: &str) -> (Region, Region, Endpoint, Endpoint) {
    let name = unique_name(prefix);
    Region::clear_storage(&name);
    let a = Region::initialize(&name, 0, 0).expect("attach core 0");
    let b = Region::initialize(&name, 1, 0).expect("attach core 1");
    let ea = a.create_endpoint(1).expect("endpoint core 0");
    let eb = b.create_endpoint(1).expect("endpoint core 1");
    (a, b, ea, eb)
}

fn free_buffers(region: &Region) -> usize {
    region.info().expect("info").free_buffers
}

#[test]
fn fresh_buffer_is_empty_at_full_capacity() {
    let (a, _b, _ea, _eb) = two_cores("fresh");

    let buf = a.alloc_buffer(Timeout::DontWait).expect("alloc");
    assert_eq!(buf.capacity(), BUFFER_SIZE);
    assert_eq!(buf.len(), 0);
    assert!(buf.is_empty());
    assert_eq!(free_buffers(&a), BUFFER_COUNT - 1);

    drop(buf);
    assert_eq!(free_buffers(&a), BUFFER_COUNT, "dropping unsent returns the slot");
}

#[test]
fn write_fills_payload_and_len() {
    let (a, _b, _ea, _eb) = two_cores("write");

    let mut buf = a.alloc_buffer(Timeout::DontWait).expect("alloc");
    buf.write(b"in place").expect("write");
    assert_eq!(buf.len(), 8);
    assert!(!buf.is_empty());
}

#[test]
fn oversize_write_is_rejected() {
    let (a, _b, _ea, _eb) = two_cores("oversize");

    let mut buf = a.alloc_buffer(Timeout::DontWait).expect("alloc");
    let too_big = vec![0u8; BUFFER_SIZE + 1];
    assert!(matches!(
        buf.write(&too_big),
        Err(Error::InvalidArgument(_))
    ));
    assert_eq!(buf.len(), 0, "a failed write must not move the length");
}

#[test]
fn set_len_is_bounded_by_capacity() {
    let (a, _b, _ea, _eb) = two_cores("setlen");

    let mut buf = a.alloc_buffer(Timeout::DontWait).expect("alloc");
    buf.set_len(BUFFER_SIZE).expect("full capacity is valid");
    assert!(matches!(
        buf.set_len(BUFFER_SIZE + 1),
        Err(Error::InvalidArgument(_))
    ));
    assert_eq!(buf.len(), BUFFER_SIZE);
}

#[test]
fn full_cycle_preserves_payload_in_place() {
    let (a, b, ea, eb) = two_cores("cycle");

    let mut tx = a.alloc_buffer(Timeout::Forever).expect("alloc");
    let pattern: Vec<u8> = (0..200u8).collect();
    tx.write(&pattern).expect("write");
    a.send_nocopy(ea, eb, tx).expect("send");

    let rx = b.recv_nocopy(eb, Timeout::Forever).expect("recv");
    assert_eq!(rx.source(), ea);
    assert_eq!(rx.len(), pattern.len());
    assert_eq!(rx.payload(), &pattern[..]);

    rx.free().expect("free");
    assert_eq!(free_buffers(&a), BUFFER_COUNT);
}

#[test]
fn manual_fill_through_payload_mut() {
    let (a, b, ea, eb) = two_cores("manual");

    let mut tx = a.alloc_buffer(Timeout::Forever).expect("alloc");
    tx.payload_mut()[..5].copy_from_slice(b"bytes");
    tx.set_len(5).expect("set_len");
    a.send_nocopy(ea, eb, tx).expect("send");

    let rx = b.recv_nocopy(eb, Timeout::Forever).expect("recv");
    assert_eq!(rx.payload(), b"bytes");
}

#[test]
fn zero_length_nocopy_message() {
    let (a, b, ea, eb) = two_cores("empty");

    let tx = a.alloc_buffer(Timeout::Forever).expect("alloc");
    a.send_nocopy(ea, eb, tx).expect("send");

    let rx = b.recv_nocopy(eb, Timeout::Forever).expect("recv");
    assert_eq!(rx.source(), ea);
    assert!(rx.is_empty());
    assert_eq!(rx.payload(), b"");
}

#[test]
fn alloc_exhausts_the_pool() {
    let (a, _b, _ea, _eb) = two_cores("exhaust");

    let mut held = Vec::new();
    for _ in 0..BUFFER_COUNT {
        held.push(a.alloc_buffer(Timeout::DontWait).expect("alloc"));
    }
    assert!(matches!(
        a.alloc_buffer(Timeout::DontWait),
        Err(Error::NoMemory)
    ));

    held.pop();
    a.alloc_buffer(Timeout::DontWait)
        .expect("one slot came back, one alloc fits");
}

#[test]
fn failed_send_hands_the_buffer_back() {
    let (a, b, ea, _eb) = two_cores("handback");

    let mut tx = a.alloc_buffer(Timeout::Forever).expect("alloc");
    tx.write(b"keep me").expect("write");

    let ghost = Endpoint::new(1, 0, 77);
    let mut tx = match a.send_nocopy(ea, ghost, tx) {
        Err(err) => {
            assert!(matches!(err.reason, Error::EndpointNotFound));
            err.buffer
        }
        Ok(()) => panic!("send to an unregistered endpoint must fail"),
    };
    assert_eq!(tx.len(), 7, "the returned handle still owns the message");
    assert_eq!(&tx.payload_mut()[..7], b"keep me");

    // Register the destination and retry with the very same handle.
    let dest = b.create_endpoint(77).expect("endpoint");
    a.send_nocopy(ea, dest, tx).expect("retry");

    let rx = b.recv_nocopy(dest, Timeout::Forever).expect("recv");
    assert_eq!(rx.payload(), b"keep me");
}

#[test]
fn rx_drop_frees_the_slot() {
    let (a, b, ea, eb) = two_cores("rxdrop");

    a.send(ea, eb, b"short lived", Timeout::Forever).expect("send");
    let rx = b.recv_nocopy(eb, Timeout::Forever).expect("recv");
    assert_eq!(free_buffers(&b), BUFFER_COUNT - 1);

    drop(rx);
    assert_eq!(free_buffers(&b), BUFFER_COUNT);
}

#[test]
fn recv_nocopy_nowait_on_empty_times_out() {
    let (_a, b, _ea, eb) = two_cores("rxwait");

    assert!(matches!(
        b.recv_nocopy(eb, Timeout::DontWait),
        Err(Error::Timeout)
    ));
}

#[test]
fn copy_and_nocopy_interoperate() {
    let (a, b, ea, eb) = two_cores("mixed");

    // Copying send, zero-copy receive.
    a.send(ea, eb, b"copied in", Timeout::Forever).expect("send");
    let rx = b.recv_nocopy(eb, Timeout::Forever).expect("recv");
    assert_eq!(rx.payload(), b"copied in");
    rx.free().expect("free");

    // Zero-copy send, copying receive.
    let mut tx = b.alloc_buffer(Timeout::Forever).expect("alloc");
    tx.write(b"copied out").expect("write");
    b.send_nocopy(eb, ea, tx).expect("send");

    let mut buf = [0u8; 32];
    let (source, n) = a.recv(ea, &mut buf, Timeout::Forever).expect("recv");
    assert_eq!(source, eb);
    assert_eq!(&buf[..n], b"copied out");

    assert_eq!(free_buffers(&a), BUFFER_COUNT);
}
