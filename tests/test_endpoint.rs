// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Endpoint registration tests through the region API.

use std::sync::atomic::{AtomicUsize, Ordering};

use intercore::config::{BUFFER_COUNT, ENDPOINT_MAX};
use intercore::{Endpoint, Error, Region, Timeout};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn unique_name(prefix: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_ep_{n}")
}

fn fresh_region(prefix: &str) -> (String, Region) {
    let name = unique_name(prefix);
    Region::clear_storage(&name);
    let region = Region::initialize(&name, 0, 0).expect("initialize");
    (name, region)
}

#[test]
fn create_carries_identity() {
    let name = unique_name("identity");
    Region::clear_storage(&name);
    let region = Region::initialize(&name, 1, 6).expect("initialize");

    let ep = region.create_endpoint(42).expect("create");
    assert_eq!(ep, Endpoint::new(1, 6, 42));
    assert_eq!(region.msgs_available(ep).expect("available"), 0);
}

#[test]
fn reserved_port_is_rejected() {
    let (_name, region) = fresh_region("reserved");
    assert!(matches!(
        region.create_endpoint(0),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn duplicate_port_is_rejected() {
    let (_name, region) = fresh_region("dup");
    region.create_endpoint(4).expect("first");
    assert!(matches!(
        region.create_endpoint(4),
        Err(Error::EndpointAlreadyExists)
    ));
}

#[test]
fn same_port_on_both_cores_coexists() {
    let (name, a) = fresh_region("coexist");
    let b = Region::initialize(&name, 1, 0).expect("attach core 1");

    let ea = a.create_endpoint(7).expect("core 0");
    let eb = b.create_endpoint(7).expect("core 1");
    assert_ne!(ea, eb);

    // Each registration is visible from the other side.
    assert_eq!(a.msgs_available(eb).expect("peer lookup"), 0);
    assert_eq!(b.msgs_available(ea).expect("peer lookup"), 0);
}

#[test]
fn table_exhaustion_reports_no_memory() {
    let (_name, region) = fresh_region("exhaust");

    for port in 1..=ENDPOINT_MAX as u32 {
        region.create_endpoint(port).expect("register");
    }
    assert!(matches!(
        region.create_endpoint(ENDPOINT_MAX as u32 + 1),
        Err(Error::NoMemory)
    ));

    // Destroying one frees a row for the next registration.
    region
        .destroy_endpoint(Endpoint::new(0, 0, 3))
        .expect("destroy");
    region
        .create_endpoint(ENDPOINT_MAX as u32 + 1)
        .expect("register after destroy");
}

#[test]
fn destroy_then_recreate() {
    let (_name, region) = fresh_region("recreate");

    let ep = region.create_endpoint(5).expect("create");
    region.destroy_endpoint(ep).expect("destroy");
    assert!(matches!(
        region.msgs_available(ep),
        Err(Error::EndpointNotFound)
    ));

    region.create_endpoint(5).expect("recreate");
}

#[test]
fn destroy_unknown_fails() {
    let (_name, region) = fresh_region("unknown");
    assert!(matches!(
        region.destroy_endpoint(Endpoint::new(0, 0, 99)),
        Err(Error::EndpointNotFound)
    ));
}

#[test]
fn destroy_twice_fails_the_second_time() {
    let (_name, region) = fresh_region("twice");

    let ep = region.create_endpoint(8).expect("create");
    region.destroy_endpoint(ep).expect("first destroy");
    assert!(matches!(
        region.destroy_endpoint(ep),
        Err(Error::EndpointNotFound)
    ));
}

#[test]
fn destroy_returns_queued_buffers_to_pool() {
    let (name, a) = fresh_region("reclaim");
    let b = Region::initialize(&name, 1, 0).expect("attach core 1");

    let src = a.create_endpoint(1).expect("src");
    let dst = b.create_endpoint(1).expect("dst");

    for i in 0..3u8 {
        a.send(src, dst, &[i], Timeout::Forever).expect("send");
    }
    assert_eq!(a.info().expect("info").free_buffers, BUFFER_COUNT - 3);
    assert_eq!(b.msgs_available(dst).expect("available"), 3);

    b.destroy_endpoint(dst).expect("destroy with backlog");
    assert_eq!(a.info().expect("info").free_buffers, BUFFER_COUNT);
}

#[test]
fn pending_messages_count() {
    let (name, a) = fresh_region("count");
    let b = Region::initialize(&name, 1, 0).expect("attach core 1");

    let src = a.create_endpoint(2).expect("src");
    let dst = b.create_endpoint(2).expect("dst");

    assert_eq!(b.msgs_available(dst).expect("empty"), 0);
    for i in 0..4u8 {
        a.send(src, dst, &[i], Timeout::Forever).expect("send");
        assert_eq!(b.msgs_available(dst).expect("counting"), i as usize + 1);
    }

    let mut buf = [0u8; 8];
    b.recv(dst, &mut buf, Timeout::Forever).expect("recv");
    assert_eq!(b.msgs_available(dst).expect("after recv"), 3);
}
