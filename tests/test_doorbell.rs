// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Doorbell tests: level-triggered pending, masking, redelivery, quit.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use intercore::Doorbell;

static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn unique_name(prefix: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_db_{n}")
}

fn fresh(name: &str) -> Doorbell {
    Doorbell::clear_storage(name);
    Doorbell::open(name).expect("open doorbell")
}

#[test]
fn ring_raises_pending() {
    let name = unique_name("ring");
    let db = fresh(&name);

    assert!(!db.is_pending());
    db.ring().expect("ring");
    assert!(db.is_pending());
}

#[test]
fn pending_level_holds_until_acknowledged() {
    let name = unique_name("level");
    let db = fresh(&name);

    db.ring().expect("ring");
    db.ring().expect("ring again");
    assert!(db.is_pending(), "repeat rings keep one level raised");

    assert!(db.acknowledge(), "first acknowledge sees the level");
    assert!(!db.is_pending());
    assert!(!db.acknowledge(), "second acknowledge sees nothing");
}

#[test]
fn wait_times_out_when_idle() {
    let name = unique_name("idle");
    let db = fresh(&name);

    let start = Instant::now();
    let got = db.wait_pending(Some(100)).expect("wait");
    let elapsed = start.elapsed();

    assert!(!got, "nothing rang, the wait must time out");
    assert!(
        elapsed.as_millis() >= 80,
        "should have waited ~100ms, got {}ms",
        elapsed.as_millis()
    );
}

#[test]
fn already_pending_returns_immediately() {
    let name = unique_name("prior");
    let db = fresh(&name);

    db.ring().expect("ring");
    let start = Instant::now();
    assert!(db.wait_pending(Some(2000)).expect("wait"));
    assert!(start.elapsed().as_millis() < 500, "a raised level must not sleep");
}

#[test]
fn ring_wakes_waiter() {
    let name = unique_name("wake");
    let db = Arc::new(fresh(&name));

    let db2 = Arc::clone(&db);
    let waiter = thread::spawn(move || db2.wait_pending(Some(5000)).expect("wait"));

    thread::sleep(Duration::from_millis(50));
    db.ring().expect("ring");

    assert!(waiter.join().unwrap(), "ring must wake the service wait");
}

#[test]
fn ring_from_second_handle_wakes_waiter() {
    let name = unique_name("remote");
    Doorbell::clear_storage(&name);

    let ours = Arc::new(Doorbell::open(&name).expect("open ours"));
    let theirs = Doorbell::open(&name).expect("open theirs");

    let db2 = Arc::clone(&ours);
    let waiter = thread::spawn(move || db2.wait_pending(Some(5000)).expect("wait"));

    thread::sleep(Duration::from_millis(50));
    theirs.ring().expect("ring via second handle");

    assert!(waiter.join().unwrap());
    assert!(ours.is_pending(), "level is shared between handles");
}

#[test]
fn mask_gags_delivery_until_enabled() {
    let name = unique_name("mask");
    let db = Arc::new(fresh(&name));

    db.disable();
    db.ring().expect("ring while masked");
    assert!(db.is_pending(), "masking never drops the level");
    assert!(!db.deliverable());

    // Masked: the service wait must sit out its full timeout.
    let start = Instant::now();
    assert!(!db.wait_pending(Some(100)).expect("wait masked"));
    assert!(start.elapsed().as_millis() >= 80);

    // Unmask from another thread while a wait is parked; the held-back
    // level must be redelivered.
    let db2 = Arc::clone(&db);
    let waiter = thread::spawn(move || db2.wait_pending(Some(5000)).expect("wait"));
    thread::sleep(Duration::from_millis(50));
    db.enable().expect("enable");

    assert!(waiter.join().unwrap(), "enable must redeliver the pending level");
    assert!(db.deliverable());
}

#[test]
fn quit_unblocks_waiter() {
    let name = unique_name("quit");
    let db = Arc::new(fresh(&name));

    let db2 = Arc::clone(&db);
    let waiter = thread::spawn(move || db2.wait_pending(None).expect("wait"));

    thread::sleep(Duration::from_millis(50));
    db.quit_waiting().expect("quit");

    assert!(waiter.join().unwrap(), "quit must end an infinite wait");
    assert!(db.quitting());
    assert!(!db.deliverable(), "a quit doorbell delivers nothing");
}
