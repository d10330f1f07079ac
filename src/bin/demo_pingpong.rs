// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Usage:
//   demo_pingpong <size> <count>
//
// Host side of the two-process demo.  Attaches to the region
// "intercore-demo" as core 0, sends <count> messages of <size> bytes to the
// echo endpoint on core 1 and waits for each reply, then prints the
// round-trip rate.
//
// Run demo_echo first.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use intercore::config::BUFFER_SIZE;
use intercore::{Endpoint, Error, Region, Timeout};

const REGION_NAME: &str = "intercore-demo";
const ECHO_PORT: u32 = 1;
const PING_PORT: u32 = 2;

fn run_pingpong(size: usize, count: usize, quit: Arc<AtomicBool>) {
    let region = Region::initialize(REGION_NAME, 0, 0).expect("initialize region");
    let ep = region.create_endpoint(PING_PORT).expect("create endpoint");
    let echo = Endpoint::new(1, 0, ECHO_PORT);

    let payload = vec![b'A'; size];
    let mut buf = [0u8; BUFFER_SIZE];

    // First exchange doubles as the handshake: keep retrying until the echo
    // side has registered its endpoint.
    println!("pingpong: waiting for echo service...");
    loop {
        if quit.load(Ordering::Acquire) {
            return;
        }
        match region.send(ep, echo, &payload, Timeout::from_millis(200)) {
            Ok(()) => break,
            Err(Error::EndpointNotFound) => thread::sleep(Duration::from_millis(100)),
            Err(Error::Timeout) => continue,
            Err(e) => {
                eprintln!("pingpong: send failed: {e}");
                return;
            }
        }
    }
    let _ = region
        .recv(ep, &mut buf, Timeout::Forever)
        .expect("first reply");
    println!("pingpong: echo is up, {count} round trips of {size} bytes");

    let started = Instant::now();
    let mut done = 0usize;
    while done < count && !quit.load(Ordering::Acquire) {
        region
            .send(ep, echo, &payload, Timeout::Forever)
            .expect("send");
        let (_, n) = region
            .recv(ep, &mut buf, Timeout::Forever)
            .expect("recv reply");
        if n != size {
            eprintln!("pingpong: short reply ({n} of {size} bytes)");
        }
        done += 1;
    }
    let secs = started.elapsed().as_secs_f64();

    println!(
        "pingpong: {} round trips in {:.3} s  ({:.0}/s, {:.1} us avg)",
        done,
        secs,
        done as f64 / secs,
        secs * 1e6 / done as f64
    );
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: demo_pingpong <size> <count>");
        std::process::exit(1);
    }
    let size: usize = args[1].parse().expect("size");
    let count: usize = args[2].parse().expect("count");
    if size == 0 || size > BUFFER_SIZE {
        eprintln!("size must be 1..={BUFFER_SIZE}");
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let quit = Arc::new(AtomicBool::new(false));

    {
        let q = Arc::clone(&quit);
        ctrlc_or_sigterm(move || q.store(true, Ordering::Release));
    }

    run_pingpong(size, count, quit);
}

// Minimal cross-platform signal hook: sets the flag on SIGINT / SIGTERM.
fn ctrlc_or_sigterm(f: impl Fn() + Send + 'static) {
    #[cfg(unix)]
    {
        use std::sync::Mutex;
        static CB: std::sync::OnceLock<Mutex<Box<dyn Fn() + Send>>> = std::sync::OnceLock::new();
        CB.get_or_init(|| Mutex::new(Box::new(f)));
        extern "C" fn handler(_: libc::c_int) {
            if let Some(cb) = CB.get() {
                if let Ok(g) = cb.lock() {
                    g();
                }
            }
        }
        unsafe {
            libc::signal(libc::SIGINT, handler as *const () as libc::sighandler_t);
            libc::signal(libc::SIGTERM, handler as *const () as libc::sighandler_t);
            libc::signal(libc::SIGHUP, handler as *const () as libc::sighandler_t);
        }
    }
    #[cfg(not(unix))]
    {
        // On Windows just ignore — Ctrl-C will terminate the process.
        let _ = f;
    }
}

#[cfg(unix)]
extern crate libc;
