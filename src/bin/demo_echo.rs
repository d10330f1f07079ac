// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Usage:
//   demo_echo
//
// Echo service side of the two-process demo.  Attaches to the region
// "intercore-demo" as core 1, registers the well-known echo endpoint and
// sends every received payload straight back to its sender.
//
// Start this side first, then run demo_pingpong in a second terminal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use intercore::config::BUFFER_SIZE;
use intercore::{Error, Region, Timeout};

const REGION_NAME: &str = "intercore-demo";
const ECHO_PORT: u32 = 1;

fn run_echo(quit: Arc<AtomicBool>) {
    let region = Region::initialize(REGION_NAME, 1, 0).expect("initialize region");
    let ep = region.create_endpoint(ECHO_PORT).expect("create endpoint");
    println!("echo: listening on {ep}");

    let mut buf = [0u8; BUFFER_SIZE];
    let mut served = 0usize;
    while !quit.load(Ordering::Acquire) {
        // Poll with a short timeout so the quit flag stays responsive.
        let (source, n) = match region.recv(ep, &mut buf, Timeout::from_millis(200)) {
            Ok(got) => got,
            Err(Error::Timeout) => continue,
            Err(e) => {
                eprintln!("echo: recv failed: {e}");
                break;
            }
        };
        if let Err(e) = region.send(ep, source, &buf[..n], Timeout::from_millis(1000)) {
            eprintln!("echo: reply to {source} failed: {e}");
            continue;
        }
        served += 1;
    }

    println!("echo: quit after {served} messages...");
}

fn main() {
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

    // The service side owns the region lifetime: wipe anything a crashed
    // earlier run left behind, then initialize fresh.
    Region::clear_storage(REGION_NAME);
    run_echo(quit);
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
