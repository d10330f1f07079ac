// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Compile-time geometry of the shared region.
//
// Every participant maps the same #[repr(C)] structure, so all sizes here
// are build constants: changing any of them changes the region ABI, and the
// version string must be bumped with it.

/// Number of cores sharing one region.
pub const CORE_COUNT: usize = 2;

/// Number of fixed-size message buffers in the shared pool.
pub const BUFFER_COUNT: usize = 10;

/// Payload capacity of one message buffer, in bytes.
pub const BUFFER_SIZE: usize = 1024;

/// Capacity of the endpoint table.
pub const ENDPOINT_MAX: usize = 10;

/// Slots per core in the circular signal queue. One slot is sacrificed to
/// tell full from empty, so at most `SIGNAL_QUEUE_SLOTS - 1` signals can be
/// outstanding against one core.
pub const SIGNAL_QUEUE_SLOTS: usize = 16;

/// Port number marking an endpoint-table slot as unused; never valid in a
/// registered endpoint.
pub const RESERVED_PORT: u32 = 0;

/// Written to the region header by whichever participant initializes it
/// first. A later attach that finds this string skips initialization.
pub const INIT_SENTINEL: [u8; 8] = *b"icready\0";

/// Region ABI version. An attach compares the major prefix and refuses to
/// join a region built with a different one.
pub const VERSION_STRING: [u8; 8] = *b"002.000\0";

/// Length of the version prefix that must match between participants.
pub const VERSION_MAJOR_LEN: usize = 4;

/// Upper bound on one uninterrupted blocking wait, in milliseconds.
/// Infinite waits re-check their condition at this interval in case a wake
/// was missed.
pub const SAFETY_NET_MS: u64 = 50;

/// Backoff before the doorbell service retries a contended gate, in
/// microseconds.
pub const GATE_RETRY_DELAY_US: u64 = 100;
