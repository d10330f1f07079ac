// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Shared-memory message passing between fixed cores. A named region holds a
// fixed buffer pool, per-core signal queues, and an endpoint table; every
// multi-step mutation runs under one process-shared gate, and cross-core
// wakeups travel over per-core doorbells. The shared structures are a
// #[repr(C)] ABI, identical for every participant that maps them.

pub mod config;
pub mod shm_name;

mod platform;

pub mod coherent;

mod endpoint;
pub use endpoint::Endpoint;

mod timeout;
pub use timeout::Timeout;

mod error;
pub use error::{Error, Result, SendNocopyError};

pub mod pool;
pub mod registry;
pub mod signal;

pub mod layout;

mod shm;
pub use shm::{ShmOpenMode, ShmSegment};

mod mutex;
pub use mutex::ShmMutex;

mod condition;
pub use condition::ShmCondvar;

mod event;
pub use event::WakeEvent;

mod doorbell;
pub use doorbell::Doorbell;

mod buffer;
pub use buffer::{RxBuffer, TxBuffer};

mod region;
pub use region::{Info, Region};
