// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// The closed error set of the messaging API.
//
// Expected conditions (timeout, full queue, missing endpoint) are ordinary
// returns; only OS-level gate and segment failures carry an underlying
// cause. Primitive modules below the API stay on io::Result and convert at
// this boundary.

use std::io;

use thiserror::Error;

use crate::buffer::TxBuffer;

#[derive(Error, Debug)]
pub enum Error {
    /// The wait budget ran out before the operation could complete.
    #[error("timed out")]
    Timeout,

    /// Oversize payload, reserved port, or an out-of-range core.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The addressed endpoint is not registered.
    #[error("endpoint not found")]
    EndpointNotFound,

    /// The triplet is already registered.
    #[error("endpoint already exists")]
    EndpointAlreadyExists,

    /// No free buffer (non-blocking allocate) or no free table slot.
    #[error("out of buffers or table slots")]
    NoMemory,

    /// The destination core's signal queue has no room; the message was not
    /// delivered.
    #[error("destination signal queue is full")]
    SignalQueueFull,

    /// The signal queue was empty when a signal was expected.
    #[error("signal queue is empty")]
    SignalQueueEmpty,

    /// The mapped region was initialized by an incompatible build.
    #[error("region version mismatch: found {found:?}, expected {expected:?}")]
    VersionMismatch { expected: String, found: String },

    /// Gate or segment failure from the OS.
    #[error("semaphore failure: {0}")]
    Semaphore(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A failed `send_nocopy`.
///
/// Ownership of the buffer only transfers on success, so the error hands
/// the untouched buffer back for the caller to retry with or drop.
#[derive(Error, Debug)]
#[error("no-copy send failed: {reason}")]
pub struct SendNocopyError {
    pub buffer: TxBuffer,
    #[source]
    pub reason: Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert_to_semaphore() {
        let e: Error = io::Error::from(io::ErrorKind::PermissionDenied).into();
        assert!(matches!(e, Error::Semaphore(_)));
    }

    #[test]
    fn display_is_terse() {
        assert_eq!(Error::Timeout.to_string(), "timed out");
        assert_eq!(
            Error::SignalQueueFull.to_string(),
            "destination signal queue is full"
        );
    }
}
