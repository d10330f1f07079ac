// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Endpoint addressing.

use std::fmt;

use crate::config::{CORE_COUNT, RESERVED_PORT};

/// Address of a message source or destination.
///
/// `core` selects the signal queue delivery notifications land on, `node`
/// distinguishes independent participants on one core, and `port` is chosen
/// by the application. Port 0 is reserved and marks a free endpoint-table
/// slot, so it can never name a live endpoint.
///
/// The triplet is stored verbatim inside the shared region, hence the
/// `#[repr(C)]` layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct Endpoint {
    pub core: u32,
    pub node: u32,
    pub port: u32,
}

impl Endpoint {
    pub const fn new(core: u32, node: u32, port: u32) -> Self {
        Self { core, node, port }
    }

    /// Whether the triplet could name a live endpoint: a non-reserved port
    /// on a core that exists in this build.
    pub fn is_valid(&self) -> bool {
        self.port != RESERVED_PORT && (self.core as usize) < CORE_COUNT
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.core, self.node, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_port_is_invalid() {
        assert!(!Endpoint::new(0, 0, RESERVED_PORT).is_valid());
        assert!(Endpoint::new(0, 0, 1).is_valid());
    }

    #[test]
    fn out_of_range_core_is_invalid() {
        assert!(!Endpoint::new(CORE_COUNT as u32, 0, 1).is_valid());
    }

    #[test]
    fn display_is_triplet() {
        assert_eq!(Endpoint::new(1, 0, 7).to_string(), "1:0:7");
    }
}
