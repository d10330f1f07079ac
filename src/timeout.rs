// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Wait budgets for the blocking API calls.

use std::time::{Duration, Instant};

use crate::config::SAFETY_NET_MS;

/// How long a blocking operation may wait for its resource.
///
/// `DontWait` and `Forever` are the two sentinel points of the timeout
/// space; everything in between is an ordinary duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Fail immediately if the operation cannot complete now.
    DontWait,
    /// Wait until the operation completes.
    Forever,
    /// Wait at most this long, then fail with `Timeout`.
    After(Duration),
}

impl Timeout {
    pub fn from_millis(ms: u64) -> Self {
        Timeout::After(Duration::from_millis(ms))
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Timeout::After(d)
    }
}

/// Tracks the remaining budget of one blocking call.
///
/// Waits are handed out in chunks of at most [`SAFETY_NET_MS`] so that even
/// an infinite wait periodically re-verifies its condition under the gate.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Deadline {
    Expired,
    Never,
    At(Instant),
}

impl Deadline {
    pub(crate) fn start(timeout: Timeout) -> Self {
        match timeout {
            Timeout::DontWait => Deadline::Expired,
            Timeout::Forever => Deadline::Never,
            Timeout::After(d) => Deadline::At(Instant::now() + d),
        }
    }

    /// Milliseconds the caller may sleep before the next re-check, or
    /// `None` once the budget is spent.
    pub(crate) fn next_chunk(&self) -> Option<u64> {
        match self {
            Deadline::Expired => None,
            Deadline::Never => Some(SAFETY_NET_MS),
            Deadline::At(t) => {
                let now = Instant::now();
                if now >= *t {
                    return None;
                }
                let left = (*t - now).as_millis() as u64;
                Some(left.clamp(1, SAFETY_NET_MS))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dont_wait_has_no_budget() {
        assert_eq!(Deadline::start(Timeout::DontWait).next_chunk(), None);
    }

    #[test]
    fn forever_hands_out_safety_net_chunks() {
        let d = Deadline::start(Timeout::Forever);
        assert_eq!(d.next_chunk(), Some(SAFETY_NET_MS));
        assert_eq!(d.next_chunk(), Some(SAFETY_NET_MS));
    }

    #[test]
    fn finite_budget_is_capped_and_runs_out() {
        let d = Deadline::start(Timeout::from_millis(5));
        let chunk = d.next_chunk().unwrap();
        assert!(chunk >= 1 && chunk <= SAFETY_NET_MS);

        let spent = Deadline::start(Timeout::After(Duration::ZERO));
        assert_eq!(spent.next_chunk(), None);
    }
}
