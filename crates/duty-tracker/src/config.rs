//! Operational knobs of the orchestrator.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Polling and timeout policy for the waits the orchestrator performs.
///
/// These are operational settings, not protocol parameters: they bound how
/// long we poll and how often, never what the protocol requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitPolicy {
    /// How long to poll for a transaction receipt before giving up.
    ///
    /// Giving up is not fatal to the operation: the submission stays
    /// persisted and a later resume continues waiting for the same hash.
    pub receipt_timeout: Duration,

    /// Interval between receipt polls.
    pub receipt_poll_interval: Duration,

    /// How long to wait for an output root covering the initiation block.
    pub output_timeout: Duration,

    /// Interval between output oracle polls.
    pub output_poll_interval: Duration,

    /// Interval between challenge-period checks against the L1 clock.
    pub challenge_poll_interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            receipt_timeout: Duration::from_secs(180),
            receipt_poll_interval: Duration::from_secs(2),
            output_timeout: Duration::from_secs(2 * 60 * 60),
            output_poll_interval: Duration::from_secs(12),
            challenge_poll_interval: Duration::from_secs(12),
        }
    }
}
