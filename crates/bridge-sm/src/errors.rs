//! State machine error types.

use std::fmt::Display;

use thiserror::Error;

/// Error representing an invalid state transition.
///
/// Transitions only move forward; replaying a stale event against a machine
/// that has already advanced past it is rejected with this error rather than
/// rewinding or double-applying.
#[derive(Debug, Clone, Error)]
pub struct TransitionErr(pub String);

impl Display for TransitionErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TransitionErr: {}", self.0)
    }
}
