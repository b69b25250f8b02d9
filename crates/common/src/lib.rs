//! Shared utilities for the bridge orchestrator services, currently just the
//! logging bootstrap.

pub mod logging;

// Re-export tracing crate for convenience.
pub use tracing;
