//! Domain types and pure protocol functions for the bridge orchestrator.
//!
//! Everything in this crate is free of I/O: receipt views, operation records,
//! the L1→L2 deposit-hash derivation and the L2→L1 withdrawal message
//! extraction are all pure functions over already-fetched chain data. The
//! network-facing counterparts live in `portal-bridge-chain`.

pub mod deposit;
pub mod errors;
pub mod events;
pub mod params;
pub mod types;
pub mod withdrawal;
