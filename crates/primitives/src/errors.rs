//! Errors produced by the pure protocol derivations.

use alloy_primitives::{Address, B256, U256};
use thiserror::Error;

/// A confirmed receipt did not carry the event data the protocol step
/// expected.
///
/// These errors are fatal for the operation: they signal a protocol mismatch
/// (wrong contract addresses, wrong chain, or a transaction that was not the
/// bridge interaction the caller claimed), not a transient condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedReceipt {
    /// The L1 deposit receipt has no `TransactionDeposited` event from the
    /// portal.
    #[error("no TransactionDeposited event from portal {portal} in receipt for {tx_hash}")]
    MissingDepositEvent {
        /// The portal address that was expected to emit the event.
        portal: Address,
        /// The transaction whose receipt was inspected.
        tx_hash: B256,
    },

    /// The deposit event carries a version this implementation does not
    /// understand.
    #[error("unsupported deposit version {0}")]
    UnsupportedDepositVersion(U256),

    /// The deposit event's packed payload is shorter than the fixed-width
    /// prefix.
    #[error("deposit opaque data too short: expected at least {expected} bytes, got {got}")]
    OpaqueDataTooShort {
        /// The minimum length of the packed payload.
        expected: usize,
        /// The length actually found.
        got: usize,
    },

    /// The L2 withdrawal receipt has no `MessagePassed` event from the
    /// message passer predeploy.
    #[error("no MessagePassed event from message passer {passer} in receipt for {tx_hash}")]
    MissingMessagePassedEvent {
        /// The message passer address that was expected to emit the event.
        passer: Address,
        /// The transaction whose receipt was inspected.
        tx_hash: B256,
    },

    /// More than one `MessagePassed` event in a single initiation receipt;
    /// the orchestrator only ever initiates one withdrawal per transaction.
    #[error("multiple MessagePassed events in receipt for {0}")]
    AmbiguousMessagePassedEvent(B256),

    /// The withdrawal hash the contract emitted does not match the hash
    /// recomputed from the event fields.
    #[error("emitted withdrawal hash {emitted} does not match computed hash {computed}")]
    WithdrawalHashMismatch {
        /// The hash carried in the event.
        emitted: B256,
        /// The hash recomputed locally.
        computed: B256,
    },

    /// The event payload failed to ABI-decode.
    #[error("failed to decode event log: {0}")]
    EventDecode(String),
}

impl From<alloy_sol_types::Error> for MalformedReceipt {
    fn from(e: alloy_sol_types::Error) -> Self {
        MalformedReceipt::EventDecode(e.to_string())
    }
}
