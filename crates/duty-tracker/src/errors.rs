//! Error types for the duty tracker.

use std::time::Duration;

use alloy_primitives::B256;
use portal_bridge_chain::EndpointErr;
use portal_bridge_primitives::errors::MalformedReceipt;
use portal_bridge_sm::TransitionErr;
use thiserror::Error;

/// Error type for the [`OperationPersister`](crate::persister::OperationPersister)
/// methods.
#[derive(Debug, Error)]
pub enum PersistErr {
    /// The underlying database rejected a query.
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    /// A persisted state blob could not be encoded or decoded.
    #[error("state codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// No row exists for the requested operation.
    #[error("unknown operation id: {0}")]
    UnknownOperation(String),
}

/// Errors raised while assembling a withdrawal proof bundle.
#[derive(Debug, Clone, Error)]
pub enum ProofConstructionErr {
    /// The output root recomputed from the fetched preimage does not match
    /// the root the oracle published. Usually means the rollup node serving
    /// proofs has not caught up to the proven block, or a reorg.
    #[error("recomputed output root {computed} does not match published root {published}")]
    OutputRootMismatch {
        /// The root recomputed from the fetched block and storage data.
        computed: B256,

        /// The root the oracle published.
        published: B256,
    },

    /// The rpc returned an empty inclusion proof for the withdrawal slot.
    #[error("empty storage proof for withdrawal slot {0}")]
    EmptyProof(B256),
}

/// Unified error type for everything that can go wrong while driving an
/// operation.
#[derive(Debug, Error)]
pub enum OrchestratorErr {
    /// Errors related to writing operation state to disk.
    #[error("failed to commit operation state to disk: {0}")]
    Persist(#[from] PersistErr),

    /// Errors related to state machines being unable to process events.
    #[error("state machine received an invalid event: {0}")]
    Transition(#[from] TransitionErr),

    /// Errors from the chain endpoints.
    #[error("chain endpoint failure: {0}")]
    Endpoint(#[from] EndpointErr),

    /// A confirmed receipt did not carry the protocol events it must.
    #[error("malformed receipt: {0}")]
    MalformedReceipt(#[from] MalformedReceipt),

    /// Errors while assembling a withdrawal proof bundle.
    #[error("withdrawal proof construction failed: {0}")]
    ProofConstruction(#[from] ProofConstructionErr),

    /// No output covering the initiation block appeared within the allotted
    /// window. The operation stays resumable.
    #[error("no output covering L2 block {0} appeared within {1:?}")]
    OutputWaitTimeout(u64, Duration),

    /// General catch-all for errors.
    #[error("fatal error: {0}")]
    Fatal(String),
}
