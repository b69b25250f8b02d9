//! Chain endpoint abstractions for the bridge orchestrator.
//!
//! The orchestrator talks to both layers of the rollup exclusively through the
//! traits in [`endpoint`], so protocol logic never touches a transport
//! directly. [`evm`] provides the production implementation backed by an
//! alloy HTTP provider, and [`contracts`] holds the on-chain interface
//! bindings plus calldata builders for the bridge contracts.

pub mod contracts;
pub mod endpoint;
pub mod evm;

pub use endpoint::{
    BlockInfo, ChainEndpoint, EndpointErr, RollupEndpoint, SettlementEndpoint, StorageProofData,
    TxPayload,
};
pub use evm::{EvmL1Endpoint, EvmL2Endpoint};
