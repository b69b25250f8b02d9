//! Transport-agnostic endpoint traits for the two chains the bridge touches.

use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use portal_bridge_primitives::types::{ChainKind, OutputData, TxReceipt};
use thiserror::Error;
use tracing::warn;

/// A fully-formed transaction ready for submission, minus the fields the
/// endpoint fills in itself (nonce, gas pricing, chain id, signature).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxPayload {
    /// Call target.
    pub to: Address,

    /// Native value attached to the call.
    pub value: U256,

    /// ABI-encoded calldata.
    pub input: Bytes,
}

/// Header fields of an execution-layer block that proof construction needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    /// Block hash.
    pub hash: B256,

    /// Post-state root of the block.
    pub state_root: B256,

    /// Block timestamp in seconds.
    pub timestamp: u64,
}

/// An EIP-1186 storage proof for a single slot, paired with the storage root
/// of the proven account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageProofData {
    /// Storage root of the account at the proven block.
    pub storage_root: B256,

    /// Merkle-Patricia inclusion proof for the requested slot.
    pub proof: Vec<Bytes>,
}

/// Errors surfaced by endpoint implementations.
#[derive(Debug, Error)]
pub enum EndpointErr {
    /// The RPC rejected a transaction at submission time.
    #[error("transaction rejected at submission: {0}")]
    Submission(String),

    /// No receipt appeared for a submitted transaction within the allotted
    /// window. The transaction may still land; callers must not resubmit.
    #[error("timed out after {timeout:?} waiting for receipt of {txid}")]
    ReceiptTimeout {
        /// Hash of the transaction being awaited.
        txid: B256,

        /// How long we polled before giving up.
        timeout: Duration,
    },

    /// A receipt exists but is not yet attached to a canonical block.
    #[error("receipt for {0} is not yet attached to a block")]
    PendingReceipt(B256),

    /// The requested block is unknown to the endpoint.
    #[error("block {0} not found")]
    MissingBlock(u64),

    /// Transport or RPC-level failure.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Operations every chain involved in a bridge operation must support.
#[async_trait]
pub trait ChainEndpoint: Send + Sync {
    /// Which side of the bridge this endpoint fronts.
    fn kind(&self) -> ChainKind;

    /// Address of the account this endpoint signs with.
    fn signer_address(&self) -> Address;

    /// Fetches the native balance of `address` at the latest block.
    async fn get_balance(&self, address: Address) -> Result<U256, EndpointErr>;

    /// Signs and broadcasts `payload`, returning the transaction hash.
    async fn submit_transaction(&self, payload: TxPayload) -> Result<B256, EndpointErr>;

    /// Fetches the receipt for `txid` if it has been included.
    async fn get_receipt(&self, txid: B256) -> Result<Option<TxReceipt>, EndpointErr>;

    /// Polls for the receipt of `txid` until it appears or `timeout` elapses.
    ///
    /// Transient transport errors are logged and retried until the deadline.
    async fn wait_for_receipt(
        &self,
        txid: B256,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<TxReceipt, EndpointErr> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.get_receipt(txid).await {
                Ok(Some(receipt)) => return Ok(receipt),
                // not included yet, or included but not attached to a block
                Ok(None) | Err(EndpointErr::PendingReceipt(_)) => {}
                Err(EndpointErr::Transport(err)) => {
                    warn!(chain = %self.kind(), %txid, %err,
                        "transient rpc failure while polling for receipt");
                }
                Err(other) => return Err(other),
            }

            if tokio::time::Instant::now() + poll_interval > deadline {
                return Err(EndpointErr::ReceiptTimeout { txid, timeout });
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

/// The settlement side of the bridge. Hosts the portal and the output oracle.
#[async_trait]
pub trait SettlementEndpoint: ChainEndpoint {
    /// Looks up the first published output whose committed range covers
    /// `l2_block_number`. Returns `None` while no such output exists yet.
    async fn output_for_block(
        &self,
        l2_block_number: u64,
    ) -> Result<Option<OutputData>, EndpointErr>;

    /// Timestamp of the latest settlement block.
    async fn latest_timestamp(&self) -> Result<u64, EndpointErr>;

    /// Timestamp of settlement block `block_number`.
    async fn block_timestamp(&self, block_number: u64) -> Result<u64, EndpointErr>;
}

/// The rollup side of the bridge. Hosts the message passer predeploy.
#[async_trait]
pub trait RollupEndpoint: ChainEndpoint {
    /// Header fields of rollup block `block_number`.
    async fn block_info(&self, block_number: u64) -> Result<BlockInfo, EndpointErr>;

    /// EIP-1186 proof of `slot` under `address` at rollup block
    /// `block_number`.
    async fn storage_proof(
        &self,
        address: Address,
        slot: B256,
        block_number: u64,
    ) -> Result<StorageProofData, EndpointErr>;
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Replays a scripted sequence of `get_receipt` outcomes, then keeps
    /// returning the receipt.
    struct ScriptedEndpoint {
        outcomes: Mutex<Vec<Result<Option<TxReceipt>, EndpointErr>>>,
        receipt: TxReceipt,
    }

    impl ScriptedEndpoint {
        fn new(outcomes: Vec<Result<Option<TxReceipt>, EndpointErr>>, receipt: TxReceipt) -> Self {
            Self {
                outcomes: Mutex::new(outcomes),
                receipt,
            }
        }
    }

    #[async_trait]
    impl ChainEndpoint for ScriptedEndpoint {
        fn kind(&self) -> ChainKind {
            ChainKind::L1
        }

        fn signer_address(&self) -> Address {
            Address::ZERO
        }

        async fn get_balance(&self, _address: Address) -> Result<U256, EndpointErr> {
            Ok(U256::ZERO)
        }

        async fn submit_transaction(&self, _payload: TxPayload) -> Result<B256, EndpointErr> {
            Err(EndpointErr::Submission("not scripted".to_string()))
        }

        async fn get_receipt(&self, _txid: B256) -> Result<Option<TxReceipt>, EndpointErr> {
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.is_empty() {
                return Ok(Some(self.receipt.clone()));
            }
            outcomes.remove(0)
        }
    }

    fn receipt(txid: B256) -> TxReceipt {
        TxReceipt {
            tx_hash: txid,
            block_hash: B256::repeat_byte(0xbb),
            block_number: 100,
            success: true,
            logs: vec![],
        }
    }

    #[tokio::test]
    async fn test_wait_survives_pending_and_transport_blips() {
        let txid = B256::repeat_byte(0x09);
        let endpoint = ScriptedEndpoint::new(
            vec![
                Ok(None),
                Err(EndpointErr::PendingReceipt(txid)),
                Err(EndpointErr::Transport("connection reset".to_string())),
            ],
            receipt(txid),
        );

        let got = endpoint
            .wait_for_receipt(txid, Duration::from_secs(1), Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(got.tx_hash, txid);
    }

    #[tokio::test]
    async fn test_wait_gives_up_at_the_deadline() {
        let txid = B256::repeat_byte(0x09);
        // enough misses to outlast the deadline
        let misses = (0..64).map(|_| Ok(None)).collect();
        let endpoint = ScriptedEndpoint::new(misses, receipt(txid));

        let err = endpoint
            .wait_for_receipt(txid, Duration::from_millis(20), Duration::from_millis(5))
            .await
            .unwrap_err();
        assert!(matches!(err, EndpointErr::ReceiptTimeout { .. }));
    }
}
