//! Core value types shared across the bridge orchestrator.

use std::fmt::Display;

use alloy_primitives::{Address, Bytes, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which of the two chains a transaction belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainKind {
    /// The settlement chain the rollup posts its outputs to.
    L1,

    /// The rollup chain.
    L2,
}

impl Display for ChainKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainKind::L1 => f.write_str("l1"),
            ChainKind::L2 => f.write_str("l2"),
        }
    }
}

/// The direction of a bridge operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Move value from the L1 to the rollup.
    Deposit,

    /// Move value from the rollup back to the L1.
    Withdraw,
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Deposit => f.write_str("deposit"),
            Direction::Withdraw => f.write_str("withdraw"),
        }
    }
}

/// The user-supplied intent for a single bridge operation.
///
/// Immutable once constructed; the orchestrator never mutates the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRequest {
    /// Whether this operation is a deposit or a withdrawal.
    pub direction: Direction,

    /// The amount to bridge, in wei.
    pub amount: U256,

    /// The address that receives the bridged funds on the other chain.
    pub recipient: Address,
}

/// A single log entry of a confirmed transaction, reduced to the fields the
/// protocol derivations need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLog {
    /// The contract that emitted the log.
    pub address: Address,

    /// The log topics, event signature hash first.
    pub topics: Vec<B256>,

    /// The non-indexed event data.
    pub data: Bytes,

    /// The index of this log within its block.
    pub index: u64,
}

/// A provider-independent view of a confirmed transaction receipt.
///
/// The chain endpoint converts whatever its RPC library returns into this
/// type, so the state machines and the pure derivations never see provider
/// types and stay trivially testable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    /// The hash of the transaction this receipt belongs to.
    pub tx_hash: B256,

    /// The hash of the block that included the transaction.
    pub block_hash: B256,

    /// The number of the block that included the transaction.
    pub block_number: u64,

    /// Whether the transaction executed successfully.
    pub success: bool,

    /// The logs emitted by the transaction.
    pub logs: Vec<ReceiptLog>,
}

/// A record of one submitted transaction leg of a bridge operation.
///
/// Created when the transaction is submitted; its receipt is set exactly once
/// when confirmation arrives and is never overwritten afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// The transaction hash assigned at submission.
    pub hash: B256,

    /// The chain the transaction was submitted on.
    pub chain: ChainKind,

    /// When the transaction was handed to the RPC endpoint.
    pub submitted_at: DateTime<Utc>,

    /// The confirmation receipt, set at most once.
    receipt: Option<TxReceipt>,
}

impl TransactionRecord {
    /// Creates a record for a freshly submitted transaction.
    pub fn new(hash: B256, chain: ChainKind) -> Self {
        Self {
            hash,
            chain,
            submitted_at: Utc::now(),
            receipt: None,
        }
    }

    /// Creates a record for a transaction whose hash is already known from a
    /// previous run (manual resume); the submission time is unknowable, so
    /// the current time is recorded.
    pub fn resumed(hash: B256, chain: ChainKind) -> Self {
        Self::new(hash, chain)
    }

    /// Sets the confirmation receipt.
    ///
    /// Returns `false` (and leaves the record untouched) if a receipt was
    /// already recorded, so completion stays idempotent.
    pub fn confirm(&mut self, receipt: TxReceipt) -> bool {
        if self.receipt.is_some() {
            return false;
        }
        self.receipt = Some(receipt);
        true
    }

    /// The confirmation receipt, if one has arrived.
    pub const fn receipt(&self) -> Option<&TxReceipt> {
        self.receipt.as_ref()
    }

    /// Whether the transaction has been confirmed.
    pub const fn is_confirmed(&self) -> bool {
        self.receipt.is_some()
    }
}

/// A rollup output root commitment as published on the L1, covering all L2
/// blocks up to `l2_block_number`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputData {
    /// The published output root.
    pub output_root: B256,

    /// The L1 timestamp the output was published at.
    pub timestamp: u64,

    /// The highest L2 block covered by this output.
    pub l2_block_number: u64,

    /// The index of the output in the oracle's output array.
    pub l2_output_index: u64,
}
