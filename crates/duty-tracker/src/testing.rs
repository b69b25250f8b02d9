//! In-memory chain endpoints for exercising the orchestrator without a
//! network.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{SolEvent, SolValue};
use async_trait::async_trait;
use portal_bridge_chain::{
    BlockInfo, ChainEndpoint, EndpointErr, RollupEndpoint, SettlementEndpoint, StorageProofData,
    TxPayload,
};
use portal_bridge_primitives::{
    events::{MessagePassed, TransactionDeposited},
    types::{ChainKind, OutputData, ReceiptLog, TxReceipt},
    withdrawal::WithdrawalMessage,
};

#[derive(Debug, Default)]
struct MockInner {
    balance: U256,
    submissions: Vec<TxPayload>,
    scripted_txids: VecDeque<B256>,
    receipts: HashMap<B256, TxReceipt>,
    outputs: Vec<OutputData>,
    output_faults: u32,
    latest_timestamp: u64,
    timestamp_faults: u32,
    block_timestamps: HashMap<u64, u64>,
    blocks: HashMap<u64, BlockInfo>,
    storage_proofs: HashMap<B256, StorageProofData>,
}

/// A scripted chain endpoint. Submissions consume pre-assigned hashes and
/// everything read back (receipts, outputs, blocks, proofs) is whatever the
/// test registered beforehand.
#[derive(Debug, Clone)]
pub(crate) struct MockChain {
    kind: ChainKind,
    signer: Address,
    inner: Arc<Mutex<MockInner>>,
}

impl MockChain {
    pub(crate) fn new(kind: ChainKind, signer: Address) -> Self {
        Self {
            kind,
            signer,
            inner: Arc::new(Mutex::new(MockInner::default())),
        }
    }

    pub(crate) fn set_balance(&self, balance: U256) {
        self.inner.lock().unwrap().balance = balance;
    }

    /// Pre-assigns the hash the next submission will be acked with.
    pub(crate) fn script_submission(&self, txid: B256) {
        self.inner.lock().unwrap().scripted_txids.push_back(txid);
    }

    pub(crate) fn insert_receipt(&self, receipt: TxReceipt) {
        self.inner
            .lock()
            .unwrap()
            .receipts
            .insert(receipt.tx_hash, receipt);
    }

    pub(crate) fn publish_output(&self, output: OutputData) {
        self.inner.lock().unwrap().outputs.push(output);
    }

    pub(crate) fn set_latest_timestamp(&self, timestamp: u64) {
        self.inner.lock().unwrap().latest_timestamp = timestamp;
    }

    /// Makes the next `count` output queries fail with a transport error.
    pub(crate) fn fail_next_output_queries(&self, count: u32) {
        self.inner.lock().unwrap().output_faults = count;
    }

    /// Makes the next `count` latest-timestamp queries fail with a
    /// transport error.
    pub(crate) fn fail_next_timestamp_queries(&self, count: u32) {
        self.inner.lock().unwrap().timestamp_faults = count;
    }

    pub(crate) fn set_block_timestamp(&self, block_number: u64, timestamp: u64) {
        self.inner
            .lock()
            .unwrap()
            .block_timestamps
            .insert(block_number, timestamp);
    }

    pub(crate) fn insert_block(&self, block_number: u64, info: BlockInfo) {
        self.inner.lock().unwrap().blocks.insert(block_number, info);
    }

    pub(crate) fn insert_storage_proof(&self, slot: B256, proof: StorageProofData) {
        self.inner.lock().unwrap().storage_proofs.insert(slot, proof);
    }

    pub(crate) fn submissions(&self) -> Vec<TxPayload> {
        self.inner.lock().unwrap().submissions.clone()
    }
}

#[async_trait]
impl ChainEndpoint for MockChain {
    fn kind(&self) -> ChainKind {
        self.kind
    }

    fn signer_address(&self) -> Address {
        self.signer
    }

    async fn get_balance(&self, _address: Address) -> Result<U256, EndpointErr> {
        Ok(self.inner.lock().unwrap().balance)
    }

    async fn submit_transaction(&self, payload: TxPayload) -> Result<B256, EndpointErr> {
        let mut inner = self.inner.lock().unwrap();
        inner.submissions.push(payload);
        inner
            .scripted_txids
            .pop_front()
            .ok_or_else(|| EndpointErr::Submission("unscripted submission".to_string()))
    }

    async fn get_receipt(&self, txid: B256) -> Result<Option<TxReceipt>, EndpointErr> {
        Ok(self.inner.lock().unwrap().receipts.get(&txid).cloned())
    }
}

#[async_trait]
impl SettlementEndpoint for MockChain {
    async fn output_for_block(
        &self,
        l2_block_number: u64,
    ) -> Result<Option<OutputData>, EndpointErr> {
        let mut inner = self.inner.lock().unwrap();
        if inner.output_faults > 0 {
            inner.output_faults -= 1;
            return Err(EndpointErr::Transport("scripted fault".to_string()));
        }
        Ok(inner
            .outputs
            .iter()
            .filter(|output| output.l2_block_number >= l2_block_number)
            .min_by_key(|output| output.l2_block_number)
            .cloned())
    }

    async fn latest_timestamp(&self) -> Result<u64, EndpointErr> {
        let mut inner = self.inner.lock().unwrap();
        if inner.timestamp_faults > 0 {
            inner.timestamp_faults -= 1;
            return Err(EndpointErr::Transport("scripted fault".to_string()));
        }
        Ok(inner.latest_timestamp)
    }

    async fn block_timestamp(&self, block_number: u64) -> Result<u64, EndpointErr> {
        self.inner
            .lock()
            .unwrap()
            .block_timestamps
            .get(&block_number)
            .copied()
            .ok_or(EndpointErr::MissingBlock(block_number))
    }
}

#[async_trait]
impl RollupEndpoint for MockChain {
    async fn block_info(&self, block_number: u64) -> Result<BlockInfo, EndpointErr> {
        self.inner
            .lock()
            .unwrap()
            .blocks
            .get(&block_number)
            .copied()
            .ok_or(EndpointErr::MissingBlock(block_number))
    }

    async fn storage_proof(
        &self,
        _address: Address,
        slot: B256,
        _block_number: u64,
    ) -> Result<StorageProofData, EndpointErr> {
        self.inner
            .lock()
            .unwrap()
            .storage_proofs
            .get(&slot)
            .cloned()
            .ok_or_else(|| EndpointErr::Transport(format!("no proof scripted for slot {slot}")))
    }
}

/// Builds the `TransactionDeposited` log a portal deposit emits.
pub(crate) fn deposit_log(
    portal: Address,
    from: Address,
    to: Address,
    amount: U256,
    gas_limit: u64,
    index: u64,
) -> ReceiptLog {
    let mut opaque = Vec::with_capacity(73);
    opaque.extend_from_slice(&amount.to_be_bytes::<32>());
    opaque.extend_from_slice(&amount.to_be_bytes::<32>());
    opaque.extend_from_slice(&gas_limit.to_be_bytes());
    opaque.push(0);

    ReceiptLog {
        address: portal,
        topics: vec![
            TransactionDeposited::SIGNATURE_HASH,
            B256::left_padding_from(from.as_slice()),
            B256::left_padding_from(to.as_slice()),
            B256::ZERO,
        ],
        data: Bytes::from(opaque).abi_encode().into(),
        index,
    }
}

/// Builds the `MessagePassed` log a withdrawal initiation emits.
pub(crate) fn message_passed_log(passer: Address, message: &WithdrawalMessage) -> ReceiptLog {
    let data = (
        message.value,
        message.gas_limit,
        message.data.clone(),
        message.withdrawal_hash(),
    )
        .abi_encode_params();

    ReceiptLog {
        address: passer,
        topics: vec![
            MessagePassed::SIGNATURE_HASH,
            B256::from(message.nonce),
            B256::left_padding_from(message.sender.as_slice()),
            B256::left_padding_from(message.target.as_slice()),
        ],
        data: data.into(),
        index: 0,
    }
}
