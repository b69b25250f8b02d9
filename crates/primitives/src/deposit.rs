//! L1→L2 deposit derivation.
//!
//! Every `TransactionDeposited` event the portal emits corresponds to exactly
//! one L2 transaction of the deposited type (`0x7e`). The L2 hash of that
//! transaction is a pure function of the L1 receipt: parse the event, compute
//! the source hash from the L1 block hash and the log index, then hash the
//! encoded deposited transaction. No network access is involved, so the
//! derivation can be replayed from a stored receipt at any time.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_rlp::{Encodable, Header, EMPTY_STRING_CODE};
use alloy_sol_types::SolEvent;
use serde::{Deserialize, Serialize};

use crate::{
    errors::MalformedReceipt,
    events::TransactionDeposited,
    types::{ReceiptLog, TxReceipt},
};

/// The EIP-2718 type byte of deposited transactions.
pub const DEPOSIT_TX_TYPE: u8 = 0x7e;

/// The minimum length of the event's packed payload: mint (32) + value (32) +
/// gas limit (8) + creation flag (1).
const MIN_OPAQUE_DATA_LEN: usize = 73;

/// A decoded L1→L2 deposited transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositedTransaction {
    /// The hash tying this L2 transaction back to its L1 origin.
    pub source_hash: B256,

    /// The L2 sender (the L1 depositor, aliased by the portal if it was a
    /// contract).
    pub from: Address,

    /// The L2 callee; `None` for contract-creation deposits.
    pub to: Option<Address>,

    /// The amount of L2 ETH minted to `from`.
    pub mint: U256,

    /// The amount of ETH passed along with the L2 call.
    pub value: U256,

    /// The L2 gas limit.
    pub gas_limit: u64,

    /// Whether this is a system transaction (never set for user deposits).
    pub is_system_tx: bool,

    /// The L2 calldata.
    pub data: Bytes,
}

impl DepositedTransaction {
    /// Decodes a deposited transaction from a `TransactionDeposited` log.
    ///
    /// `l1_block_hash` is the hash of the block that carried the log and
    /// `log_index` the log's index within that block; together they pin the
    /// source hash.
    pub fn from_log(
        log: &ReceiptLog,
        l1_block_hash: B256,
    ) -> Result<Self, MalformedReceipt> {
        let decoded = TransactionDeposited::decode_raw_log(
            log.topics.iter().copied(),
            &log.data,
            true,
        )?;

        if decoded.version != U256::ZERO {
            return Err(MalformedReceipt::UnsupportedDepositVersion(decoded.version));
        }

        let opaque = decoded.opaqueData.as_ref();
        if opaque.len() < MIN_OPAQUE_DATA_LEN {
            return Err(MalformedReceipt::OpaqueDataTooShort {
                expected: MIN_OPAQUE_DATA_LEN,
                got: opaque.len(),
            });
        }

        let mint = U256::from_be_slice(&opaque[0..32]);
        let value = U256::from_be_slice(&opaque[32..64]);
        let gas_limit = u64::from_be_bytes(opaque[64..72].try_into().expect("8-byte slice"));
        let is_creation = opaque[72] != 0;
        let data = Bytes::copy_from_slice(&opaque[MIN_OPAQUE_DATA_LEN..]);

        Ok(DepositedTransaction {
            source_hash: user_deposit_source_hash(l1_block_hash, log.index),
            from: decoded.from,
            to: (!is_creation).then_some(decoded.to),
            mint,
            value,
            gas_limit,
            is_system_tx: false,
            data,
        })
    }

    fn rlp_payload_length(&self) -> usize {
        self.source_hash.length()
            + self.from.length()
            + self.to.as_ref().map_or(1, |to| to.length())
            + self.mint.length()
            + self.value.length()
            + self.gas_limit.length()
            + self.is_system_tx.length()
            + self.data.length()
    }

    /// Encodes this deposit in its L2 wire form:
    /// `0x7e || rlp([sourceHash, from, to, mint, value, gasLimit, isSystemTx, data])`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(DEPOSIT_TX_TYPE);
        Header {
            list: true,
            payload_length: self.rlp_payload_length(),
        }
        .encode(out);
        self.source_hash.encode(out);
        self.from.encode(out);
        match &self.to {
            Some(to) => to.encode(out),
            None => out.push(EMPTY_STRING_CODE),
        }
        self.mint.encode(out);
        self.value.encode(out);
        self.gas_limit.encode(out);
        self.is_system_tx.encode(out);
        self.data.encode(out);
    }

    /// Computes the L2 transaction hash of this deposit.
    pub fn tx_hash(&self) -> B256 {
        let mut buf = Vec::with_capacity(256);
        self.encode(&mut buf);
        keccak256(&buf)
    }
}

/// Computes the source hash of a user deposit: the depositor domain (zero)
/// hashed together with `keccak256(l1BlockHash ++ logIndex)`.
pub fn user_deposit_source_hash(l1_block_hash: B256, log_index: u64) -> B256 {
    let mut ident = [0u8; 64];
    ident[..32].copy_from_slice(l1_block_hash.as_slice());
    ident[56..].copy_from_slice(&log_index.to_be_bytes());
    let deposit_id = keccak256(ident);

    // Domain word (zero for user deposits) prepended to the identifier hash.
    let mut buf = [0u8; 64];
    buf[32..].copy_from_slice(deposit_id.as_slice());
    keccak256(buf)
}

/// Extracts every deposited transaction from a confirmed L1 receipt.
///
/// Fails with [`MalformedReceipt::MissingDepositEvent`] if the portal emitted
/// no `TransactionDeposited` event in this receipt.
pub fn deposits_from_receipt(
    receipt: &TxReceipt,
    portal: Address,
) -> Result<Vec<DepositedTransaction>, MalformedReceipt> {
    let deposits = receipt
        .logs
        .iter()
        .filter(|log| {
            log.address == portal
                && log.topics.first() == Some(&TransactionDeposited::SIGNATURE_HASH)
        })
        .map(|log| DepositedTransaction::from_log(log, receipt.block_hash))
        .collect::<Result<Vec<_>, _>>()?;

    if deposits.is_empty() {
        return Err(MalformedReceipt::MissingDepositEvent {
            portal,
            tx_hash: receipt.tx_hash,
        });
    }

    Ok(deposits)
}

/// Derives the L2 transaction hashes for every deposit in a confirmed L1
/// receipt, in log order.
///
/// This is a pure function of the receipt contents: re-deriving from the same
/// receipt always yields the same hashes.
pub fn derive_l2_tx_hashes(
    receipt: &TxReceipt,
    portal: Address,
) -> Result<Vec<B256>, MalformedReceipt> {
    Ok(deposits_from_receipt(receipt, portal)?
        .iter()
        .map(DepositedTransaction::tx_hash)
        .collect())
}
