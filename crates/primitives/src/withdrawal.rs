//! L2→L1 withdrawal message extraction and proof values.
//!
//! Initiating a withdrawal on the L2 emits a `MessagePassed` event; its
//! fields are everything the L1 prove and finalize calls need, plus the
//! storage slot the message passer recorded the withdrawal under. All of
//! this is a pure function of the confirmed initiation receipt.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::{SolEvent, SolValue};
use serde::{Deserialize, Serialize};

use crate::{
    errors::MalformedReceipt,
    events::MessagePassed,
    types::TxReceipt,
};

/// The withdrawal message recorded by the message passer predeploy.
///
/// Extracted once from the confirmed initiation receipt and carried through
/// the prove and finalize steps unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalMessage {
    /// The message passer's nonce for this withdrawal.
    pub nonce: U256,

    /// The L2 sender of the withdrawal.
    pub sender: Address,

    /// The L1 target the withdrawal calls once finalized.
    pub target: Address,

    /// The within-call ETH value released on the L1.
    pub value: U256,

    /// The gas limit of the finalization call.
    pub gas_limit: U256,

    /// The calldata of the finalization call.
    pub data: Bytes,
}

impl WithdrawalMessage {
    /// Extracts the withdrawal message from a confirmed initiation receipt.
    ///
    /// Exactly one `MessagePassed` event from `passer` must be present; the
    /// hash the contract emitted is cross-checked against the locally
    /// recomputed one.
    pub fn from_receipt(
        receipt: &TxReceipt,
        passer: Address,
    ) -> Result<Self, MalformedReceipt> {
        let mut candidates = receipt.logs.iter().filter(|log| {
            log.address == passer && log.topics.first() == Some(&MessagePassed::SIGNATURE_HASH)
        });

        let log = candidates
            .next()
            .ok_or(MalformedReceipt::MissingMessagePassedEvent {
                passer,
                tx_hash: receipt.tx_hash,
            })?;
        if candidates.next().is_some() {
            return Err(MalformedReceipt::AmbiguousMessagePassedEvent(receipt.tx_hash));
        }

        let decoded = MessagePassed::decode_raw_log(log.topics.iter().copied(), &log.data, true)?;

        let message = WithdrawalMessage {
            nonce: decoded.nonce,
            sender: decoded.sender,
            target: decoded.target,
            value: decoded.value,
            gas_limit: decoded.gasLimit,
            data: decoded.data,
        };

        let computed = message.withdrawal_hash();
        if computed != decoded.withdrawalHash {
            return Err(MalformedReceipt::WithdrawalHashMismatch {
                emitted: decoded.withdrawalHash,
                computed,
            });
        }

        Ok(message)
    }

    /// Computes the withdrawal hash:
    /// `keccak256(abi.encode(nonce, sender, target, value, gasLimit, data))`.
    ///
    /// `abi.encode` is parameter-sequence encoding, so the fields are
    /// encoded as six parameters, not as one tuple value behind an offset.
    pub fn withdrawal_hash(&self) -> B256 {
        let encoded = (
            self.nonce,
            self.sender,
            self.target,
            self.value,
            self.gas_limit,
            self.data.clone(),
        )
            .abi_encode_params();
        keccak256(encoded)
    }

    /// Computes the message passer storage slot the withdrawal is recorded
    /// under: `keccak256(withdrawalHash ++ bytes32(0))`.
    pub fn storage_slot(&self) -> B256 {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(self.withdrawal_hash().as_slice());
        keccak256(buf)
    }
}

/// The output root preimage submitted alongside a withdrawal proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRootProof {
    /// The output root version; zero for every output this client handles.
    pub version: B256,

    /// The L2 state root at the output block.
    pub state_root: B256,

    /// The storage root of the message passer predeploy at the output block.
    pub message_passer_storage_root: B256,

    /// The hash of the output block.
    pub latest_block_hash: B256,
}

impl OutputRootProof {
    /// Recomputes the output root this preimage commits to:
    /// `keccak256(version ++ stateRoot ++ messagePasserStorageRoot ++ latestBlockhash)`.
    pub fn output_root(&self) -> B256 {
        let mut buf = [0u8; 128];
        buf[..32].copy_from_slice(self.version.as_slice());
        buf[32..64].copy_from_slice(self.state_root.as_slice());
        buf[64..96].copy_from_slice(self.message_passer_storage_root.as_slice());
        buf[96..].copy_from_slice(self.latest_block_hash.as_slice());
        keccak256(buf)
    }
}

/// Everything the prove-withdrawal call needs beyond the message itself.
///
/// Produced once from a confirmed initiation receipt and a published output;
/// consumed once by the prove submission. For a fixed (receipt, output) pair
/// the bundle bytes are deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalProofBundle {
    /// The preimage of the output root the proof is checked against.
    pub output_root_proof: OutputRootProof,

    /// The Merkle inclusion proof of the withdrawal's storage slot in the
    /// message passer's storage trie.
    pub withdrawal_proof: Vec<Bytes>,

    /// The oracle index of the output the proof targets.
    pub l2_output_index: u64,
}
