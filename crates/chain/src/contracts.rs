//! On-chain interfaces of the bridge contracts and calldata builders.
//!
//! The submission path never calls contracts through typed RPC handles; it
//! encodes calldata here and hands a [`TxPayload`](crate::endpoint::TxPayload)
//! to the endpoint. Only the output oracle, which is read-only from our
//! perspective, gets an rpc-enabled binding.

use alloy::{
    primitives::{Address, Bytes, U256},
    sol,
    sol_types::SolCall,
};
use portal_bridge_primitives::withdrawal::{WithdrawalMessage, WithdrawalProofBundle};

sol! {
    /// Preimage of an output root, as the portal expects it.
    struct OutputRootProof {
        bytes32 version;
        bytes32 stateRoot;
        bytes32 messagePasserStorageRoot;
        bytes32 latestBlockhash;
    }

    /// A withdrawal transaction as recorded by the message passer.
    struct WithdrawalTransaction {
        uint256 nonce;
        address sender;
        address target;
        uint256 value;
        uint256 gasLimit;
        bytes data;
    }

    /// The deposit and withdrawal-exit surface of the portal.
    interface IOptimismPortal {
        function depositTransaction(
            address _to,
            uint256 _value,
            uint64 _gasLimit,
            bool _isCreation,
            bytes memory _data
        ) external payable;

        function proveWithdrawalTransaction(
            WithdrawalTransaction memory _tx,
            uint256 _l2OutputIndex,
            OutputRootProof calldata _outputRootProof,
            bytes[] calldata _withdrawalProof
        ) external;

        function finalizeWithdrawalTransaction(
            WithdrawalTransaction memory _tx
        ) external;
    }

    /// The withdrawal entry point of the message passer predeploy.
    interface IL2ToL1MessagePasser {
        function initiateWithdrawal(
            address _target,
            uint256 _gasLimit,
            bytes memory _data
        ) external payable;
    }

    /// The read-only surface of the output oracle.
    #[sol(rpc)]
    interface IL2OutputOracle {
        struct OutputProposal {
            bytes32 outputRoot;
            uint128 timestamp;
            uint128 l2BlockNumber;
        }

        function latestBlockNumber() external view returns (uint256);

        function getL2OutputIndexAfter(uint256 _l2BlockNumber) external view returns (uint256);

        function getL2Output(uint256 _l2OutputIndex) external view returns (OutputProposal memory);
    }
}

impl From<&WithdrawalMessage> for WithdrawalTransaction {
    fn from(message: &WithdrawalMessage) -> Self {
        WithdrawalTransaction {
            nonce: message.nonce,
            sender: message.sender,
            target: message.target,
            value: message.value,
            gasLimit: message.gas_limit,
            data: message.data.clone(),
        }
    }
}

/// Calldata of a portal deposit crediting `recipient` with `value` on the L2.
pub fn deposit_transaction_call(recipient: Address, value: U256, gas_limit: u64) -> Bytes {
    IOptimismPortal::depositTransactionCall {
        _to: recipient,
        _value: value,
        _gasLimit: gas_limit,
        _isCreation: false,
        _data: Bytes::new(),
    }
    .abi_encode()
    .into()
}

/// Calldata of a message passer withdrawal targeting `recipient` on the L1.
///
/// The withdrawn value rides along as the transaction value, not in the
/// calldata.
pub fn initiate_withdrawal_call(recipient: Address, gas_limit: u64) -> Bytes {
    IL2ToL1MessagePasser::initiateWithdrawalCall {
        _target: recipient,
        _gasLimit: U256::from(gas_limit),
        _data: Bytes::new(),
    }
    .abi_encode()
    .into()
}

/// Calldata of the prove-withdrawal call for `message` against `bundle`.
pub fn prove_withdrawal_call(message: &WithdrawalMessage, bundle: &WithdrawalProofBundle) -> Bytes {
    IOptimismPortal::proveWithdrawalTransactionCall {
        _tx: message.into(),
        _l2OutputIndex: U256::from(bundle.l2_output_index),
        _outputRootProof: OutputRootProof {
            version: bundle.output_root_proof.version,
            stateRoot: bundle.output_root_proof.state_root,
            messagePasserStorageRoot: bundle.output_root_proof.message_passer_storage_root,
            latestBlockhash: bundle.output_root_proof.latest_block_hash,
        },
        _withdrawalProof: bundle.withdrawal_proof.clone(),
    }
    .abi_encode()
    .into()
}

/// Calldata of the finalize-withdrawal call for `message`.
pub fn finalize_withdrawal_call(message: &WithdrawalMessage) -> Bytes {
    IOptimismPortal::finalizeWithdrawalTransactionCall { _tx: message.into() }
        .abi_encode()
        .into()
}

#[cfg(test)]
mod tests {
    use alloy::primitives::B256;
    use portal_bridge_primitives::withdrawal::OutputRootProof as OutputRootPreimage;

    use super::*;

    fn sample_message() -> WithdrawalMessage {
        WithdrawalMessage {
            nonce: U256::from(3),
            sender: Address::repeat_byte(0x11),
            target: Address::repeat_byte(0x22),
            value: U256::from(1_000_000_000u64),
            gas_limit: U256::from(100_000),
            data: Bytes::new(),
        }
    }

    fn sample_bundle() -> WithdrawalProofBundle {
        WithdrawalProofBundle {
            output_root_proof: OutputRootPreimage {
                version: B256::ZERO,
                state_root: B256::repeat_byte(0xaa),
                message_passer_storage_root: B256::repeat_byte(0xbb),
                latest_block_hash: B256::repeat_byte(0xcc),
            },
            withdrawal_proof: vec![Bytes::from(vec![0xde, 0xad])],
            l2_output_index: 5,
        }
    }

    // The selectors are pinned to the deployed contract ABIs; a signature
    // drift in the sol! block would silently call nonexistent functions.
    #[test]
    fn test_selectors_match_deployed_abi() {
        assert_eq!(
            IOptimismPortal::depositTransactionCall::SELECTOR,
            [0xe9, 0xe0, 0x5c, 0x42]
        );
        assert_eq!(
            IOptimismPortal::proveWithdrawalTransactionCall::SELECTOR,
            [0x48, 0x70, 0x49, 0x6f]
        );
        assert_eq!(
            IOptimismPortal::finalizeWithdrawalTransactionCall::SELECTOR,
            [0x8c, 0x31, 0x52, 0xe9]
        );
        assert_eq!(
            IL2ToL1MessagePasser::initiateWithdrawalCall::SELECTOR,
            [0xc2, 0xb3, 0xe5, 0xac]
        );
    }

    #[test]
    fn test_prove_calldata_is_deterministic() {
        let message = sample_message();
        let bundle = sample_bundle();

        let first = prove_withdrawal_call(&message, &bundle);
        let second = prove_withdrawal_call(&message, &bundle);
        assert_eq!(first, second);

        let mut other = sample_bundle();
        other.l2_output_index = 6;
        assert_ne!(first, prove_withdrawal_call(&message, &other));
    }

    #[test]
    fn test_deposit_calldata_embeds_recipient() {
        let recipient = Address::repeat_byte(0x77);
        let calldata = deposit_transaction_call(recipient, U256::from(1u64), 100_000);

        // address is abi-encoded left-padded in the first argument word
        assert_eq!(&calldata[4 + 12..4 + 32], recipient.as_slice());
    }
}
