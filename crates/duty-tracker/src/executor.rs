//! Turns duties into chain interactions and their outcomes into events.
//!
//! Every function here executes exactly one duty. Submissions return as soon
//! as the RPC acknowledges the transaction so the acked hash can be
//! persisted before anything waits on it; the awaits then run against the
//! persisted hash.

use alloy_primitives::{B256, U256};
use portal_bridge_chain::{contracts, EndpointErr, RollupEndpoint, SettlementEndpoint, TxPayload};
use portal_bridge_primitives::{
    deposit::derive_l2_tx_hashes,
    params::ProtocolParams,
    withdrawal::{OutputRootProof, WithdrawalMessage, WithdrawalProofBundle},
};
use portal_bridge_sm::{DepositDuty, DepositEvent, WithdrawalDuty, WithdrawalEvent};
use tracing::{debug, info, warn};

use crate::{
    config::WaitPolicy,
    errors::{OrchestratorErr, ProofConstructionErr},
};

/// Executes one deposit duty and reports the resulting event.
pub async fn execute_deposit_duty<L1, L2>(
    l1: &L1,
    l2: &L2,
    params: &ProtocolParams,
    policy: &WaitPolicy,
    duty: DepositDuty,
) -> Result<DepositEvent, OrchestratorErr>
where
    L1: SettlementEndpoint,
    L2: RollupEndpoint,
{
    match duty {
        DepositDuty::SubmitDeposit { amount, recipient } => {
            let input =
                contracts::deposit_transaction_call(recipient, amount, params.deposit_gas_limit);
            let txid = l1
                .submit_transaction(TxPayload {
                    to: params.contracts.optimism_portal,
                    value: amount,
                    input,
                })
                .await?;
            Ok(DepositEvent::SubmissionAcked { txid })
        }

        DepositDuty::AwaitSourceReceipt { txid } => {
            let receipt = l1
                .wait_for_receipt(txid, policy.receipt_timeout, policy.receipt_poll_interval)
                .await?;
            Ok(DepositEvent::SourceConfirmed { receipt })
        }

        DepositDuty::DeriveDestinationHash { receipt } => {
            let hashes = derive_l2_tx_hashes(&receipt, params.contracts.optimism_portal)?;
            if hashes.len() > 1 {
                warn!(
                    count = hashes.len(),
                    "receipt carries multiple deposits, tracking the first"
                );
            }
            let l2_txid = *hashes
                .first()
                .ok_or_else(|| OrchestratorErr::Fatal("derived no deposit hash".to_string()))?;
            Ok(DepositEvent::DestinationHashDerived { l2_txid })
        }

        DepositDuty::AwaitDestinationReceipt { txid } => {
            let receipt = l2
                .wait_for_receipt(txid, policy.receipt_timeout, policy.receipt_poll_interval)
                .await?;
            Ok(DepositEvent::DestinationConfirmed { receipt })
        }
    }
}

/// Executes one withdrawal duty and reports the resulting event.
pub async fn execute_withdrawal_duty<L1, L2>(
    l1: &L1,
    l2: &L2,
    params: &ProtocolParams,
    policy: &WaitPolicy,
    duty: WithdrawalDuty,
) -> Result<WithdrawalEvent, OrchestratorErr>
where
    L1: SettlementEndpoint,
    L2: RollupEndpoint,
{
    match duty {
        WithdrawalDuty::SubmitWithdrawal { amount, recipient } => {
            let input =
                contracts::initiate_withdrawal_call(recipient, params.withdrawal_gas_limit);
            let txid = l2
                .submit_transaction(TxPayload {
                    to: params.contracts.l2_to_l1_message_passer,
                    value: amount,
                    input,
                })
                .await?;
            Ok(WithdrawalEvent::SubmissionAcked { txid })
        }

        WithdrawalDuty::AwaitInitiationReceipt { txid } => {
            let receipt = l2
                .wait_for_receipt(txid, policy.receipt_timeout, policy.receipt_poll_interval)
                .await?;
            let message = WithdrawalMessage::from_receipt(
                &receipt,
                params.contracts.l2_to_l1_message_passer,
            )?;
            Ok(WithdrawalEvent::InitiationConfirmed { receipt, message })
        }

        WithdrawalDuty::AwaitOutputRoot { l2_block_number } => {
            let deadline = tokio::time::Instant::now() + policy.output_timeout;
            loop {
                match l1.output_for_block(l2_block_number).await {
                    Ok(Some(output)) => return Ok(WithdrawalEvent::OutputPublished { output }),
                    Ok(None) => debug!(l2_block_number, "no covering output yet, polling"),
                    Err(EndpointErr::Transport(err)) => {
                        warn!(%err, "transient rpc failure while polling for an output");
                    }
                    Err(other) => return Err(other.into()),
                }
                if tokio::time::Instant::now() + policy.output_poll_interval > deadline {
                    return Err(OrchestratorErr::OutputWaitTimeout(
                        l2_block_number,
                        policy.output_timeout,
                    ));
                }
                tokio::time::sleep(policy.output_poll_interval).await;
            }
        }

        WithdrawalDuty::SubmitProve { message, output } => {
            let bundle = build_proof_bundle(l2, params, &message, &output).await?;
            let input = contracts::prove_withdrawal_call(&message, &bundle);
            let txid = l1
                .submit_transaction(TxPayload {
                    to: params.contracts.optimism_portal,
                    value: U256::ZERO,
                    input,
                })
                .await?;
            Ok(WithdrawalEvent::ProveSubmissionAcked { txid })
        }

        WithdrawalDuty::AwaitProveReceipt { txid } => {
            let receipt = l1
                .wait_for_receipt(txid, policy.receipt_timeout, policy.receipt_poll_interval)
                .await?;
            Ok(WithdrawalEvent::ProveConfirmed { receipt })
        }

        WithdrawalDuty::AwaitChallengePeriod { proven_block } => {
            let proven_at = l1.block_timestamp(proven_block).await?;
            let ready_at = proven_at + params.challenge_period.as_secs();
            loop {
                match l1.latest_timestamp().await {
                    Ok(now) if now >= ready_at => {
                        return Ok(WithdrawalEvent::ChallengePeriodElapsed);
                    }
                    Ok(now) => info!(
                        remaining_secs = ready_at - now,
                        "challenge period still running"
                    ),
                    Err(EndpointErr::Transport(err)) => {
                        warn!(%err, "transient rpc failure while watching the challenge period");
                    }
                    Err(other) => return Err(other.into()),
                }
                tokio::time::sleep(policy.challenge_poll_interval).await;
            }
        }

        WithdrawalDuty::SubmitFinalize { message } => {
            let input = contracts::finalize_withdrawal_call(&message);
            let txid = l1
                .submit_transaction(TxPayload {
                    to: params.contracts.optimism_portal,
                    value: U256::ZERO,
                    input,
                })
                .await?;
            Ok(WithdrawalEvent::FinalizeSubmissionAcked { txid })
        }

        WithdrawalDuty::AwaitFinalizeReceipt { txid } => {
            let receipt = l1
                .wait_for_receipt(txid, policy.receipt_timeout, policy.receipt_poll_interval)
                .await?;
            Ok(WithdrawalEvent::FinalizeConfirmed { receipt })
        }
    }
}

/// Assembles the proof bundle for `message` against `output`.
///
/// The recomputed output root must match the published one; a mismatch means
/// the serving node disagrees with the oracle and the proof would revert on
/// chain anyway.
async fn build_proof_bundle<L2: RollupEndpoint>(
    l2: &L2,
    params: &ProtocolParams,
    message: &WithdrawalMessage,
    output: &portal_bridge_primitives::types::OutputData,
) -> Result<WithdrawalProofBundle, OrchestratorErr> {
    let slot = message.storage_slot();
    let block = l2.block_info(output.l2_block_number).await?;
    let proof = l2
        .storage_proof(
            params.contracts.l2_to_l1_message_passer,
            slot,
            output.l2_block_number,
        )
        .await?;

    if proof.proof.is_empty() {
        return Err(ProofConstructionErr::EmptyProof(slot).into());
    }

    let output_root_proof = OutputRootProof {
        version: B256::ZERO,
        state_root: block.state_root,
        message_passer_storage_root: proof.storage_root,
        latest_block_hash: block.hash,
    };

    let computed = output_root_proof.output_root();
    if computed != output.output_root {
        return Err(ProofConstructionErr::OutputRootMismatch {
            computed,
            published: output.output_root,
        }
        .into());
    }

    Ok(WithdrawalProofBundle {
        output_root_proof,
        withdrawal_proof: proof.proof,
        l2_output_index: output.l2_output_index,
    })
}
